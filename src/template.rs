//! Placeholder substitution for user rename templates.
//!
//! Eight placeholder spellings are recognized, four logical fields in two
//! case styles each. Matching is case-insensitive and replacement happens
//! in the fixed enumeration order below; the spellings never overlap, so
//! the order cannot change the result, but every spelling of a field must
//! be replaced, not just one.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use tracing::debug;

use crate::extract::Extracted;
use crate::media::MediaKind;

#[derive(Debug, Clone, Copy)]
enum Field {
    Season,
    Episode,
    Quality,
    Audio,
}

static PLACEHOLDERS: Lazy<Vec<(Regex, Field)>> = Lazy::new(|| {
    [
        ("{season}", Field::Season),
        ("{episode}", Field::Episode),
        ("{quality}", Field::Quality),
        ("{audio}", Field::Audio),
        ("Season", Field::Season),
        ("Episode", Field::Episode),
        ("QUALITY", Field::Quality),
        ("AUDIO", Field::Audio),
    ]
    .into_iter()
    .map(|(literal, field)| {
        let pattern = Regex::new(&format!("(?i){}", regex::escape(literal)))
            .expect("placeholder pattern");
        (pattern, field)
    })
    .collect()
});

/// Substitute extracted fields into a user template. Missing season and
/// episode become "XX", missing audio becomes "Unknown"; quality is already
/// defaulted by the classifier. Text that is not a placeholder passes
/// through untouched.
pub fn render(template: &str, extracted: &Extracted) -> String {
    let mut rendered = template.to_string();
    for (pattern, field) in PLACEHOLDERS.iter() {
        let value = match field {
            Field::Season => extracted.season.as_deref().unwrap_or("XX"),
            Field::Episode => extracted.episode.as_deref().unwrap_or("XX"),
            Field::Quality => extracted.quality.as_str(),
            Field::Audio => extracted.audio.as_deref().unwrap_or("Unknown"),
        };
        // NoExpand: extracted values are literal text, not replacement syntax.
        rendered = pattern.replace_all(&rendered, NoExpand(value)).into_owned();
    }
    rendered
}

/// Render the template and attach an extension: the source filename's if it
/// has one, otherwise the media kind's default.
pub fn target_filename(
    template: &str,
    extracted: &Extracted,
    source_name: &str,
    kind: MediaKind,
) -> String {
    let stem = render(template, extracted);
    let extension = Path::new(source_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_else(|| kind.default_extension());
    let name = format!("{stem}.{extension}");
    debug!(source_name, name = %name, "rendered target filename");
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(
        season: Option<&str>,
        episode: Option<&str>,
        quality: &str,
        audio: Option<&str>,
    ) -> Extracted {
        Extracted {
            season: season.map(String::from),
            episode: episode.map(String::from),
            quality: quality.to_string(),
            audio: audio.map(String::from),
        }
    }

    #[test]
    fn substitutes_braced_placeholders() {
        let e = extracted(Some("1"), Some("2"), "720p", None);
        assert_eq!(render("{Season}x{Episode} - {quality}", &e), "1x2 - 720p");
    }

    #[test]
    fn substitutes_bare_spellings_case_insensitively() {
        let e = extracted(Some("01"), Some("05"), "1080p", Some("Dual"));
        assert_eq!(render("season episode quality audio", &e), "01 05 1080p Dual");
    }

    #[test]
    fn missing_fields_fall_back() {
        let e = extracted(None, None, "Unknown", None);
        assert_eq!(render("S{season}E{episode} {audio}", &e), "SXXEXX Unknown");
    }

    #[test]
    fn template_without_placeholders_is_untouched() {
        let e = extracted(Some("1"), Some("2"), "720p", Some("Sub"));
        assert_eq!(render("My Plain Name", &e), "My Plain Name");
    }

    #[test]
    fn values_with_dollar_signs_stay_literal() {
        let e = extracted(Some("$1"), Some("2"), "720p", None);
        assert_eq!(render("{season}-{episode}", &e), "$1-2");
    }

    #[test]
    fn keeps_source_extension() {
        let e = extracted(Some("01"), Some("05"), "1080p", Some("Dual"));
        let name = target_filename(
            "{season}{episode} {quality} {audio}",
            &e,
            "Anime.S01E05.1080p.Dual.mkv",
            MediaKind::Video,
        );
        assert_eq!(name, "0105 1080p Dual.mkv");
    }

    #[test]
    fn defaults_extension_by_kind() {
        let e = extracted(None, Some("4"), "Unknown", None);
        assert_eq!(
            target_filename("Ep {episode}", &e, "video", MediaKind::Video),
            "Ep 4.mp4"
        );
        assert_eq!(
            target_filename("Ep {episode}", &e, "audio", MediaKind::Audio),
            "Ep 4.mp3"
        );
    }
}
