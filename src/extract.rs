//! Pattern extraction from filenames and captions.
//!
//! Each classifier walks an ordered pattern table and returns on the first
//! match. The order is part of the contract: ambiguous text resolves to
//! whichever rule comes first, and downstream templates depend on that.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Fields pulled out of one piece of source text. Produced fresh per file,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub season: Option<String>,
    pub episode: Option<String>,
    /// Always set; "Unknown" when no quality marker was found.
    pub quality: String,
    pub audio: Option<String>,
}

impl Extracted {
    pub fn from_text(text: &str) -> Self {
        let (season, episode) = extract_season_episode(text);
        Self {
            season,
            episode,
            quality: extract_quality(text),
            audio: extract_audio_info(text),
        }
    }
}

enum SeasonEpisodeRule {
    /// Group 1 is the season, group 2 the episode.
    SeasonEpisode,
    /// Group 1 is the episode; no season in the text.
    EpisodeOnly,
}

static SEASON_EPISODE_PATTERNS: Lazy<Vec<(Regex, SeasonEpisodeRule)>> = Lazy::new(|| {
    use SeasonEpisodeRule::*;
    vec![
        // S01E02, S01EP02
        (Regex::new(r"S(\d+)(?:E|EP)(\d+)").expect("season/episode pattern"), SeasonEpisode),
        // S01 E02, S01-EP02
        (
            Regex::new(r"S(\d+)[\s-]*(?:E|EP)(\d+)").expect("season/episode pattern"),
            SeasonEpisode,
        ),
        // Season 1 Episode 2
        (
            Regex::new(r"(?i)Season\s*(\d+)\s*Episode\s*(\d+)").expect("season/episode pattern"),
            SeasonEpisode,
        ),
        // [S01][E02]
        (Regex::new(r"\[S(\d+)\]\[E(\d+)\]").expect("season/episode pattern"), SeasonEpisode),
        // S01 13
        (Regex::new(r"S(\d+)[^\d]*(\d+)").expect("season/episode pattern"), SeasonEpisode),
        // E02, EP02, Episode 2
        (
            Regex::new(r"(?i)(?:E|EP|Episode)\s*(\d+)").expect("episode pattern"),
            EpisodeOnly,
        ),
        // Standalone number. Runs last, and will happily claim a stray
        // resolution digit sequence as an episode number.
        (Regex::new(r"\b(\d+)\b").expect("episode pattern"), EpisodeOnly),
    ]
});

enum QualityRule {
    /// Use the matched text as-is.
    Passthrough,
    /// Map any match to a fixed tag.
    Fixed(&'static str),
}

static QUALITY_PATTERNS: Lazy<Vec<(Regex, QualityRule)>> = Lazy::new(|| {
    use QualityRule::*;
    vec![
        // 1080p, 720p, 480i
        (Regex::new(r"(?i)\b(\d{3,4}[pi])\b").expect("quality pattern"), Passthrough),
        (Regex::new(r"(?i)\b(?:4k|2160p)\b").expect("quality pattern"), Fixed("4k")),
        (Regex::new(r"(?i)\b(?:2k|1440p)\b").expect("quality pattern"), Fixed("2k")),
        (Regex::new(r"(?i)\b(HDRip|HDTV)\b").expect("quality pattern"), Passthrough),
        (Regex::new(r"(?i)\b(4kX264|4kx265)\b").expect("quality pattern"), Passthrough),
        // [1080p]
        (Regex::new(r"(?i)\[(\d{3,4}[pi])\]").expect("quality pattern"), Passthrough),
    ]
});

enum AudioRule {
    Fixed(&'static str),
    Passthrough,
    /// "[Sub]" -> "Subbed", "(Dub)" -> "Dubbed".
    Bed,
}

static AUDIO_PATTERNS: Lazy<Vec<(Regex, AudioRule)>> = Lazy::new(|| {
    use AudioRule::*;
    vec![
        // Multi-Audio and Dual-Audio both land here, so both read as Multi.
        (Regex::new(r"(?i)\b(?:Multi|Dual)[-\s]?Audio\b").expect("audio pattern"), Fixed("Multi")),
        (Regex::new(r"(?i)\bDual[-\s]?(?:Audio|Track)\b").expect("audio pattern"), Fixed("Dual")),
        (Regex::new(r"(?i)\bSub(?:bed)?\b").expect("audio pattern"), Fixed("Sub")),
        (Regex::new(r"(?i)\bDub(?:bed)?\b").expect("audio pattern"), Fixed("Dub")),
        (Regex::new(r"\[(Sub|Dub)\]").expect("audio pattern"), Bed),
        (Regex::new(r"\((Sub|Dub)\)").expect("audio pattern"), Bed),
        // Eng/Jap style dual-language notation
        (
            Regex::new(r"(?i)\b(?:Eng(?:lish)?\s*/\s*(?:Jap|Kor|Chi))\b").expect("audio pattern"),
            Fixed("Dual"),
        ),
        (Regex::new(r"\b(TrueHD|DTS[- ]?HD|Atmos)\b").expect("audio pattern"), Passthrough),
        (Regex::new(r"\[(Unknown)\]").expect("audio pattern"), Passthrough),
        // Bare Multi/Dual token, e.g. "Show.1080p.Dual.mkv". Last so it can
        // never steal a match from the compound rules above.
        (Regex::new(r"(?i)\b(Multi|Dual)\b").expect("audio pattern"), Passthrough),
    ]
});

/// Extract season and episode numbers, first matching rule wins.
///
/// Season and episode come back as the digit strings that were captured,
/// leading zeros intact. Rules that only know about episodes leave the
/// season empty.
pub fn extract_season_episode(text: &str) -> (Option<String>, Option<String>) {
    for (pattern, rule) in SEASON_EPISODE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let (season, episode) = match rule {
                SeasonEpisodeRule::SeasonEpisode => (
                    caps.get(1).map(|m| m.as_str().to_string()),
                    caps.get(2).map(|m| m.as_str().to_string()),
                ),
                SeasonEpisodeRule::EpisodeOnly => {
                    (None, caps.get(1).map(|m| m.as_str().to_string()))
                }
            };
            debug!(text, ?season, ?episode, "season/episode pattern matched");
            return (season, episode);
        }
    }
    debug!(text, "no season/episode pattern matched");
    (None, None)
}

/// Extract a quality tag, first matching rule wins. Returns "Unknown" when
/// nothing matches.
pub fn extract_quality(text: &str) -> String {
    for (pattern, rule) in QUALITY_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let quality = match rule {
                QualityRule::Passthrough => caps
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| caps[0].to_string()),
                QualityRule::Fixed(tag) => (*tag).to_string(),
            };
            debug!(text, quality = %quality, "quality pattern matched");
            return quality;
        }
    }
    debug!(text, "no quality pattern matched");
    "Unknown".to_string()
}

/// Extract an audio/language tag, first matching rule wins. Unlike quality
/// there is no default here; the caller decides what an absent tag means.
pub fn extract_audio_info(text: &str) -> Option<String> {
    for (pattern, rule) in AUDIO_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let audio = match rule {
                AudioRule::Fixed(tag) => (*tag).to_string(),
                AudioRule::Passthrough => caps
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| caps[0].to_string()),
                AudioRule::Bed => format!("{}bed", &caps[1]),
            };
            debug!(text, audio = %audio, "audio pattern matched");
            return Some(audio);
        }
    }
    debug!(text, "no audio pattern matched");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn se(text: &str) -> (Option<String>, Option<String>) {
        extract_season_episode(text)
    }

    #[test]
    fn compact_season_episode() {
        assert_eq!(se("Anime.S01E05.1080p.mkv"), (Some("01".into()), Some("05".into())));
        assert_eq!(se("Show S3EP12"), (Some("3".into()), Some("12".into())));
    }

    #[test]
    fn spaced_and_dashed_season_episode() {
        assert_eq!(se("Show S01 E02"), (Some("01".into()), Some("02".into())));
        assert_eq!(se("Show S01-EP02"), (Some("01".into()), Some("02".into())));
    }

    #[test]
    fn verbose_season_episode_any_case() {
        assert_eq!(se("season 1 episode 2"), (Some("1".into()), Some("2".into())));
        assert_eq!(se("Season 1 Episode 2"), (Some("1".into()), Some("2".into())));
    }

    #[test]
    fn bracketed_season_episode() {
        assert_eq!(se("[S01][E04] Title"), (Some("01".into()), Some("04".into())));
    }

    #[test]
    fn season_with_junk_separator() {
        assert_eq!(se("S02 - 13"), (Some("02".into()), Some("13".into())));
    }

    #[test]
    fn episode_only_leaves_season_empty() {
        assert_eq!(se("Episode 7 finale"), (None, Some("7".into())));
        assert_eq!(se("EP09"), (None, Some("09".into())));
    }

    #[test]
    fn number_only_text_reads_as_episode() {
        // Deliberate: the bare-number rule does not know about resolutions.
        assert_eq!(se("720"), (None, Some("720".into())));
        assert_eq!(se("no numbers here"), (None, None));
    }

    #[test]
    fn rule_order_beats_specificity() {
        // The compact rule fires before the bracketed one ever gets a look.
        assert_eq!(se("S01E02 [S09][E09]"), (Some("01".into()), Some("02".into())));
    }

    #[test]
    fn quality_markers() {
        assert_eq!(extract_quality("Show.1080p.mkv"), "1080p");
        // The digit rule runs first, so numeric spellings pass through and
        // only the bare 4k/2k tokens reach the mapping rules.
        assert_eq!(extract_quality("Show 2160p"), "2160p");
        assert_eq!(extract_quality("Show 4K"), "4k");
        assert_eq!(extract_quality("Show 1440p"), "1440p");
        assert_eq!(extract_quality("Show 2k"), "2k");
        assert_eq!(extract_quality("Show HDTV rip"), "HDTV");
        assert_eq!(extract_quality("Show 4kx265 rip"), "4kx265");
        assert_eq!(extract_quality("Show.[720p].mkv"), "720p");
        assert_eq!(extract_quality("Show plain"), "Unknown");
    }

    #[test]
    fn audio_markers() {
        assert_eq!(extract_audio_info("Show Multi-Audio"), Some("Multi".into()));
        // Dual-Audio is shadowed by the Multi rule; order is the contract.
        assert_eq!(extract_audio_info("Show Dual-Audio"), Some("Multi".into()));
        assert_eq!(extract_audio_info("Show Dual Track"), Some("Dual".into()));
        assert_eq!(extract_audio_info("Show Subbed"), Some("Sub".into()));
        assert_eq!(extract_audio_info("Show Dub"), Some("Dub".into()));
        assert_eq!(extract_audio_info("Show Eng/Jap"), Some("Dual".into()));
        assert_eq!(extract_audio_info("Show TrueHD"), Some("TrueHD".into()));
        assert_eq!(extract_audio_info("Show [Unknown]"), Some("Unknown".into()));
        assert_eq!(extract_audio_info("Show.1080p.Dual.mkv"), Some("Dual".into()));
        assert_eq!(extract_audio_info("Show stereo"), None);
    }

    #[test]
    fn extracted_from_text_combines_fields() {
        let e = Extracted::from_text("Anime.S01E05.1080p.Dual.mkv");
        assert_eq!(e.season.as_deref(), Some("01"));
        assert_eq!(e.episode.as_deref(), Some("05"));
        assert_eq!(e.quality, "1080p");
        assert_eq!(e.audio.as_deref(), Some("Dual"));
    }
}
