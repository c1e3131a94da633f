//! In-memory duplicate-submission guard.
//!
//! Best effort and process-local: the map resets on restart and is not
//! shared across processes. Good enough to stop the same file id being
//! processed twice when a user taps resend.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Tracks file identities with an in-flight pipeline run.
///
/// `should_process` is a single check-and-insert under one lock, so two
/// concurrent submissions of the same file id cannot both pass.
#[derive(Debug)]
pub struct DuplicateGuard {
    window: Duration,
    in_flight: Mutex<HashMap<String, Instant>>,
}

impl DuplicateGuard {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns false when `file_id` was submitted within the window and its
    /// run has not been released yet; the existing record is left alone.
    /// Otherwise records the submission and returns true.
    pub fn should_process(&self, file_id: &str) -> bool {
        let now = Instant::now();
        let mut in_flight = self.in_flight.lock().expect("duplicate guard lock poisoned");
        if let Some(submitted) = in_flight.get(file_id) {
            if now.duration_since(*submitted) < self.window {
                debug!(file_id, "duplicate submission skipped");
                return false;
            }
        }
        in_flight.insert(file_id.to_string(), now);
        true
    }

    /// Drop the record for a finished run. Must be called on every outcome
    /// so the file can be legitimately resubmitted afterwards.
    pub fn release(&self, file_id: &str) {
        self.in_flight
            .lock()
            .expect("duplicate guard lock poisoned")
            .remove(file_id);
    }
}

impl Default for DuplicateGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_submission_within_window_is_rejected() {
        let guard = DuplicateGuard::new();
        assert!(guard.should_process("file-a"));
        assert!(!guard.should_process("file-a"));
        assert!(guard.should_process("file-b"));
    }

    #[test]
    fn submission_after_window_passes() {
        let guard = DuplicateGuard::with_window(Duration::from_millis(20));
        assert!(guard.should_process("file-a"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(guard.should_process("file-a"));
    }

    #[test]
    fn release_allows_resubmission_inside_window() {
        let guard = DuplicateGuard::new();
        assert!(guard.should_process("file-a"));
        guard.release("file-a");
        assert!(guard.should_process("file-a"));
    }

    #[test]
    fn rejection_leaves_existing_record_untouched() {
        let guard = DuplicateGuard::with_window(Duration::from_millis(200));
        assert!(guard.should_process("file-a"));
        std::thread::sleep(Duration::from_millis(50));
        // Rejected, but must not refresh the original timestamp.
        assert!(!guard.should_process("file-a"));
        std::thread::sleep(Duration::from_millis(200));
        // Window measured from the first submission has now elapsed.
        assert!(guard.should_process("file-a"));
    }
}
