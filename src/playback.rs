//! Playback Trigger
//!
//! Client-side effect of a verification decision: start audible playback
//! only when the attempt was accepted, and surface a transient notice
//! either way. The triggering control stays disabled for the duration of
//! the attempt and is re-enabled on every exit path, including panicking
//! collaborators.

use crate::catalog::Track;
use crate::verify::{VerificationOutcome, VerificationWorkflow};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

// ============================================================================
// Collaborators
// ============================================================================

/// Starts audible playback of a track
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Begin playing the given track.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying audio output refuses to
    /// start.
    async fn play(&self, track: &Track) -> Result<()>;
}

/// Kind of a transient user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
}

/// Transient user-facing notice
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: String) -> Self {
        Self {
            kind: NoticeKind::Success,
            message,
        }
    }

    pub fn warning(message: String) -> Self {
        Self {
            kind: NoticeKind::Warning,
            message,
        }
    }
}

/// Shows transient notices to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

// ============================================================================
// Trigger
// ============================================================================

/// What a trigger call did
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerResult {
    /// Verification accepted the attempt and playback started
    Played { score: f64 },

    /// The attempt completed without starting playback
    Blocked { score: f64 },

    /// Another attempt is already in flight; nothing was counted
    Busy,
}

/// Gated play control
///
/// One instance per playback surface. Holds an in-flight latch that
/// mirrors the disabled play button in a browser client: a second
/// trigger while one attempt is pending is refused before it reaches
/// the workflow.
pub struct PlaybackTrigger {
    workflow: Arc<VerificationWorkflow>,
    sink: Arc<dyn AudioSink>,
    notifier: Arc<dyn Notifier>,
    busy: AtomicBool,
}

impl PlaybackTrigger {
    pub fn new(
        workflow: Arc<VerificationWorkflow>,
        sink: Arc<dyn AudioSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            workflow,
            sink,
            notifier,
            busy: AtomicBool::new(false),
        }
    }

    /// Run one gated play attempt for a track.
    ///
    /// Playback starts only on an accepted outcome. A notice is shown for
    /// every completed attempt, carrying the resolved score (0 when none
    /// was resolved). The control latch is released on every exit path.
    pub async fn play(&self, track: &Track, token: &str, action: &str) -> TriggerResult {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return TriggerResult::Busy;
        }
        let _guard = ControlGuard { busy: &self.busy };

        let track_id = track.id.to_string();
        let outcome = self.workflow.verify_play(token, &track_id, action).await;

        match outcome {
            VerificationOutcome::Accepted { score } => {
                if let Err(e) = self.sink.play(track).await {
                    warn!(track = %track.title, error = %e, "Audio sink failed to start");
                    self.notifier
                        .notify(Notice::warning(format!("Playback failed: {}", e)));
                    return TriggerResult::Blocked { score };
                }

                self.notifier.notify(Notice::success(format!(
                    "Play verified! Human score: {:.2}",
                    score
                )));
                TriggerResult::Played { score }
            }
            VerificationOutcome::Rejected { score } => {
                self.notifier.notify(Notice::warning(format!(
                    "Play blocked. Bot detection score: {:.2}",
                    score
                )));
                TriggerResult::Blocked { score }
            }
            VerificationOutcome::Errored { .. } => {
                let score = outcome.score();
                self.notifier.notify(Notice::warning(format!(
                    "Play blocked. Bot detection score: {:.2}",
                    score
                )));
                TriggerResult::Blocked { score }
            }
        }
    }
}

/// Re-enables the trigger control when dropped
struct ControlGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for ControlGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsStore;
    use crate::verify::{OracleFailurePolicy, ProviderError, ScoreProvider, ScoreReport};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct StubProvider {
        result: Result<ScoreReport, ProviderError>,
    }

    #[async_trait]
    impl ScoreProvider for StubProvider {
        async fn request_score(
            &self,
            _token: &str,
            _track_id: &str,
            _action: &str,
        ) -> Result<ScoreReport, ProviderError> {
            self.result.clone()
        }
    }

    /// Provider that blocks until released, for latch tests
    struct GatedProvider {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl ScoreProvider for GatedProvider {
        async fn request_score(
            &self,
            _token: &str,
            _track_id: &str,
            _action: &str,
        ) -> Result<ScoreReport, ProviderError> {
            self.release.notified().await;
            Ok(ScoreReport { score: 0.9 })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        played: Mutex<Vec<u32>>,
        fail: bool,
    }

    #[async_trait]
    impl AudioSink for RecordingSink {
        async fn play(&self, track: &Track) -> Result<()> {
            if self.fail {
                anyhow::bail!("audio device unavailable");
            }
            self.played.lock().unwrap().push(track.id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<Notice>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    fn track() -> Track {
        Track {
            id: 1,
            filename: "1-bigman.mp3".to_string(),
            title: "Big Man".to_string(),
            url: "/media/1-bigman.mp3".to_string(),
        }
    }

    fn trigger_with(
        provider: Arc<dyn ScoreProvider>,
        sink: Arc<RecordingSink>,
        notifier: Arc<RecordingNotifier>,
    ) -> PlaybackTrigger {
        let workflow = Arc::new(VerificationWorkflow::new(
            provider,
            Arc::new(StatsStore::new()),
            0.5,
            OracleFailurePolicy::FailClosed,
        ));
        PlaybackTrigger::new(workflow, sink, notifier)
    }

    #[tokio::test]
    async fn test_accepted_outcome_plays_and_notifies_success() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let trigger = trigger_with(
            Arc::new(StubProvider {
                result: Ok(ScoreReport { score: 0.8 }),
            }),
            sink.clone(),
            notifier.clone(),
        );

        let result = trigger.play(&track(), "token", "play_music").await;
        assert_eq!(result, TriggerResult::Played { score: 0.8 });
        assert_eq!(*sink.played.lock().unwrap(), vec![1]);

        let notices = notifier.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Success);
        assert!(notices[0].message.contains("0.80"));
    }

    #[tokio::test]
    async fn test_rejected_outcome_never_touches_the_sink() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let trigger = trigger_with(
            Arc::new(StubProvider {
                result: Ok(ScoreReport { score: 0.2 }),
            }),
            sink.clone(),
            notifier.clone(),
        );

        let result = trigger.play(&track(), "token", "play_music").await;
        assert_eq!(result, TriggerResult::Blocked { score: 0.2 });
        assert!(sink.played.lock().unwrap().is_empty());

        let notices = notifier.notices.lock().unwrap();
        assert_eq!(notices[0].kind, NoticeKind::Warning);
        assert!(notices[0].message.contains("0.20"));
    }

    #[tokio::test]
    async fn test_errored_outcome_notifies_with_zero_score() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let trigger = trigger_with(
            Arc::new(StubProvider {
                result: Err(ProviderError::Network("unreachable".to_string())),
            }),
            sink.clone(),
            notifier.clone(),
        );

        let result = trigger.play(&track(), "token", "play_music").await;
        assert_eq!(result, TriggerResult::Blocked { score: 0.0 });
        assert!(sink.played.lock().unwrap().is_empty());
        assert!(
            notifier.notices.lock().unwrap()[0]
                .message
                .contains("0.00")
        );
    }

    #[tokio::test]
    async fn test_sink_failure_still_notifies_and_releases_latch() {
        let sink = Arc::new(RecordingSink {
            played: Mutex::new(Vec::new()),
            fail: true,
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let trigger = trigger_with(
            Arc::new(StubProvider {
                result: Ok(ScoreReport { score: 0.9 }),
            }),
            sink.clone(),
            notifier.clone(),
        );

        let result = trigger.play(&track(), "token", "play_music").await;
        assert_eq!(result, TriggerResult::Blocked { score: 0.9 });
        assert_eq!(notifier.notices.lock().unwrap()[0].kind, NoticeKind::Warning);

        // Latch released: the next attempt is not refused as busy
        let result = trigger.play(&track(), "token", "play_music").await;
        assert_ne!(result, TriggerResult::Busy);
    }

    #[tokio::test]
    async fn test_second_trigger_while_pending_is_refused() {
        let release = Arc::new(Notify::new());
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let trigger = Arc::new(trigger_with(
            Arc::new(GatedProvider {
                release: release.clone(),
            }),
            sink.clone(),
            notifier.clone(),
        ));

        let first = {
            let trigger = trigger.clone();
            tokio::spawn(async move { trigger.play(&track(), "token", "play_music").await })
        };

        // Let the first attempt reach the provider and park there
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let second = trigger.play(&track(), "token", "play_music").await;
        assert_eq!(second, TriggerResult::Busy);

        release.notify_one();
        let first = first.await.unwrap();
        assert_eq!(first, TriggerResult::Played { score: 0.9 });
        assert_eq!(*sink.played.lock().unwrap(), vec![1]);
    }
}
