use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::services::llm::LlmError;

fn speech_filter() -> Option<&'static Regex> {
    static FILTER: OnceLock<Option<Regex>> = OnceLock::new();
    FILTER.get_or_init(|| Regex::new(r"[^\w\s,.!?]").ok()).as_ref()
}

/// Drops emoji and symbols a voice would read out literally.
pub(crate) fn clean_text(text: &str) -> String {
    match speech_filter() {
        Some(filter) => filter.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// At most one background synthesis per session, plus the audio of the last finished one.
#[derive(Debug, Default)]
pub(crate) struct SpeechHandle {
    task: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    audio: Arc<Mutex<Option<Arc<Vec<u8>>>>>,
}

impl SpeechHandle {
    pub(crate) fn is_speaking(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts `job` on a detached task. Returns `false` while a previous job is still running.
    pub(crate) fn speak<F, Fut>(&mut self, job: F) -> bool
    where
        F: FnOnce(Arc<AtomicBool>) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, LlmError>> + Send + 'static,
    {
        if self.is_speaking() {
            return false;
        }

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = cancel.clone();

        let audio = self.audio.clone();
        let flag = cancel.clone();
        let work = job(cancel);
        self.task = Some(tokio::spawn(async move {
            match work.await {
                Ok(bytes) if !flag.load(Ordering::Relaxed) => {
                    *audio.lock().await = Some(Arc::new(bytes));
                }
                Ok(_) | Err(LlmError::Cancelled) => {
                    tracing::debug!("Speech synthesis cancelled");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Speech synthesis failed");
                }
            }
        }));
        true
    }

    /// Signals cancellation, waits up to `join_timeout`, then aborts the task.
    pub(crate) async fn stop(&mut self, join_timeout: Duration) {
        self.cancel.store(true, Ordering::Relaxed);

        let Some(task) = self.task.take() else {
            return;
        };
        let abort = task.abort_handle();
        if tokio::time::timeout(join_timeout, task).await.is_err() {
            abort.abort();
            tracing::debug!("Speech task did not stop in time; aborted");
        }
    }

    pub(crate) async fn audio(&self) -> Option<Arc<Vec<u8>>> {
        self.audio.lock().await.clone()
    }
}

impl Drop for SpeechHandle {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_keeps_words_and_punctuation() {
        assert_eq!(clean_text("Oof that stings 💔 Wanna rant?"), "Oof that stings  Wanna rant?");
        assert_eq!(clean_text("Great job! 🎉 #proud @you"), "Great job!  proud you");
        assert_eq!(clean_text("Café, naïve."), "Café, naïve.");
    }

    #[tokio::test]
    async fn finished_job_exposes_audio() {
        let mut handle = SpeechHandle::default();
        assert!(handle.speak(|_| async { Ok(vec![1, 2, 3]) }));

        for _ in 0..50 {
            if !handle.is_speaking() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!handle.is_speaking());
        assert_eq!(handle.audio().await.as_deref(), Some(&vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn second_speak_is_refused_while_running() {
        let mut handle = SpeechHandle::default();
        assert!(handle.speak(|_| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }));
        assert!(handle.is_speaking());
        assert!(!handle.speak(|_| async { Ok(vec![9]) }));

        handle.stop(Duration::from_millis(50)).await;
        assert!(!handle.is_speaking());
        assert!(handle.audio().await.is_none());
    }

    #[tokio::test]
    async fn stop_lets_cooperative_job_finish() {
        let mut handle = SpeechHandle::default();
        assert!(handle.speak(|cancel| async move {
            while !cancel.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Err(LlmError::Cancelled)
        }));

        handle.stop(Duration::from_secs(1)).await;
        assert!(!handle.is_speaking());
        assert!(handle.speak(|_| async { Ok(vec![7]) }));
    }
}
