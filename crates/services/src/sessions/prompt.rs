use std::sync::Mutex;

use async_trait::async_trait;

/// One-way messages the engine shows the student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The total timer ran out and the quiz is being submitted.
    TimeUp,
    /// The attempt could not be written; the result is shown anyway.
    SubmissionNotSaved { reason: String },
}

/// Interaction points the engine needs from whoever presents the quiz.
#[async_trait]
pub trait SessionPrompt: Send + Sync {
    /// Ask whether to continue a saved attempt of `quiz_title`.
    async fn confirm_resume(&self, quiz_title: &str) -> bool;

    fn notify(&self, notice: SessionNotice);
}

/// Prompt with a preset resume answer that records every notice.
///
/// Useful for headless runs and tests.
#[derive(Debug, Default)]
pub struct FixedPrompt {
    resume: bool,
    notices: Mutex<Vec<SessionNotice>>,
}

impl FixedPrompt {
    #[must_use]
    pub fn new(resume: bool) -> Self {
        Self {
            resume,
            notices: Mutex::new(Vec::new()),
        }
    }

    /// Notices received so far.
    #[must_use]
    pub fn notices(&self) -> Vec<SessionNotice> {
        self.notices
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionPrompt for FixedPrompt {
    async fn confirm_resume(&self, _quiz_title: &str) -> bool {
        self.resume
    }

    fn notify(&self, notice: SessionNotice) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.push(notice);
        }
    }
}
