mod progress;
mod prompt;
mod service;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::{ProgressStore, SavedProgress, SessionState};
pub use prompt::{FixedPrompt, SessionNotice, SessionPrompt};
pub use service::SessionEngine;
pub use timer::{Countdown, CountdownScope, TimerDisplay};
pub use view::{QuestionView, SessionEvent, SessionPhase, SessionUpdate, SubmissionReport};
pub use workflow::QuizSessionService;
