#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempt_service;
pub mod error;
pub mod live;
pub mod quiz_service;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use attempt_service::{AttemptReview, AttemptService};
pub use error::{AppServicesError, AttemptServiceError, QuizServiceError, SessionError};
pub use live::LiveQuery;
pub use quiz_service::QuizService;

pub use sessions::{
    FixedPrompt, QuestionView, QuizSessionService, SessionEngine, SessionEvent, SessionNotice,
    SessionPhase, SessionPrompt, SessionUpdate, SubmissionReport,
};
