use std::sync::Arc;

use chrono::Duration;

use quiz_core::Clock;
use quiz_core::model::{
    AnswerSheet, AttemptRecord, OptionIndex, QuizDefinition, QuizId, StudentInfo, TimerSetting,
};
use quiz_core::scoring::{review_answers, score_answers};
use storage::repository::AttemptRepository;

use super::progress::{ProgressStore, SavedProgress, SessionState};
use super::prompt::{SessionNotice, SessionPrompt};
use super::timer::{Countdown, CountdownScope, TimerDisplay};
use super::view::{QuestionView, SessionEvent, SessionPhase, SessionUpdate, SubmissionReport};
use crate::error::SessionError;

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// One student's pass through one quiz.
///
/// Every state change is written to the session store before the engine moves
/// on, so a reload can pick up at the same question with the same answers and,
/// for total timers, the same absolute deadline. Submission happens at most once.
pub struct SessionEngine {
    quiz_id: QuizId,
    quiz: QuizDefinition,
    clock: Clock,
    phase: SessionPhase,
    state: Option<SessionState>,
    pending: Option<SavedProgress>,
    selection: Option<OptionIndex>,
    countdown: Option<Countdown>,
    outcome: Option<SubmissionReport>,
    progress: ProgressStore,
    attempts: Arc<dyn AttemptRepository>,
    prompt: Arc<dyn SessionPrompt>,
}

impl SessionEngine {
    pub(crate) fn new(
        quiz_id: QuizId,
        quiz: QuizDefinition,
        clock: Clock,
        progress: ProgressStore,
        attempts: Arc<dyn AttemptRepository>,
        prompt: Arc<dyn SessionPrompt>,
        pending: Option<SavedProgress>,
    ) -> Self {
        let phase = if pending.is_some() {
            SessionPhase::ResumePrompt
        } else {
            SessionPhase::CollectingStudentInfo
        };
        Self {
            quiz_id,
            quiz,
            clock,
            phase,
            state: None,
            pending,
            selection: None,
            countdown: None,
            outcome: None,
            progress,
            attempts,
            prompt,
        }
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn quiz(&self) -> &QuizDefinition {
        &self.quiz
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// In-progress state, once the student has started or resumed.
    #[must_use]
    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn selection(&self) -> Option<OptionIndex> {
        self.selection
    }

    /// Result of the submission, once submitted.
    #[must_use]
    pub fn outcome(&self) -> Option<&SubmissionReport> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Replace the clock, e.g. to move a fixed clock forward.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    /// True while leaving would abandon a running attempt.
    #[must_use]
    pub fn should_warn_on_leave(&self) -> bool {
        self.phase == SessionPhase::InProgress
    }

    #[must_use]
    pub fn timer_display(&self) -> Option<TimerDisplay> {
        self.countdown.map(|c| c.display(&self.clock))
    }

    /// The question on screen, if any.
    #[must_use]
    pub fn current_view(&self) -> Option<QuestionView> {
        if self.phase != SessionPhase::InProgress {
            return None;
        }
        let index = self.state.as_ref()?.current_question_index;
        let question = self.quiz.question(index)?;
        Some(QuestionView::build(
            index,
            self.quiz.question_count(),
            question,
            self.selection,
            self.timer_display(),
        ))
    }

    /// Apply one presenter event.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the event does not fit the current phase or
    /// progress cannot be saved.
    pub async fn handle(&mut self, event: SessionEvent) -> Result<SessionUpdate, SessionError> {
        match event {
            SessionEvent::ResumeChosen(resume) => {
                self.expect_phase(SessionPhase::ResumePrompt, "resolve saved progress")?;
                self.choose_resume(resume).await
            }
            SessionEvent::BeginSession(student) => self.begin_session(student).await,
            SessionEvent::Select(option) => self.select_option(option),
            SessionEvent::Next => self.next().await,
            SessionEvent::Tick => self.tick().await,
            SessionEvent::PerItemTimeout => self.on_per_item_timeout().await,
            SessionEvent::TotalTimeout => self.on_total_timeout().await,
            SessionEvent::Submit => self.submit().await,
        }
    }

    //
    // ─── STARTING ──────────────────────────────────────────────────────────────
    //

    /// Start a fresh attempt for `student`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Student` for missing fields, `SessionError::Progress`
    /// if the initial state cannot be saved.
    pub async fn begin_session(
        &mut self,
        student: StudentInfo,
    ) -> Result<SessionUpdate, SessionError> {
        self.expect_phase(SessionPhase::CollectingStudentInfo, "begin the session")?;
        student.check_present()?;

        let state = SessionState::new(student);
        self.progress
            .save_state(&state)
            .map_err(SessionError::Progress)?;
        let deadline = match self.quiz.settings().timer() {
            TimerSetting::Total { minutes } => {
                let deadline = self
                    .clock
                    .deadline_after(Duration::minutes(i64::from(minutes)));
                self.progress
                    .save_deadline(deadline)
                    .map_err(SessionError::Progress)?;
                Some(deadline)
            }
            _ => None,
        };

        tracing::info!(quiz_id = %self.quiz_id, "session started");
        self.state = Some(state);
        self.phase = SessionPhase::InProgress;
        self.countdown = deadline.map(Countdown::total);
        self.present_current().await
    }

    /// Ask the prompt whether to continue saved progress and act on the answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if no saved progress is pending or the store fails.
    pub async fn resolve_resume(&mut self) -> Result<SessionUpdate, SessionError> {
        self.expect_phase(SessionPhase::ResumePrompt, "resolve saved progress")?;
        let resume = self.prompt.confirm_resume(self.quiz.title()).await;
        self.choose_resume(resume).await
    }

    async fn choose_resume(&mut self, resume: bool) -> Result<SessionUpdate, SessionError> {
        if resume {
            self.resume().await
        } else {
            self.restart()
        }
    }

    /// Continue from saved progress.
    ///
    /// Submits immediately when the saved deadline has already passed or every
    /// question was already passed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` unless saved progress is pending.
    pub async fn resume(&mut self) -> Result<SessionUpdate, SessionError> {
        self.expect_phase(SessionPhase::ResumePrompt, "resume")?;
        let Some(saved) = self.pending.take() else {
            return Err(self.phase_error("resume"));
        };

        let deadline = match self.quiz.settings().timer() {
            TimerSetting::Total { minutes } => match saved.deadline {
                Some(deadline) => Some(deadline),
                None => {
                    let deadline = self
                        .clock
                        .deadline_after(Duration::minutes(i64::from(minutes)));
                    self.progress
                        .save_deadline(deadline)
                        .map_err(SessionError::Progress)?;
                    Some(deadline)
                }
            },
            _ => None,
        };

        tracing::info!(
            quiz_id = %self.quiz_id,
            index = saved.state.current_question_index,
            "resuming saved session"
        );
        self.state = Some(saved.state);
        self.phase = SessionPhase::InProgress;
        self.countdown = deadline.map(Countdown::total);

        let expired = deadline.is_some_and(|d| self.clock.remaining_until(d) <= Duration::zero());
        if expired {
            tracing::info!(quiz_id = %self.quiz_id, "deadline passed while away");
            return self.finish().await;
        }
        self.present_current().await
    }

    /// Discard saved progress and go back to collecting student info.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Progress` if the store cannot be cleared.
    pub fn restart(&mut self) -> Result<SessionUpdate, SessionError> {
        self.expect_phase(SessionPhase::ResumePrompt, "restart")?;
        self.progress.clear().map_err(SessionError::Progress)?;
        self.pending = None;
        self.phase = SessionPhase::CollectingStudentInfo;
        tracing::info!(quiz_id = %self.quiz_id, "saved session discarded");
        Ok(SessionUpdate::AwaitingStudentInfo)
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Mark `option` as the pending choice for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside an attempt.
    pub fn select_option(&mut self, option: OptionIndex) -> Result<SessionUpdate, SessionError> {
        self.expect_phase(SessionPhase::InProgress, "select an option")?;
        self.selection = Some(option);
        Ok(self
            .current_view()
            .map_or(SessionUpdate::Idle, SessionUpdate::ShowQuestion))
    }

    /// Record the pending choice (or no answer) and advance.
    ///
    /// # Errors
    ///
    /// See [`SessionEngine::record_answer`].
    pub async fn next(&mut self) -> Result<SessionUpdate, SessionError> {
        self.record_answer(self.selection).await
    }

    /// Store `selection` for the current question, save, then advance.
    ///
    /// Passing the last question submits.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Progress` if saving fails; the engine does not
    /// advance in that case.
    pub async fn record_answer(
        &mut self,
        selection: Option<OptionIndex>,
    ) -> Result<SessionUpdate, SessionError> {
        self.expect_phase(SessionPhase::InProgress, "record an answer")?;
        let Some(current) = self.state.as_ref() else {
            return Err(self.phase_error("record an answer"));
        };

        let mut next = current.clone();
        let index = next.current_question_index;
        next.student_answers.record(index, selection);
        next.current_question_index = index + 1;
        self.progress
            .save_state(&next)
            .map_err(SessionError::Progress)?;

        tracing::debug!(quiz_id = %self.quiz_id, index, answered = selection.is_some(), "answer recorded");
        self.state = Some(next);
        self.selection = None;
        if matches!(
            self.countdown.map(|c| c.scope()),
            Some(CountdownScope::Question(_))
        ) {
            self.countdown = None;
        }
        self.present_current().await
    }

    //
    // ─── TIMERS ────────────────────────────────────────────────────────────────
    //

    /// Refresh the running countdown, firing its timeout once it has expired.
    ///
    /// # Errors
    ///
    /// Propagates errors from the fired timeout.
    pub async fn tick(&mut self) -> Result<SessionUpdate, SessionError> {
        if self.phase != SessionPhase::InProgress {
            return Ok(SessionUpdate::Idle);
        }
        let Some(countdown) = self.countdown else {
            return Ok(SessionUpdate::Idle);
        };
        if !countdown.is_expired(&self.clock) {
            return Ok(SessionUpdate::Timer(countdown.display(&self.clock)));
        }
        match countdown.scope() {
            CountdownScope::Question(_) => self.on_per_item_timeout().await,
            CountdownScope::Session => self.on_total_timeout().await,
        }
    }

    /// Per-question time ran out: record whatever is selected and advance.
    ///
    /// Ignored unless a per-question countdown for the current question is running.
    ///
    /// # Errors
    ///
    /// See [`SessionEngine::record_answer`].
    pub async fn on_per_item_timeout(&mut self) -> Result<SessionUpdate, SessionError> {
        if self.phase != SessionPhase::InProgress {
            return Ok(SessionUpdate::Idle);
        }
        let index = self.state.as_ref().map(|s| s.current_question_index);
        match (self.countdown.map(|c| c.scope()), index) {
            (Some(CountdownScope::Question(scoped)), Some(index)) if scoped == index => {}
            _ => return Ok(SessionUpdate::Idle),
        }
        tracing::debug!(quiz_id = %self.quiz_id, "question time expired");
        self.record_answer(self.selection).await
    }

    /// Total time ran out: submit with the answers recorded so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` only if the session state is missing.
    pub async fn on_total_timeout(&mut self) -> Result<SessionUpdate, SessionError> {
        if self.phase != SessionPhase::InProgress
            || !matches!(self.quiz.settings().timer(), TimerSetting::Total { .. })
        {
            return Ok(SessionUpdate::Idle);
        }
        tracing::info!(quiz_id = %self.quiz_id, "total time expired");
        self.prompt.notify(SessionNotice::TimeUp);
        self.finish().await
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    /// Finalize the attempt.
    ///
    /// Calling again after submission returns the same report without
    /// scoring or writing again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` before the attempt has started.
    pub async fn submit(&mut self) -> Result<SessionUpdate, SessionError> {
        match (self.phase, &self.outcome) {
            (SessionPhase::Submitted, Some(report)) => {
                Ok(SessionUpdate::Submitted(report.clone()))
            }
            (SessionPhase::InProgress, _) => self.finish().await,
            _ => Err(self.phase_error("submit")),
        }
    }

    async fn finish(&mut self) -> Result<SessionUpdate, SessionError> {
        let Some(state) = self.state.clone() else {
            return Err(self.phase_error("submit"));
        };
        self.phase = SessionPhase::Submitted;
        self.countdown = None;
        self.selection = None;
        if let Err(err) = self.progress.clear() {
            tracing::warn!(quiz_id = %self.quiz_id, error = %err, "could not clear session progress");
        }

        let mut answers: AnswerSheet = state.student_answers;
        answers.pad_to(self.quiz.question_count());
        let score = score_answers(&self.quiz, &answers);
        let total_points = self.quiz.total_points();
        let review = review_answers(&self.quiz, &answers);
        let student_name = state.student_info.display_name();

        let record = AttemptRecord::new(
            self.quiz_id,
            self.quiz.title(),
            state.student_info,
            answers,
            score,
            total_points,
            self.clock.now(),
        );
        let saved = match record {
            Ok(record) => self
                .attempts
                .append_attempt(&record)
                .await
                .map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        let attempt_id = match saved {
            Ok(id) => {
                tracing::info!(quiz_id = %self.quiz_id, attempt_id = %id, score, total_points, "attempt submitted");
                Some(id)
            }
            Err(reason) => {
                tracing::error!(quiz_id = %self.quiz_id, error = %reason, "attempt could not be saved");
                self.prompt
                    .notify(SessionNotice::SubmissionNotSaved { reason });
                None
            }
        };

        let report = SubmissionReport {
            student_name,
            score,
            total_points,
            review,
            attempt_id,
        };
        self.outcome = Some(report.clone());
        Ok(SessionUpdate::Submitted(report))
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    async fn present_current(&mut self) -> Result<SessionUpdate, SessionError> {
        let Some(index) = self.state.as_ref().map(|s| s.current_question_index) else {
            return Err(self.phase_error("show a question"));
        };
        if index >= self.quiz.question_count() {
            return self.finish().await;
        }
        if let TimerSetting::PerItem { seconds } = self.quiz.settings().timer() {
            self.countdown = Some(Countdown::per_item(index, seconds, &self.clock));
        }
        Ok(self
            .current_view()
            .map_or(SessionUpdate::Idle, SessionUpdate::ShowQuestion))
    }

    fn expect_phase(&self, expected: SessionPhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(self.phase_error(action))
        }
    }

    fn phase_error(&self, action: &'static str) -> SessionError {
        SessionError::InvalidPhase {
            action,
            phase: self.phase,
        }
    }
}
