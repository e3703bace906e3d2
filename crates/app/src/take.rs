use std::error::Error;

use quiz_core::model::{OptionIndex, StudentInfo, OPTION_LETTERS};
use services::{
    QuestionView, SessionEngine, SessionError, SessionEvent, SessionPhase, SessionUpdate,
    SubmissionReport,
};
use services::session::TimerDisplay;
use tokio::time::{self, Duration, MissedTickBehavior};

use crate::terminal::{InputLines, ask};

const STUDENT_FIELDS: [&str; 5] = ["Title", "First name", "Middle initial", "Last name", "Email"];

/// What one line of input means while answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Select(OptionIndex),
    Next,
    Submit,
    Quit,
    Help,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim().to_ascii_lowercase();
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Command::Next,
        (Some('n'), None) => Command::Next,
        (Some('s'), None) => Command::Submit,
        (Some('q'), None) => Command::Quit,
        (Some(c), None) => OptionIndex::from_letter(c).map_or(Command::Help, Command::Select),
        _ => Command::Help,
    }
}

/// Drive one session from the terminal until it is submitted or abandoned.
pub async fn run_session(
    mut engine: SessionEngine,
    input: InputLines,
) -> Result<(), Box<dyn Error>> {
    println!("== {} ==", engine.quiz().title());
    let mut update = match engine.phase() {
        SessionPhase::ResumePrompt => engine.resolve_resume().await?,
        _ => SessionUpdate::AwaitingStudentInfo,
    };

    let mut ticker = time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        match update {
            SessionUpdate::AwaitingStudentInfo => {
                let Some(student) = collect_student(&input).await? else {
                    return Ok(());
                };
                update = match engine.handle(SessionEvent::BeginSession(student)).await {
                    Err(SessionError::Student(err)) => {
                        println!("{err}");
                        SessionUpdate::AwaitingStudentInfo
                    }
                    other => other?,
                };
                continue;
            }
            SessionUpdate::ShowQuestion(view) => render_question(&view),
            SessionUpdate::Timer(display) => render_timer(display),
            SessionUpdate::Submitted(report) => {
                render_report(&report);
                return Ok(());
            }
            SessionUpdate::Idle => {}
        }

        let event = tokio::select! {
            line = async { input.lock().await.next_line().await } => match line? {
                None => Command::Quit,
                Some(line) => parse_command(&line),
            },
            _ = ticker.tick() => {
                update = keep_going(engine.handle(SessionEvent::Tick).await)?;
                continue;
            }
        };

        update = match event {
            Command::Select(option) => {
                keep_going(engine.handle(SessionEvent::Select(option)).await)?
            }
            Command::Next => keep_going(engine.handle(SessionEvent::Next).await)?,
            Command::Submit => keep_going(engine.handle(SessionEvent::Submit).await)?,
            Command::Help => {
                println!("Type a-d to choose, Enter or n for next, s to submit, q to leave.");
                SessionUpdate::Idle
            }
            Command::Quit => {
                if engine.should_warn_on_leave() {
                    println!("Leaving mid-quiz. Your progress is saved; run `take` again to resume.");
                }
                return Ok(());
            }
        };
    }
}

/// Turn errors that only fail the current step into a notice; the engine stays
/// on the same question, so the next tick or key press retries.
fn keep_going(
    result: Result<SessionUpdate, SessionError>,
) -> Result<SessionUpdate, SessionError> {
    match result {
        Err(SessionError::Progress(err)) => {
            tracing::warn!(error = %err, "session progress not saved");
            println!("Could not save your progress ({err}). Press Enter to try again.");
            Ok(SessionUpdate::Idle)
        }
        Err(err @ SessionError::InvalidPhase { .. }) => {
            println!("{err}");
            Ok(SessionUpdate::Idle)
        }
        other => other,
    }
}

async fn collect_student(input: &InputLines) -> Result<Option<StudentInfo>, Box<dyn Error>> {
    println!("Enter your details to start.");
    let mut values = Vec::with_capacity(STUDENT_FIELDS.len());
    for field in STUDENT_FIELDS {
        let Some(value) = ask(input, &format!("{field}: ")).await? else {
            return Ok(None);
        };
        values.push(value);
    }
    let [title, first, middle, last, email]: [String; 5] = values
        .try_into()
        .map_err(|_| "incomplete student details")?;
    Ok(Some(StudentInfo {
        title,
        first_name: first,
        middle_initial: middle,
        last_name: last,
        email,
    }))
}

fn render_question(view: &QuestionView) {
    println!();
    println!("{}", view.heading());
    println!("{}", view.text);
    for (letter, option) in OPTION_LETTERS.iter().zip(&view.options) {
        let marker = if view.selection.is_some_and(|s| s.letter() == *letter) {
            '*'
        } else {
            ' '
        };
        println!(" {marker}{letter}) {option}");
    }
    if let Some(timer) = view.timer {
        println!("Time left: {timer}");
    }
    let action = if view.is_last { "submit" } else { "next" };
    println!("[a-d] choose, [Enter] {action}, [s] submit, [q] leave");
}

fn render_timer(display: TimerDisplay) {
    if display.remaining_secs <= 5 || display.remaining_secs % 15 == 0 {
        println!("Time left: {display}");
    }
}

fn render_report(report: &SubmissionReport) {
    println!();
    println!("Thanks, {}!", report.student_name);
    println!("{}", report.score_line());
    for item in &report.review {
        let mark = if item.is_correct { "correct" } else { "wrong" };
        println!("{}. {} [{mark}]", item.number, item.question);
        println!("   your answer: {}", item.student_choice_label());
        println!("   correct answer: {}", item.correct_choice);
    }
    if !report.saved() {
        println!("(this result was not saved)");
    }
}

#[cfg(test)]
mod tests {
    use storage::repository::StorageError;

    use super::*;

    #[test]
    fn parses_answer_keys() {
        assert_eq!(parse_command(""), Command::Next);
        assert_eq!(parse_command("n"), Command::Next);
        assert_eq!(parse_command(" S "), Command::Submit);
        assert_eq!(parse_command("q"), Command::Quit);
        assert_eq!(
            parse_command("c"),
            Command::Select(OptionIndex::new(2).unwrap())
        );
        assert_eq!(parse_command("z"), Command::Help);
        assert_eq!(parse_command("abc"), Command::Help);
    }

    #[test]
    fn save_failures_do_not_end_the_session() {
        let failed = Err(SessionError::Progress(StorageError::Connection("disk full".into())));
        assert_eq!(keep_going(failed).unwrap(), SessionUpdate::Idle);

        let early = Err(SessionError::InvalidPhase {
            action: "record an answer",
            phase: SessionPhase::Submitted,
        });
        assert_eq!(keep_going(early).unwrap(), SessionUpdate::Idle);

        let missing = Err(SessionError::MissingQuizId);
        assert!(matches!(keep_going(missing), Err(SessionError::MissingQuizId)));
    }
}
