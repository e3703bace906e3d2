use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use services::{SessionNotice, SessionPrompt};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Shared line reader over stdin.
pub type InputLines = Arc<Mutex<Lines<BufReader<Stdin>>>>;

pub fn stdin_lines() -> InputLines {
    Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()))
}

/// Print `label` and read one trimmed line. `None` at end of input.
pub async fn ask(input: &InputLines, label: &str) -> std::io::Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    let line = input.lock().await.next_line().await?;
    Ok(line.map(|l| l.trim().to_string()))
}

/// Session prompt that talks to the terminal.
pub struct TerminalPrompt {
    input: InputLines,
}

impl TerminalPrompt {
    pub fn new(input: InputLines) -> Self {
        Self { input }
    }
}

#[async_trait]
impl SessionPrompt for TerminalPrompt {
    async fn confirm_resume(&self, quiz_title: &str) -> bool {
        let label = format!("You have an unfinished attempt of \"{quiz_title}\". Resume it? [Y/n] ");
        match ask(&self.input, &label).await {
            Ok(Some(answer)) => !matches!(answer.to_ascii_lowercase().as_str(), "n" | "no"),
            Ok(None) => true,
            Err(err) => {
                tracing::warn!(error = %err, "could not read resume answer");
                true
            }
        }
    }

    fn notify(&self, notice: SessionNotice) {
        match notice {
            SessionNotice::TimeUp => println!("\nTime's up! Submitting your quiz..."),
            SessionNotice::SubmissionNotSaved { reason } => {
                eprintln!("There was an error submitting your quiz ({reason}). Your result is shown below but was not saved.");
            }
        }
    }
}
