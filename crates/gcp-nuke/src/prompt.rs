//! Interactive confirmation

use crate::error::NukeError;
use std::io::{self, BufRead};
use std::time::Duration;

/// Asks the operator to confirm a destructive step
#[cfg_attr(test, mockall::automock)]
pub trait Confirm: Send + Sync {
    /// Read one answer from the operator
    fn read_answer(&self) -> io::Result<String>;
}

/// Reads answers from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn read_answer(&self) -> io::Result<String> {
        read_line(io::stdin().lock())
    }
}

/// Read one line, without the trailing newline
pub fn read_line(mut reader: impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// How to confirm before a destructive step
#[derive(Debug, Clone, Copy)]
pub enum Confirmation {
    /// The operator must type the project ID
    Interactive,
    /// Skip the question and wait this long instead
    Sleep(Duration),
}

/// Print `message` and require the operator to type `project_id`.
///
/// With [`Confirmation::Sleep`] the question is skipped and the run only
/// pauses, giving the operator a chance to interrupt it.
pub async fn prompt(
    confirm: &dyn Confirm,
    confirmation: Confirmation,
    message: &str,
    project_id: &str,
) -> Result<(), NukeError> {
    println!("{message}");

    match confirmation {
        Confirmation::Sleep(delay) => {
            println!("Waiting {}s before continuing.", delay.as_secs());
            tokio::time::sleep(delay).await;
            Ok(())
        }
        Confirmation::Interactive => {
            print!("> ");
            let _ = io::Write::flush(&mut io::stdout());
            let answer = confirm.read_answer().map_err(|_| NukeError::Aborted)?;
            if answer == project_id {
                println!();
                Ok(())
            } else {
                Err(NukeError::Aborted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_line_trims() {
        let answer = read_line(io::Cursor::new("dev-project\n")).unwrap();
        assert_eq!(answer, "dev-project");
        assert_eq!(read_line(io::Cursor::new("")).unwrap(), "");
    }

    #[tokio::test]
    async fn test_prompt_accepts_project_id() {
        let mut confirm = MockConfirm::new();
        confirm
            .expect_read_answer()
            .times(1)
            .returning(|| Ok("dev-project".to_string()));

        prompt(&confirm, Confirmation::Interactive, "Nuke?", "dev-project")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_prompt_rejects_other_answer() {
        let mut confirm = MockConfirm::new();
        confirm
            .expect_read_answer()
            .returning(|| Ok("yes".to_string()));

        let err = prompt(&confirm, Confirmation::Interactive, "Nuke?", "dev-project")
            .await
            .unwrap_err();
        assert!(matches!(err, NukeError::Aborted));
    }

    #[tokio::test]
    async fn test_sleep_skips_question() {
        let mut confirm = MockConfirm::new();
        confirm.expect_read_answer().never();

        prompt(&confirm, Confirmation::Sleep(Duration::ZERO), "Nuke?", "dev-project")
            .await
            .unwrap();
    }
}
