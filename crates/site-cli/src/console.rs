use async_trait::async_trait;
use site_client::{Confirmer, Notice, Notifier};
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Prints notices to stderr so stdout stays clean for `--json`.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        eprintln!("{notice}");
    }
}

/// Asks on the terminal. Anything other than `y`/`yes` is a no.
pub struct StdinConfirmer;

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stderr = io::stderr();
            write!(stderr, "{prompt} [y/N] ")?;
            stderr.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;
        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(err)) => {
                warn!(event = "confirm_read_failed", error = %err);
                false
            }
            Err(err) => {
                warn!(event = "confirm_task_failed", error = %err);
                false
            }
        }
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("yep"));
    }
}
