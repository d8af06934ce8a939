//! Chat Loop
//!
//! Reads one line per turn, streams the reply into the conversation, and
//! hands rendered output to a printer channel. Ctrl-C during a turn cancels
//! the reply stream; at the prompt it ends the session.

use relay_core::{
    run_turn_with_cancel, CancellationToken, Conversation, ReplySource, Sender, TurnError,
    TurnOutcome,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::display::{prefix, Transcript};

/// Input that ends the session
pub const QUIT: &str = "/quit";

/// Summary of a finished session
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Turns whose reply completed
    pub completed: u32,
    /// Turns whose reply failed
    pub failed: u32,
    /// Turns cancelled with Ctrl-C
    pub cancelled: u32,
}

/// Run the chat loop until `/quit`, end of input, or Ctrl-C at the prompt
pub async fn run_chat<R, S>(
    input: R,
    source: &S,
    output: mpsc::UnboundedSender<String>,
) -> anyhow::Result<SessionStats>
where
    R: AsyncBufRead + Unpin,
    S: ReplySource + ?Sized,
{
    let mut conversation = Conversation::with_greeting();
    let mut transcript = Transcript::new();
    let mut stats = SessionStats::default();
    let mut lines = input.lines();

    for message in conversation.get() {
        emit(&output, transcript.render(message));
    }

    loop {
        emit(&output, Some(prefix(Sender::User).to_string()));

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                emit(&output, Some("\n".to_string()));
                None
            }
        };
        let Some(line) = line else {
            debug!("Input closed");
            break;
        };
        if line.trim() == QUIT {
            break;
        }

        let cancel = CancellationToken::new();
        let turn = run_turn_with_cancel(&mut conversation, source, &line, &cancel, |message| {
            emit(&output, transcript.render(message));
        });
        tokio::pin!(turn);

        let result = loop {
            tokio::select! {
                result = &mut turn => break result,
                _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                    info!("Cancelling reply");
                    cancel.cancel();
                }
            }
        };

        match result {
            Ok(report) => match report.outcome {
                TurnOutcome::Completed => stats.completed += 1,
                TurnOutcome::Failed(_) => stats.failed += 1,
                TurnOutcome::Cancelled => stats.cancelled += 1,
            },
            Err(TurnError::EmptyInput) => {}
        }
    }

    info!(
        completed = stats.completed,
        failed = stats.failed,
        cancelled = stats.cancelled,
        "Chat session ended"
    );
    Ok(stats)
}

/// Write everything sent on `rx` to stdout, flushing after each piece
pub async fn print_output(mut rx: mpsc::UnboundedReceiver<String>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(text) = rx.recv().await {
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn emit(output: &mpsc::UnboundedSender<String>, text: Option<String>) {
    if let Some(text) = text {
        // Printer gone means the process is shutting down
        let _ = output.send(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use relay_core::{FetchError, RequestFailure, FALLBACK_REPLY, GREETING};

    /// Streams the words of a fixed reply, or fails for the prompt "fail"
    struct WordSource(&'static str);

    #[async_trait]
    impl ReplySource for WordSource {
        async fn stream_reply(
            &self,
            input: &str,
            _cancel: &CancellationToken,
            on_fragment: &mut (dyn for<'f> FnMut(&'f str) + Send),
        ) -> Result<(), FetchError> {
            if input == "fail" {
                return Err(RequestFailure::Status(500).into());
            }
            for word in self.0.split_inclusive(' ') {
                on_fragment(word);
            }
            Ok(())
        }

        async fn fetch_reply(&self, _input: &str) -> Result<String, FetchError> {
            Ok(self.0.to_string())
        }
    }

    async fn session(input: &'static str) -> (SessionStats, String) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stats = run_chat(input.as_bytes(), &WordSource("The answer is 4"), tx)
            .await
            .unwrap();

        let mut printed = String::new();
        while let Ok(text) = rx.try_recv() {
            printed.push_str(&text);
        }
        (stats, printed)
    }

    #[tokio::test]
    async fn test_turn_output() {
        let (stats, printed) = session("2+2?\n/quit\n").await;

        assert_eq!(stats.completed, 1);
        assert_eq!(
            printed,
            format!("Bot: {GREETING}\nYou: Bot: The answer is 4\nYou: ")
        );
    }

    #[tokio::test]
    async fn test_failure_prints_fallback() {
        let (stats, printed) = session("fail\n").await;

        assert_eq!(stats.failed, 1);
        assert!(printed.contains(&format!("Bot: {FALLBACK_REPLY}\n")));
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let (stats, _) = session("\n   \nhello\n").await;
        assert_eq!(stats, SessionStats { completed: 1, ..SessionStats::default() });
    }

    #[tokio::test]
    async fn test_end_of_input_ends_session() {
        let (stats, printed) = session("").await;
        assert_eq!(stats, SessionStats::default());
        assert!(printed.starts_with("Bot: "));
    }
}
