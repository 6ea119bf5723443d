//! Console session loop.
//!
//! Reads one line at a time, hands it to the [`SupportOrchestrator`] and
//! prints the reply. Input and output are generic so the loop runs the same
//! against stdin/stdout and in-memory buffers.

use std::future::Future;
use std::sync::Arc;

use shoply_core::config::ChatConfig;
use shoply_core::Role;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::orchestrator::{SupportOrchestrator, TurnOutcome};

const SHUTDOWN_LINE: &str = "Bot: shutting down.";
const GOODBYE_LINE: &str = "Bot: goodbye!";
const UNREADABLE_LINE: &str = "Bot: sorry, I could not read that input. Please try again.";
const INTERNAL_ERROR_LINE: &str = "Bot: sorry, something went wrong on our side. Please try again.";

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The customer typed an exit keyword.
    ExitKeyword,
    /// Input reached end of file.
    EndOfInput,
    /// The shutdown future resolved (Ctrl-C).
    Interrupted,
}

/// Drives a single console session.
pub struct SessionLoop {
    orchestrator: Arc<SupportOrchestrator>,
    session_id: String,
    greeting: String,
}

impl SessionLoop {
    pub fn new(
        orchestrator: Arc<SupportOrchestrator>,
        session_id: impl Into<String>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            orchestrator,
            session_id: session_id.into(),
            greeting: greeting(config),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Run until an exit keyword, end of input, or `shutdown` resolves.
    ///
    /// `shutdown` is raced against both the read and any in-flight turn, so
    /// a pending LLM call is dropped when it fires. Only I/O errors on the
    /// console itself are returned; failed turns and lines that are not
    /// UTF-8 are reported to the customer and the loop continues.
    pub async fn run<R, W, S>(
        &self,
        mut input: R,
        output: &mut W,
        shutdown: S,
    ) -> std::io::Result<LoopExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = Vec::new();

        output.write_all(self.greeting.as_bytes()).await?;
        tracing::info!(session_id = %self.session_id, "Session started");

        let exit = loop {
            output
                .write_all(format!("You({}): ", self.session_id).as_bytes())
                .await?;
            output.flush().await?;

            buf.clear();
            let read = tokio::select! {
                biased;
                _ = &mut shutdown => break LoopExit::Interrupted,
                read = input.read_until(b'\n', &mut buf) => read?,
            };
            if read == 0 {
                break LoopExit::EndOfInput;
            }

            let line = match decode_line(&buf) {
                Some(line) => line,
                None => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        bytes = buf.len(),
                        "Input line is not valid UTF-8"
                    );
                    write_line(output, UNREADABLE_LINE).await?;
                    continue;
                }
            };

            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => break LoopExit::Interrupted,
                outcome = self.orchestrator.handle_turn(&self.session_id, line) => outcome,
            };

            match outcome {
                Ok(TurnOutcome::Ignored) => {}
                Ok(TurnOutcome::Exit) => break LoopExit::ExitKeyword,
                Ok(TurnOutcome::Reply(reply)) => {
                    write_line(output, &format!("Bot: {}", reply.text)).await?;
                }
                Err(e) if e.is_collaborator_failure() => {
                    tracing::warn!(session_id = %self.session_id, error = %e, "Turn failed");
                    write_line(
                        output,
                        &format!("Bot: sorry, I could not answer that ({e}). Please try again."),
                    )
                    .await?;
                }
                Err(e) => {
                    tracing::error!(session_id = %self.session_id, error = %e, "Turn failed");
                    write_line(output, INTERNAL_ERROR_LINE).await?;
                }
            }
        };

        match exit {
            LoopExit::ExitKeyword => write_line(output, GOODBYE_LINE).await?,
            LoopExit::EndOfInput | LoopExit::Interrupted => {
                write_line(output, &format!("\n{SHUTDOWN_LINE}")).await?
            }
        }
        output.flush().await?;

        tracing::info!(
            session_id = %self.session_id,
            reason = ?exit,
            user_turns = self
                .orchestrator
                .sessions()
                .count_role(&self.session_id, Role::User),
            "Session ended"
        );
        Ok(exit)
    }
}

/// Strip the line ending; `None` if the bytes are not UTF-8.
fn decode_line(buf: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(buf).ok()?;
    Some(text.trim_end_matches(['\n', '\r']))
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await
}

fn greeting(config: &ChatConfig) -> String {
    let keywords = config
        .exit_keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| format!("'{}'", k.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{store} support bot started!\n \
         - To quit, type one of: {keywords}.\n \
         - To check an order, type: {command} <number>\n\n",
        store = config.store_name,
        command = config.order_command,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::llm::{ChatCompletion, MockCompletion};
    use crate::session::SessionStore;
    use shoply_core::{ReferenceData, TokenUsage};

    fn make_loop() -> (SessionLoop, Arc<MockCompletion>) {
        let config = ChatConfig::default();
        let llm = Arc::new(MockCompletion::new());
        let orchestrator = SupportOrchestrator::new(
            &config,
            ReferenceData::default(),
            Arc::new(SessionStore::new()),
            Arc::clone(&llm) as Arc<dyn ChatCompletion>,
            None,
        );
        (SessionLoop::new(Arc::new(orchestrator), "01", &config), llm)
    }

    async fn run_with(session: &SessionLoop, input: &str) -> (LoopExit, String) {
        let mut out = Vec::new();
        let exit = session
            .run(input.as_bytes(), &mut out, std::future::pending::<()>())
            .await
            .unwrap();
        (exit, String::from_utf8(out).unwrap())
    }

    // ---- Greeting ----

    #[test]
    fn test_greeting_lists_hints() {
        let (session, _) = make_loop();
        let greeting = session.greeting();
        assert!(greeting.starts_with("Shoply support bot started!"));
        assert!(greeting.contains("'stop', 'exit', 'стоп', 'выход'"));
        assert!(greeting.contains("/order <number>"));
    }

    // ---- Loop ----

    #[tokio::test]
    async fn test_exit_keyword_prints_goodbye() {
        let (session, llm) = make_loop();
        let (exit, out) = run_with(&session, "hello\nexit\nnever read\n").await;
        assert_eq!(exit, LoopExit::ExitKeyword);
        assert!(out.contains("You(01): Bot: echo: hello\n"));
        assert!(out.ends_with("Bot: goodbye!\n"));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_end_of_input_prints_shutdown() {
        let (session, _) = make_loop();
        let (exit, out) = run_with(&session, "").await;
        assert_eq!(exit, LoopExit::EndOfInput);
        assert!(out.ends_with("You(01): \nBot: shutting down.\n"));
    }

    #[tokio::test]
    async fn test_blank_lines_print_nothing() {
        let (session, llm) = make_loop();
        let (_, out) = run_with(&session, "\n   \n").await;
        assert!(!out.contains("Bot: echo"));
        assert_eq!(out.matches("You(01): ").count(), 3);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_apologizes_and_continues() {
        let (session, llm) = make_loop();
        llm.push_error(ChatError::LlmTimeout(60));
        llm.push_reply("second try worked", TokenUsage::ZERO);

        let (exit, out) = run_with(&session, "first\nsecond\nstop\n").await;
        assert_eq!(exit, LoopExit::ExitKeyword);
        assert!(out.contains(
            "Bot: sorry, I could not answer that (LLM request timed out after 60 seconds)"
        ));
        assert!(out.contains("Bot: second try worked\n"));
    }

    #[tokio::test]
    async fn test_order_reply_printed() {
        let (session, _) = make_loop();
        let (_, out) = run_with(&session, "/order\n").await;
        assert!(out.contains("Bot: specify an order number after the command /order\n"));
    }

    #[tokio::test]
    async fn test_non_collaborator_error_gets_generic_reply() {
        let (session, llm) = make_loop();
        llm.push_error(ChatError::Config("broken".to_string()));

        let (exit, out) = run_with(&session, "hello\nstop\n").await;
        assert_eq!(exit, LoopExit::ExitKeyword);
        assert!(out.contains(INTERNAL_ERROR_LINE));
        assert!(!out.contains("broken"));
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_skipped() {
        let (session, llm) = make_loop();
        // "Привет" in cp1251.
        let input: &[u8] = b"\xcf\xf0\xe8\xe2\xe5\xf2\nhello\r\nstop\n";
        let mut out = Vec::new();
        let exit = session
            .run(input, &mut out, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::ExitKeyword);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(&format!("You(01): {UNREADABLE_LINE}\n")));
        assert!(out.contains("Bot: echo: hello\n"));
        assert!(out.ends_with("Bot: goodbye!\n"));
        assert_eq!(llm.requests()[0].user_text, "hello");
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"hi\r\n"), Some("hi"));
        assert_eq!(decode_line(b"last"), Some("last"));
        assert_eq!(decode_line("привет\n".as_bytes()), Some("привет"));
        assert_eq!(decode_line(b"\xff\n"), None);
    }

    // ---- Shutdown ----

    #[tokio::test]
    async fn test_shutdown_before_read() {
        let (session, llm) = make_loop();
        let mut out = Vec::new();
        let exit = session
            .run("hello\n".as_bytes(), &mut out, async {})
            .await
            .unwrap();
        assert_eq!(exit, LoopExit::Interrupted);
        assert_eq!(llm.call_count(), 0);
        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with("Bot: shutting down.\n"));
    }
}
