//! Conversation orchestrator: routes each turn to the order lookup or the
//! LLM collaborator, keeps session history current, and records the turn in
//! the interaction log.

use std::sync::Arc;

use shoply_core::config::ChatConfig;
use shoply_core::{ReferenceData, TokenUsage};

use crate::error::ChatError;
use crate::llm::{ChatCompletion, CompletionRequest};
use crate::logger::InteractionLogger;
use crate::order::OrderLookup;
use crate::prompt::build_system_prompt;
use crate::session::SessionStore;

/// Where a turn is sent. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Blank input; nothing happens and nothing is logged.
    Ignored,
    /// An exit keyword; the session loop stops.
    Exit,
    /// The order command; answered from reference data.
    OrderLookup,
    /// Anything else; answered by the LLM collaborator.
    Llm,
}

/// Result of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Ignored,
    Exit,
    Reply(TurnReply),
}

/// Reply produced by a completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub text: String,
    pub route: Route,
    pub usage: TokenUsage,
}

/// Central coordinator for support conversations.
pub struct SupportOrchestrator {
    system_prompt: String,
    sessions: Arc<SessionStore>,
    orders: OrderLookup,
    llm: Arc<dyn ChatCompletion>,
    logger: Option<InteractionLogger>,
    order_command: String,
    exit_keywords: Vec<String>,
}

impl SupportOrchestrator {
    /// Create an orchestrator. Pass `logger: None` to disable interaction logging.
    pub fn new(
        config: &ChatConfig,
        data: ReferenceData,
        sessions: Arc<SessionStore>,
        llm: Arc<dyn ChatCompletion>,
        logger: Option<InteractionLogger>,
    ) -> Self {
        let system_prompt = build_system_prompt(config, &data.faq_text());
        let orders = OrderLookup::new(
            Arc::new(data.orders),
            Arc::clone(&sessions),
            config.order_command.clone(),
        );
        let exit_keywords = config
            .exit_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            system_prompt,
            sessions,
            orders,
            llm,
            logger,
            order_command: config.order_command.clone(),
            exit_keywords,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn logging_enabled(&self) -> bool {
        self.logger.is_some()
    }

    pub fn order_command(&self) -> &str {
        &self.order_command
    }

    /// Decide where an input goes: blank, then exit keyword, then order
    /// command, then the LLM.
    pub fn route(&self, input: &str) -> Route {
        let input = input.trim();
        if input.is_empty() {
            Route::Ignored
        } else if self.is_exit_keyword(input) {
            Route::Exit
        } else if input.starts_with(&self.order_command) {
            Route::OrderLookup
        } else {
            Route::Llm
        }
    }

    /// Process one line of user input for `session_id`.
    ///
    /// A collaborator failure is returned as an error and leaves the session
    /// history untouched; nothing is logged for that turn.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        input: &str,
    ) -> Result<TurnOutcome, ChatError> {
        let input = input.trim();
        let route = self.route(input);

        let (text, usage) = match route {
            Route::Ignored => return Ok(TurnOutcome::Ignored),
            Route::Exit => {
                tracing::info!(session_id, "Exit keyword received");
                return Ok(TurnOutcome::Exit);
            }
            Route::OrderLookup => (self.orders.handle(input, session_id), TokenUsage::ZERO),
            Route::Llm => self.ask_llm(session_id, input).await?,
        };

        self.log_turn(session_id, input, &text, usage);
        Ok(TurnOutcome::Reply(TurnReply { text, route, usage }))
    }

    async fn ask_llm(
        &self,
        session_id: &str,
        input: &str,
    ) -> Result<(String, TokenUsage), ChatError> {
        let history = self.sessions.get_or_create(session_id);
        let request = CompletionRequest {
            system_prompt: self.system_prompt.clone(),
            history: history.messages(),
            user_text: input.to_string(),
        };

        let completion = match self.llm.complete(&request).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "LLM call failed");
                return Err(e);
            }
        };

        history.add_exchange(input, completion.text.as_str());
        tracing::debug!(
            session_id,
            history_len = history.len(),
            total_tokens = completion.usage.total_tokens,
            "LLM turn completed"
        );
        Ok((completion.text, completion.usage))
    }

    fn log_turn(&self, session_id: &str, input: &str, reply: &str, usage: TokenUsage) {
        let Some(logger) = &self.logger else {
            return;
        };
        if let Err(e) = logger.record(session_id, input, reply, usage) {
            tracing::warn!(
                session_id,
                dir = %logger.dir().display(),
                error = %e,
                "Failed to write interaction log"
            );
        }
    }

    fn is_exit_keyword(&self, input: &str) -> bool {
        let lowered = input.to_lowercase();
        self.exit_keywords.iter().any(|k| *k == lowered)
    }
}

// =============================================================================
// Tests
// =============================================================================
