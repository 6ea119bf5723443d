//! Conversational core of the Shoply support bot.
//!
//! Routes customer input to the order lookup or the LLM collaborator, keeps
//! per-session history, writes the JSONL interaction log and drives the
//! console session loop.

pub mod driver;
pub mod error;
pub mod llm;
pub mod logger;
pub mod orchestrator;
pub mod order;
pub mod prompt;
pub mod session;

pub use driver::{LoopExit, SessionLoop};
pub use error::ChatError;
pub use llm::{ChatCompletion, Completion, CompletionRequest, MockCompletion, OpenAiClient};
pub use logger::InteractionLogger;
pub use orchestrator::{Route, SupportOrchestrator, TurnOutcome, TurnReply};
pub use order::OrderLookup;
pub use prompt::{build_system_prompt, PromptPart, PromptTemplate, WireMessage};
pub use session::{MessageHistory, SessionStore};
