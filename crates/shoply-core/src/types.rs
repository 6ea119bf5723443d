use std::fmt;

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::ShoplyError;

// =============================================================================
// Conversation
// =============================================================================

/// Author of a message in a session history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The customer typing at the console.
    User,
    /// The support assistant (LLM replies and synthetic order turns).
    Assistant,
}

impl Role {
    /// Role name as used by chat-completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged entry of a session history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// Reference data
// =============================================================================

/// A question/answer pair from the store FAQ.
///
/// The on-disk format uses the short keys `q` and `a`; the long names are
/// accepted as aliases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(rename = "q", alias = "question")]
    pub question: String,
    #[serde(rename = "a", alias = "answer")]
    pub answer: String,
}

/// Fulfilment state of an order, with the fields each state carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    /// Being picked or packed at the warehouse.
    Processing,
    /// Handed to a carrier.
    InTransit { eta_days: u32, carrier: String },
    /// Delivered to the customer.
    Delivered { delivered_at: String },
    /// Any status string the bot has no dedicated wording for.
    Other(String),
}

impl OrderStatus {
    /// Raw status code as stored in the order file.
    pub fn code(&self) -> &str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::InTransit { .. } => "in_transit",
            OrderStatus::Delivered { .. } => "delivered",
            OrderStatus::Other(code) => code,
        }
    }
}

/// A read-only order record loaded from the order file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOrderRecord", into = "RawOrderRecord")]
pub struct OrderRecord {
    pub status: OrderStatus,
    /// Free-text note; overrides the status code in synthetic history turns.
    pub note: Option<String>,
}

impl OrderRecord {
    /// The note if present, otherwise the raw status code.
    pub fn note_or_status(&self) -> &str {
        self.note.as_deref().unwrap_or_else(|| self.status.code())
    }
}

/// Flat on-disk shape of an order record.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct RawOrderRecord {
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eta_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delivered_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl TryFrom<RawOrderRecord> for OrderRecord {
    type Error = ShoplyError;

    fn try_from(raw: RawOrderRecord) -> Result<Self, Self::Error> {
        let status = match raw.status.as_str() {
            "processing" => OrderStatus::Processing,
            "in_transit" => match (raw.eta_days, raw.carrier) {
                (Some(eta_days), Some(carrier)) => OrderStatus::InTransit { eta_days, carrier },
                _ => {
                    return Err(ShoplyError::Serialization(
                        "in_transit order requires eta_days and carrier".to_string(),
                    ))
                }
            },
            "delivered" => match raw.delivered_at {
                Some(delivered_at) => OrderStatus::Delivered { delivered_at },
                None => {
                    return Err(ShoplyError::Serialization(
                        "delivered order requires delivered_at".to_string(),
                    ))
                }
            },
            _ => OrderStatus::Other(raw.status),
        };
        Ok(Self {
            status,
            note: raw.note,
        })
    }
}

impl From<OrderRecord> for RawOrderRecord {
    fn from(record: OrderRecord) -> Self {
        let mut raw = RawOrderRecord {
            status: record.status.code().to_string(),
            note: record.note,
            ..RawOrderRecord::default()
        };
        match record.status {
            OrderStatus::InTransit { eta_days, carrier } => {
                raw.eta_days = Some(eta_days);
                raw.carrier = Some(carrier);
            }
            OrderStatus::Delivered { delivered_at } => raw.delivered_at = Some(delivered_at),
            OrderStatus::Processing | OrderStatus::Other(_) => {}
        }
        raw
    }
}

// =============================================================================
// Interaction log
// =============================================================================

/// Token accounting reported by the LLM collaborator for one call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Usage for turns that never reached the LLM.
    pub const ZERO: TokenUsage = TokenUsage {
        prompt_tokens: 0,
        completion_tokens: 0,
        total_tokens: 0,
    };

    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// One line of a session's JSONL interaction log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO-8601 local time of the turn.
    pub timestamp: String,
    pub user_input: String,
    pub bot_response: String,
    pub token_usage: TokenUsage,
}

impl LogEntry {
    /// Build an entry stamped with the current local time.
    pub fn now(user_input: &str, bot_response: &str, usage: TokenUsage) -> Self {
        Self::at(Local::now(), user_input, bot_response, usage)
    }

    pub fn at(
        time: DateTime<Local>,
        user_input: &str,
        bot_response: &str,
        usage: TokenUsage,
    ) -> Self {
        Self {
            timestamp: time.to_rfc3339_opts(SecondsFormat::Micros, false),
            user_input: user_input.to_string(),
            bot_response: bot_response.to_string(),
            token_usage: usage,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
