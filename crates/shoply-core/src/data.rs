//! Reference data loaded once at startup: the FAQ and the order book.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{Result, ShoplyError};
use crate::types::{FaqEntry, OrderRecord};

/// File name of the FAQ inside the data directory.
pub const FAQ_FILE: &str = "faq.json";
/// File name of the order book inside the data directory.
pub const ORDERS_FILE: &str = "orders.json";

/// Immutable FAQ entries and order records shared by the chat components.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub faq: Vec<FaqEntry>,
    pub orders: HashMap<String, OrderRecord>,
}

impl ReferenceData {
    pub fn new(faq: Vec<FaqEntry>, orders: HashMap<String, OrderRecord>) -> Self {
        Self { faq, orders }
    }

    /// Load `faq.json` and `orders.json` from `data_dir`.
    ///
    /// Any missing or malformed file is an error; the bot must not start
    /// without its reference data.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let faq: Vec<FaqEntry> = read_json(&data_dir.join(FAQ_FILE))?;
        let orders: HashMap<String, OrderRecord> = read_json(&data_dir.join(ORDERS_FILE))?;
        info!(
            dir = %data_dir.display(),
            faq_entries = faq.len(),
            orders = orders.len(),
            "Reference data loaded"
        );
        Ok(Self { faq, orders })
    }

    /// FAQ rendered for inclusion in the system prompt.
    pub fn faq_text(&self) -> String {
        self.faq
            .iter()
            .map(|e| format!("Q: {}\nA: {}", e.question, e.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| invalid(path, e.to_string()))
}

fn invalid(path: &Path, reason: String) -> ShoplyError {
    ShoplyError::InvalidData {
        file: PathBuf::from(path),
        reason,
    }
}
