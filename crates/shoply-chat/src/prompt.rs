//! System prompt construction and the chat prompt template.

use serde::Serialize;
use shoply_core::config::ChatConfig;
use shoply_core::Message;

/// Build the FAQ-augmented system prompt.
pub fn build_system_prompt(config: &ChatConfig, faq_text: &str) -> String {
    format!(
        "You are a support assistant for the {store} online store.\n\
         Answer briefly and politely, only in {language}.\n\
         To ask about an order, the customer types: {command} <number>\n\n\
         You may use information the customer shares in this conversation \
         (for example, their name or order number).\n\
         Knowledge base:\n{faq_text}",
        store = config.store_name,
        language = config.reply_language,
        command = config.order_command,
    )
}

/// One slot of a chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    /// Fixed system instructions.
    System(String),
    /// Replaced by the session history at render time.
    History,
    /// Replaced by the new user message at render time.
    UserInput,
}

/// A message in the shape chat-completion APIs expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

/// Ordered prompt layout with a history placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    parts: Vec<PromptPart>,
}

impl PromptTemplate {
    pub fn new(parts: Vec<PromptPart>) -> Self {
        Self { parts }
    }

    /// System prompt, then history, then the new question.
    pub fn chat(system_prompt: impl Into<String>) -> Self {
        Self::new(vec![
            PromptPart::System(system_prompt.into()),
            PromptPart::History,
            PromptPart::UserInput,
        ])
    }

    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }

    /// Substitute the placeholders and return the wire messages in order.
    pub fn render(&self, history: &[Message], user_text: &str) -> Vec<WireMessage> {
        let mut out = Vec::with_capacity(history.len() + self.parts.len());
        for part in &self.parts {
            match part {
                PromptPart::System(text) => out.push(WireMessage {
                    role: "system",
                    content: text.clone(),
                }),
                PromptPart::History => out.extend(history.iter().map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: m.content.clone(),
                })),
                PromptPart::UserInput => out.push(WireMessage {
                    role: "user",
                    content: user_text.to_string(),
                }),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_includes_faq_and_settings() {
        let config = ChatConfig::default();
        let prompt = build_system_prompt(&config, "Q: Returns?\nA: 30 days.");
        assert!(prompt.contains("Shoply"));
        assert!(prompt.contains("only in English"));
        assert!(prompt.contains("/order <number>"));
        assert!(prompt.ends_with("Knowledge base:\nQ: Returns?\nA: 30 days."));
    }

    #[test]
    fn test_render_empty_history() {
        let template = PromptTemplate::chat("SYS");
        let messages = template.render(&[], "hello");
        assert_eq!(
            messages,
            vec![
                WireMessage {
                    role: "system",
                    content: "SYS".into()
                },
                WireMessage {
                    role: "user",
                    content: "hello".into()
                },
            ]
        );
    }

    #[test]
    fn test_render_substitutes_history_in_order() {
        let template = PromptTemplate::chat("SYS");
        let history = vec![
            Message::user("my order number is A100"),
            Message::assistant("order #A100 status: in_transit."),
        ];
        let messages = template.render(&history, "when will it arrive?");
        let roles: Vec<&str> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[1].content, "my order number is A100");
        assert_eq!(messages[3].content, "when will it arrive?");
    }

    #[test]
    fn test_custom_layout() {
        let template = PromptTemplate::new(vec![PromptPart::History, PromptPart::UserInput]);
        let messages = template.render(&[Message::assistant("hi")], "q");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "assistant");
    }
}
