//! Order status lookup for the `/order <id>` command.
//!
//! A successful lookup also records a synthetic user/assistant exchange in
//! the session history so later free-text turns sent to the LLM know which
//! order the customer is talking about. Failed lookups leave history alone.

use std::collections::HashMap;
use std::sync::Arc;

use shoply_core::{OrderRecord, OrderStatus};

use crate::session::SessionStore;

/// Text used for processing orders that carry no note.
const DEFAULT_PROCESSING_NOTE: &str = "being processed at warehouse";

/// Resolves order ids against the read-only order book.
pub struct OrderLookup {
    orders: Arc<HashMap<String, OrderRecord>>,
    sessions: Arc<SessionStore>,
    command: String,
}

impl OrderLookup {
    pub fn new(
        orders: Arc<HashMap<String, OrderRecord>>,
        sessions: Arc<SessionStore>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            sessions,
            command: command.into(),
        }
    }

    /// Handle an order command and return the reply shown to the customer.
    pub fn handle(&self, command_text: &str, session_id: &str) -> String {
        let Some(order_id) = command_text.split_whitespace().nth(1).map(str::trim) else {
            return format!("specify an order number after the command {}", self.command);
        };

        let Some(order) = self.orders.get(order_id) else {
            tracing::debug!(session_id, order_id, "Order not found");
            return format!("order {order_id} not found.");
        };

        let history = self.sessions.get_or_create(session_id);
        history.add_exchange(
            format!("my order number is {order_id}"),
            format!("order #{order_id} status: {}.", order.note_or_status()),
        );
        tracing::debug!(session_id, order_id, status = order.status.code(), "Order found");

        render_status(order_id, order)
    }
}

/// Customer-facing status line.
///
/// In-transit and delivered orders always render their structured fields;
/// the note only replaces the default text for processing orders.
fn render_status(order_id: &str, order: &OrderRecord) -> String {
    match &order.status {
        OrderStatus::InTransit { eta_days, carrier } => {
            format!("order #{order_id} is in transit. Delivery in {eta_days} days ({carrier}).")
        }
        OrderStatus::Delivered { delivered_at } => {
            format!("order #{order_id} was delivered on {delivered_at}.")
        }
        OrderStatus::Processing => {
            let note = order.note.as_deref().unwrap_or(DEFAULT_PROCESSING_NOTE);
            format!("order #{order_id} status: {note}.")
        }
        OrderStatus::Other(status) => format!("order #{order_id} status: {status}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoply_core::{Message, Role};

    fn record(status: OrderStatus, note: Option<&str>) -> OrderRecord {
        OrderRecord {
            status,
            note: note.map(str::to_string),
        }
    }

    fn make_lookup() -> (OrderLookup, Arc<SessionStore>) {
        let mut orders = HashMap::new();
        orders.insert(
            "A100".to_string(),
            record(
                OrderStatus::InTransit {
                    eta_days: 2,
                    carrier: "DHL".to_string(),
                },
                None,
            ),
        );
        orders.insert(
            "B200".to_string(),
            record(
                OrderStatus::Delivered {
                    delivered_at: "2024-05-01".to_string(),
                },
                Some("left at the door"),
            ),
        );
        orders.insert("C300".to_string(), record(OrderStatus::Processing, None));
        orders.insert(
            "C301".to_string(),
            record(OrderStatus::Processing, Some("waiting for stock")),
        );
        orders.insert(
            "D400".to_string(),
            record(OrderStatus::Other("cancelled".to_string()), None),
        );
        let sessions = Arc::new(SessionStore::new());
        let lookup = OrderLookup::new(Arc::new(orders), Arc::clone(&sessions), "/order");
        (lookup, sessions)
    }

    // ---- Validation ----

    #[test]
    fn test_missing_order_id() {
        let (lookup, sessions) = make_lookup();
        let reply = lookup.handle("/order", "01");
        assert_eq!(reply, "specify an order number after the command /order");
        assert!(sessions.history("01").is_empty());
    }

    #[test]
    fn test_missing_order_id_with_trailing_spaces() {
        let (lookup, sessions) = make_lookup();
        let reply = lookup.handle("/order    ", "01");
        assert!(reply.starts_with("specify an order number"));
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_unknown_order() {
        let (lookup, sessions) = make_lookup();
        sessions.append_user("01", "earlier");
        let before = sessions.history("01").len();

        let reply = lookup.handle("/order ZZZ", "01");
        assert_eq!(reply, "order ZZZ not found.");
        assert_eq!(sessions.history("01").len(), before);
    }

    // ---- Status rendering ----

    #[test]
    fn test_in_transit() {
        let (lookup, _) = make_lookup();
        assert_eq!(
            lookup.handle("/order A100", "01"),
            "order #A100 is in transit. Delivery in 2 days (DHL)."
        );
    }

    #[test]
    fn test_delivered_ignores_note_in_reply() {
        let (lookup, sessions) = make_lookup();
        assert_eq!(
            lookup.handle("/order B200", "01"),
            "order #B200 was delivered on 2024-05-01."
        );
        // The synthetic history turn does carry the note.
        let history = sessions.history("01");
        assert_eq!(history[1].content, "order #B200 status: left at the door.");
    }

    #[test]
    fn test_processing_default_note() {
        let (lookup, _) = make_lookup();
        assert_eq!(
            lookup.handle("/order C300", "01"),
            "order #C300 status: being processed at warehouse."
        );
    }

    #[test]
    fn test_processing_custom_note() {
        let (lookup, _) = make_lookup();
        assert_eq!(
            lookup.handle("/order C301", "01"),
            "order #C301 status: waiting for stock."
        );
    }

    #[test]
    fn test_other_status_fallback() {
        let (lookup, _) = make_lookup();
        assert_eq!(
            lookup.handle("/order D400", "01"),
            "order #D400 status: cancelled."
        );
    }

    // ---- Synthetic history ----

    #[test]
    fn test_found_order_appends_exactly_two_messages() {
        let (lookup, sessions) = make_lookup();
        for (i, id) in ["A100", "B200", "C300", "C301", "D400"].iter().enumerate() {
            lookup.handle(&format!("/order {id}"), "01");
            assert_eq!(sessions.history("01").len(), (i + 1) * 2);
        }
        assert_eq!(sessions.count_role("01", Role::User), 5);
        assert_eq!(sessions.count_role("01", Role::Assistant), 5);
    }

    #[test]
    fn test_synthetic_turn_uses_status_code_without_note() {
        let (lookup, sessions) = make_lookup();
        lookup.handle("/order A100", "01");
        assert_eq!(
            sessions.history("01"),
            vec![
                Message::user("my order number is A100"),
                Message::assistant("order #A100 status: in_transit."),
            ]
        );
    }

    #[test]
    fn test_extra_tokens_ignored() {
        let (lookup, sessions) = make_lookup();
        let reply = lookup.handle("/order A100 please hurry", "01");
        assert!(reply.starts_with("order #A100 is in transit"));
        assert_eq!(sessions.history("01").len(), 2);
    }

    #[test]
    fn test_history_goes_to_requesting_session_only() {
        let (lookup, sessions) = make_lookup();
        lookup.handle("/order A100", "alice");
        assert_eq!(sessions.history("alice").len(), 2);
        assert!(sessions.history("bob").is_empty());
    }
}
