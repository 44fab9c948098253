//! Message log types.
//!
//! The log is append-only apart from loaders, which are replaced in place by
//! the reply they stand in for. Insertion order is display order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::Product;

/// Unique message identifier.
///
/// Reply ids are derived from the loader they replace, so a reply can be
/// traced back to the query that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Derive a reply id, e.g. `"<loader>-one"`.
    pub fn derive(&self, suffix: &str) -> Self {
        Self(format!("{}-{suffix}", self.0))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Role of the message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Engine-internal placeholder.
    System,
    /// Shopper input.
    User,
    /// Assistant reply.
    Assistant,
}

/// Presentation hint for assistant text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextStyle {
    /// "No results" notice.
    NoResults,
    /// Customer support contact details.
    Support,
}

/// A quick-reply chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Chip label.
    pub label: String,
    /// Value handed to the collaborator when the chip is picked.
    pub value: String,
}

impl Action {
    /// Create a chip.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Payload of a message, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MessageBody {
    /// Plain text bubble.
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<TextStyle>,
    },
    /// Placeholder while the assistant is "thinking".
    Loading,
    /// Product carousel.
    Products {
        products: Vec<Product>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        header: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        footer: Option<String>,
        /// How many products are shown; `None` shows all of them.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        visible_count: Option<usize>,
        /// Whether a "show more" control is offered.
        #[serde(default)]
        show_more: bool,
    },
    /// Quick-reply chips.
    Actions { actions: Vec<Action> },
    /// Feedback screen.
    Feedback,
    /// Connection-lost screen.
    ConnectionLost,
    /// Error bubble.
    Error { text: String },
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique id.
    pub id: MessageId,
    /// Author role.
    pub role: Role,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
    /// Kind-specific payload.
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    fn build(id: MessageId, role: Role, body: MessageBody) -> Self {
        Self {
            id,
            role,
            created_at: Utc::now(),
            body,
        }
    }

    /// Create a user text message with a fresh id.
    pub fn user(text: impl Into<String>) -> Self {
        Self::build(
            MessageId::new(),
            Role::User,
            MessageBody::Text {
                text: text.into(),
                style: None,
            },
        )
    }

    /// Create a loader with a fresh id.
    pub fn loading() -> Self {
        Self::build(MessageId::new(), Role::System, MessageBody::Loading)
    }

    /// Create an assistant text message.
    pub fn assistant(id: MessageId, text: impl Into<String>) -> Self {
        Self::build(
            id,
            Role::Assistant,
            MessageBody::Text {
                text: text.into(),
                style: None,
            },
        )
    }

    /// Create a styled assistant text message.
    pub fn styled(id: MessageId, text: impl Into<String>, style: TextStyle) -> Self {
        Self::build(
            id,
            Role::Assistant,
            MessageBody::Text {
                text: text.into(),
                style: Some(style),
            },
        )
    }

    /// Create a product carousel showing every product.
    pub fn products(id: MessageId, products: Vec<Product>) -> ProductsBuilder {
        ProductsBuilder {
            id,
            products,
            header: None,
            footer: None,
            visible_count: None,
            show_more: false,
        }
    }

    /// Create a chip row.
    pub fn actions(id: MessageId, actions: Vec<Action>) -> Self {
        Self::build(id, Role::Assistant, MessageBody::Actions { actions })
    }

    /// Create a feedback screen message.
    pub fn feedback(id: MessageId) -> Self {
        Self::build(id, Role::Assistant, MessageBody::Feedback)
    }

    /// Create a connection-lost message.
    pub fn connection_lost(id: MessageId) -> Self {
        Self::build(id, Role::Assistant, MessageBody::ConnectionLost)
    }

    /// Create an error bubble.
    pub fn error(id: MessageId, text: impl Into<String>) -> Self {
        Self::build(id, Role::Assistant, MessageBody::Error { text: text.into() })
    }

    /// Whether this message is a loader.
    pub fn is_loading(&self) -> bool {
        matches!(self.body, MessageBody::Loading)
    }

    /// Text content, if this is a text message.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text { text, .. } | MessageBody::Error { text } => Some(text),
            _ => None,
        }
    }

    /// Short kind name, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self.body {
            MessageBody::Text { .. } => "text",
            MessageBody::Loading => "loading",
            MessageBody::Products { .. } => "products",
            MessageBody::Actions { .. } => "actions",
            MessageBody::Feedback => "feedback",
            MessageBody::ConnectionLost => "connection-lost",
            MessageBody::Error { .. } => "error",
        }
    }

    /// Products currently visible, if this is a product carousel.
    pub fn visible_products(&self) -> Option<&[Product]> {
        match &self.body {
            MessageBody::Products {
                products,
                visible_count,
                ..
            } => {
                let shown = visible_count.map_or(products.len(), |n| n.min(products.len()));
                Some(&products[..shown])
            }
            _ => None,
        }
    }
}

/// Builder for product carousel messages.
#[derive(Debug, Clone)]
pub struct ProductsBuilder {
    id: MessageId,
    products: Vec<Product>,
    header: Option<String>,
    footer: Option<String>,
    visible_count: Option<usize>,
    show_more: bool,
}

impl ProductsBuilder {
    /// Set the header line.
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Set the footer line.
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Show at most `count` products, without pagination.
    pub fn capped(mut self, count: usize) -> Self {
        self.visible_count = Some(count.min(self.products.len()));
        self.show_more = false;
        self
    }

    /// Show the first page and offer "show more" if anything is left over.
    pub fn paginated(mut self, page_size: usize) -> Self {
        self.visible_count = Some(page_size.min(self.products.len()));
        self.show_more = self.products.len() > page_size;
        self
    }

    /// Finish the message.
    pub fn build(self) -> Message {
        Message::build(
            self.id,
            Role::Assistant,
            MessageBody::Products {
                products: self.products,
                header: self.header,
                footer: self.footer,
                visible_count: self.visible_count,
                show_more: self.show_more,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_products(n: usize) -> Vec<Product> {
        (0..n)
            .map(|i| Product::new(format!("p{i}"), format!("Product {i}"), "/img.png"))
            .collect()
    }

    #[test]
    fn test_message_creation() {
        let user = Message::user("Hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.text(), Some("Hello"));
        assert_eq!(user.kind(), "text");

        let loader = Message::loading();
        assert_eq!(loader.role, Role::System);
        assert!(loader.is_loading());
        assert_ne!(user.id, loader.id);
    }

    #[test]
    fn test_derived_ids() {
        let loader = MessageId::from("abc");
        assert_eq!(loader.derive("one").as_str(), "abc-one");
        assert_eq!(loader.derive("support").to_string(), "abc-support");
    }

    #[test]
    fn test_serialized_kind_tags() {
        let id = MessageId::from("l1");
        let json = serde_json::to_value(Message::connection_lost(id.derive("connection"))).unwrap();
        assert_eq!(json["kind"], "connection-lost");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["id"], "l1-connection");

        let json = serde_json::to_value(Message::loading()).unwrap();
        assert_eq!(json["kind"], "loading");
        assert_eq!(json["role"], "system");

        let json =
            serde_json::to_value(Message::styled(id, "none", TextStyle::NoResults)).unwrap();
        assert_eq!(json["style"], "no-results");
    }

    #[test]
    fn test_message_json_roundtrip_keeps_body() {
        let msg = Message::products(MessageId::from("l1-more"), sample_products(4))
            .header("Here you go")
            .paginated(3)
            .build();
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_visible_products() {
        let capped = Message::products(MessageId::new(), sample_products(7))
            .capped(5)
            .build();
        assert_eq!(capped.visible_products().unwrap().len(), 5);

        let paged = Message::products(MessageId::new(), sample_products(2))
            .paginated(3)
            .build();
        assert_eq!(paged.visible_products().unwrap().len(), 2);

        let all = Message::products(MessageId::new(), sample_products(4)).build();
        assert_eq!(all.visible_products().unwrap().len(), 4);

        assert!(Message::user("hi").visible_products().is_none());
    }
}
