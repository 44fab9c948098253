//! quicksearch-engine: Headless conversation engine for the shopping assistant
//!
//! This crate provides the client-side mock "AI" behind the quick search
//! widget, including:
//! - The message log model and canned replies
//! - Keyword classification and the guided intake state machine
//! - Timed loader resolution with cancellation
//! - Widget lifecycle and view state
//! - Configuration and product catalogs

pub mod catalog;
pub mod category;
pub mod collected;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod message;
pub mod reply;
pub mod scenario;
pub mod widget;

// Re-export commonly used types
pub use catalog::{catalog_for, CatalogError, JsonCatalog, MockCatalog, Product, ProductSource};
pub use category::{Category, UnknownCategory};
pub use collected::{Answer, Collected};
pub use config::{ConfigError, EngineConfig, Flow};
pub use conversation::{Conversation, EngineError};
pub use engine::{ConversationEngine, Resolution};
pub use message::{Action, Message, MessageBody, MessageId, Role, TextStyle};
pub use scenario::{classify, Scenario};
pub use widget::{View, Widget, WidgetError};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
