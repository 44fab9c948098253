//! Session state of a single conversation.
//!
//! [`Conversation`] is the synchronous core: it owns the log, the collected
//! answers, the pending-query registry and the processed-loader set. Timing
//! lives in [`crate::engine`]; everything here is a plain state transition.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::catalog::{Product, ProductSource};
use crate::collected::Collected;
use crate::config::{EngineConfig, Flow};
use crate::message::{Message, MessageBody, MessageId};
use crate::reply;

/// Conversation state for one widget session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    log: Vec<Message>,
    collected: Collected,
    /// Loader id -> query text that produced it.
    pending: HashMap<MessageId, String>,
    /// Loaders already claimed for resolution.
    processed: HashSet<MessageId>,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// The message log, in display order.
    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    /// Answers collected so far.
    pub fn collected(&self) -> &Collected {
        &self.collected
    }

    /// Whether the last message is an unresolved loader.
    pub fn has_outstanding_loader(&self) -> bool {
        self.log.last().is_some_and(Message::is_loading)
    }

    /// Query text registered for a loader.
    pub fn pending_query(&self, loader: &MessageId) -> Option<&str> {
        self.pending.get(loader).map(String::as_str)
    }

    /// Whether a loader has been claimed for resolution.
    pub fn is_processed(&self, loader: &MessageId) -> bool {
        self.processed.contains(loader)
    }

    /// Append a user query and a loader for it.
    ///
    /// The query is trimmed. Empty queries and queries sent while a loader
    /// is outstanding leave the log untouched.
    pub fn submit(&mut self, text: &str) -> Result<MessageId, EngineError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        if self.has_outstanding_loader() {
            return Err(EngineError::ResponsePending);
        }

        let user = Message::user(query);
        let loader = Message::loading();
        let loader_id = loader.id.clone();
        self.log.extend([user, loader]);
        self.pending.insert(loader_id.clone(), query.to_string());

        debug!(loader = %loader_id, query, "Registered query");
        Ok(loader_id)
    }

    /// Append a user message with no loader, e.g. a category sentence.
    pub fn push_user_text(&mut self, text: &str) -> Result<MessageId, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        let message = Message::user(text);
        let id = message.id.clone();
        self.log.push(message);
        Ok(id)
    }

    /// Most recent loader in `log`, scanning from the end.
    pub fn latest_loader(log: &[Message]) -> Option<&MessageId> {
        log.iter().rev().find(|m| m.is_loading()).map(|m| &m.id)
    }

    /// Mark a loader as claimed. Returns `false` if it already was.
    pub fn claim(&mut self, loader: &MessageId) -> bool {
        let fresh = self.processed.insert(loader.clone());
        if !fresh {
            debug!(loader = %loader, "Loader already claimed");
        }
        fresh
    }

    /// Replace a loader with its reply.
    ///
    /// Reads the collected answers as they are now, not as they were when
    /// the loader was claimed. Returns the ids of the inserted messages; an
    /// empty list if the loader is gone or the flow had nothing to say.
    pub fn resolve(
        &mut self,
        loader: &MessageId,
        config: &EngineConfig,
        catalog: &dyn ProductSource,
    ) -> Vec<MessageId> {
        let query = self.pending.remove(loader).unwrap_or_default();

        let Some(slot) = self.log.iter().position(|m| &m.id == loader) else {
            warn!(loader = %loader, "Loader no longer in log, dropping reply");
            return Vec::new();
        };

        let reply = match config.flow {
            Flow::Scripted => reply::scripted(loader, &query, catalog.products(), config),
            Flow::GuidedIntake => {
                let (reply, next) =
                    reply::guided_intake(loader, &query, &self.collected, catalog.products());
                if reply.is_empty() {
                    debug!(loader = %loader, "Intake complete, nothing left to ask");
                }
                self.collected = next;
                reply
            }
        };

        let ids: Vec<MessageId> = reply.iter().map(|m| m.id.clone()).collect();
        self.log.splice(slot..=slot, reply);
        debug!(loader = %loader, replies = ids.len(), "Resolved loader");
        ids
    }

    /// Drop an unresolved loader and its query. The loader stays claimed.
    ///
    /// Returns `false` if the loader is not in the log.
    pub fn discard(&mut self, loader: &MessageId) -> bool {
        self.pending.remove(loader);
        let before = self.log.len();
        self.log.retain(|m| !(m.is_loading() && &m.id == loader));
        before != self.log.len()
    }

    /// Reveal the next page of a paginated product message.
    ///
    /// Returns only the products that were not visible before.
    pub fn show_more(
        &mut self,
        message_id: &MessageId,
        page_size: usize,
    ) -> Result<Vec<Product>, EngineError> {
        let message = self
            .log
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| EngineError::UnknownMessage(message_id.clone()))?;

        let MessageBody::Products {
            products,
            visible_count,
            show_more,
            ..
        } = &mut message.body
        else {
            return Err(EngineError::NotProducts(message_id.clone()));
        };

        let shown = visible_count.map_or(products.len(), |n| n.min(products.len()));
        if !*show_more || shown >= products.len() {
            return Err(EngineError::NothingMoreToShow(message_id.clone()));
        }

        let next = (shown + page_size.max(1)).min(products.len());
        let revealed = products[shown..next].to_vec();
        *visible_count = Some(next);
        *show_more = next < products.len();
        Ok(revealed)
    }

    /// Look up the value of a chip by its label.
    pub fn action_value(&self, message_id: &MessageId, label: &str) -> Result<String, EngineError> {
        let message = self
            .log
            .iter()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| EngineError::UnknownMessage(message_id.clone()))?;

        let MessageBody::Actions { actions } = &message.body else {
            return Err(EngineError::NotActions(message_id.clone()));
        };

        actions
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.value.clone())
            .ok_or_else(|| EngineError::UnknownAction {
                message: message_id.clone(),
                label: label.to_string(),
            })
    }

    /// Forget everything: log, answers, pending queries, claimed loaders.
    pub fn clear(&mut self) {
        self.log.clear();
        self.collected = Collected::default();
        self.pending.clear();
        self.processed.clear();
    }
}

/// Errors returned by conversation operations.
///
/// None of these change the log; they report why a call was a no-op.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Query was empty after trimming.
    #[error("Query is empty")]
    EmptyQuery,

    /// A reply is still being prepared.
    #[error("A response is still pending")]
    ResponsePending,

    /// No message with this id.
    #[error("Message not found: {0}")]
    UnknownMessage(MessageId),

    /// Message is not a product carousel.
    #[error("Message is not a product list: {0}")]
    NotProducts(MessageId),

    /// Every product is already visible.
    #[error("No more products to show in {0}")]
    NothingMoreToShow(MessageId),

    /// Message is not a chip row.
    #[error("Message has no actions: {0}")]
    NotActions(MessageId),

    /// No chip with this label.
    #[error("No action labelled {label:?} in {message}")]
    UnknownAction { message: MessageId, label: String },
}
