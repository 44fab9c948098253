//! Timed conversation engine.
//!
//! [`ConversationEngine`] wraps a [`Conversation`] with the simulated
//! "thinking" delay. Submitting a query schedules its own resolution on a
//! Tokio timer; [`ConversationEngine::on_log_changed`] covers collaborators
//! that re-scan the log after every change and is a no-op for loaders that
//! are already scheduled.
//!
//! All state sits behind one mutex that is never held across an await, and
//! every timer is aborted on [`ConversationEngine::reset`] and on drop.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info};

use crate::catalog::{MockCatalog, Product, ProductSource};
use crate::collected::Collected;
use crate::config::EngineConfig;
use crate::conversation::{Conversation, EngineError};
use crate::message::{Message, MessageId};

/// Conversation engine for one widget session.
///
/// Must be used from within a Tokio runtime: scheduling a reply spawns a
/// timer task.
pub struct ConversationEngine {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    config: EngineConfig,
    catalog: Arc<dyn ProductSource>,
    log_tx: watch::Sender<Vec<Message>>,
}

#[derive(Default)]
struct State {
    conversation: Conversation,
    timers: HashMap<MessageId, AbortHandle>,
}

/// Handle to a scheduled loader resolution.
#[derive(Debug)]
pub struct Resolution {
    loader_id: MessageId,
    handle: JoinHandle<()>,
    engine: Weak<Inner>,
}

impl Resolution {
    /// The loader this resolution will replace.
    pub fn loader_id(&self) -> &MessageId {
        &self.loader_id
    }

    /// Stop the timer and drop the loader, so the session accepts the next
    /// query. No-op once the reply has landed.
    pub fn cancel(&self) {
        self.handle.abort();
        if let Some(inner) = self.engine.upgrade() {
            inner.cancel(&self.loader_id, self.handle.id());
        }
    }

    /// Wait for the timer. Returns `false` if it was cancelled.
    pub async fn finished(self) -> bool {
        self.handle.await.is_ok()
    }
}

impl ConversationEngine {
    /// Create an engine backed by the built-in mock catalog.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_catalog(config, Arc::new(MockCatalog))
    }

    /// Create an engine with a custom product source.
    pub fn with_catalog(config: EngineConfig, catalog: Arc<dyn ProductSource>) -> Self {
        let (log_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                config,
                catalog,
                log_tx,
            }),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Receive a snapshot of the log after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.inner.log_tx.subscribe()
    }

    /// Current log snapshot.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.lock().conversation.messages().to_vec()
    }

    /// Current collected answers.
    pub fn collected(&self) -> Collected {
        self.inner.state.lock().conversation.collected().clone()
    }

    /// Whether a reply is still pending.
    pub fn is_busy(&self) -> bool {
        self.inner.state.lock().conversation.has_outstanding_loader()
    }

    /// Submit a shopper query.
    ///
    /// Appends the query and a loader, then schedules the reply after the
    /// configured delay. Rejected without touching the log if the query is
    /// blank or a reply is still pending.
    pub fn submit(&self, text: &str) -> Result<Resolution, EngineError> {
        let mut state = self.inner.state.lock();
        let loader = state.conversation.submit(text).inspect_err(|e| {
            debug!(error = %e, "Ignoring submission");
        })?;
        state.conversation.claim(&loader);
        let resolution = self.schedule(&mut state, loader);
        self.inner.publish(&state);
        Ok(resolution)
    }

    /// Post a user message without asking for a reply.
    pub fn push_user_text(&self, text: &str) -> Result<MessageId, EngineError> {
        let mut state = self.inner.state.lock();
        let id = state.conversation.push_user_text(text)?;
        self.inner.publish(&state);
        Ok(id)
    }

    /// Re-examine a log snapshot for an unresolved loader.
    ///
    /// Safe to call after every change: a loader is scheduled at most once
    /// per session, so repeated calls return `None`.
    pub fn on_log_changed(&self, log: &[Message]) -> Option<Resolution> {
        let loader = Conversation::latest_loader(log)?.clone();
        let mut state = self.inner.state.lock();
        if !state.conversation.claim(&loader) {
            return None;
        }
        Some(self.schedule(&mut state, loader))
    }

    /// Reveal the next page of a paginated product message.
    pub fn show_more(&self, message_id: &MessageId) -> Result<Vec<Product>, EngineError> {
        let mut state = self.inner.state.lock();
        let revealed = state
            .conversation
            .show_more(message_id, self.inner.config.effective_page_size())?;
        self.inner.publish(&state);
        Ok(revealed)
    }

    /// Resolve a chip label to the value it stands for.
    ///
    /// The engine does not react to the choice; acting on it is up to the
    /// caller.
    pub fn select_action(&self, message_id: &MessageId, label: &str) -> Result<String, EngineError> {
        let value = self
            .inner
            .state
            .lock()
            .conversation
            .action_value(message_id, label)?;
        debug!(message = %message_id, value = %value, "Action selected");
        Ok(value)
    }

    /// Cancel every timer and start over with an empty session.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        let cancelled = state.timers.len();
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
        state.conversation.clear();
        self.inner.publish(&state);
        if cancelled > 0 {
            info!(cancelled, "Conversation reset");
        } else {
            debug!("Conversation reset");
        }
    }

    fn schedule(&self, state: &mut State, loader: MessageId) -> Resolution {
        let inner = Arc::clone(&self.inner);
        let delay = self.inner.config.delay();
        let id = loader.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.resolve(&id);
        });
        state.timers.insert(loader.clone(), handle.abort_handle());
        debug!(loader = %loader, delay_ms = self.inner.config.delay_ms, "Scheduled reply");
        Resolution {
            loader_id: loader,
            handle,
            engine: Arc::downgrade(&self.inner),
        }
    }
}

impl Inner {
    fn resolve(&self, loader: &MessageId) {
        let mut state = self.state.lock();
        state.timers.remove(loader);
        state
            .conversation
            .resolve(loader, &self.config, self.catalog.as_ref());
        self.publish(&state);
    }

    fn cancel(&self, loader: &MessageId, task: tokio::task::Id) {
        let mut state = self.state.lock();
        // A handle from before a reset must not touch the new session.
        if state.timers.get(loader).is_none_or(|timer| timer.id() != task) {
            return;
        }
        state.timers.remove(loader);
        if state.conversation.discard(loader) {
            self.publish(&state);
            debug!(loader = %loader, "Cancelled reply");
        }
    }

    fn publish(&self, state: &State) {
        self.log_tx
            .send_replace(state.conversation.messages().to_vec());
    }
}

impl Drop for ConversationEngine {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ConversationEngine")
            .field("config", &self.inner.config)
            .field("messages", &state.conversation.messages().len())
            .field("timers", &state.timers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collected::Answer;
    use crate::config::Flow;
    use crate::message::MessageBody;
    use std::time::Duration;

    fn engine() -> ConversationEngine {
        ConversationEngine::new(EngineConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_appends_query_and_loader() {
        let engine = engine();
        let resolution = engine.submit("  one ").unwrap();

        let log = engine.messages();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].text(), Some("one"));
        assert!(log[1].is_loading());
        assert_eq!(&log[1].id, resolution.loader_id());
        assert!(engine.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_and_busy_submissions_are_noops() {
        let engine = engine();
        assert_eq!(engine.submit("   ").unwrap_err(), EngineError::EmptyQuery);
        assert!(engine.messages().is_empty());

        engine.submit("one").unwrap();
        assert_eq!(
            engine.submit("many").unwrap_err(),
            EngineError::ResponsePending
        );
        assert_eq!(engine.messages().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_arrives_after_delay() {
        let engine = engine();
        let resolution = engine.submit("one").unwrap();
        let loader = resolution.loader_id().clone();

        tokio::time::sleep(Duration::from_millis(899)).await;
        assert!(engine.is_busy());

        tokio::time::sleep(Duration::from_millis(2)).await;
        let log = engine.messages();
        assert_eq!(log.len(), 2);
        assert!(!engine.is_busy());
        assert_eq!(log[1].id, loader.derive("one"));
        match &log[1].body {
            MessageBody::Products {
                products, header, ..
            } => {
                assert_eq!(products.len(), 1);
                assert!(header.as_deref().unwrap().contains("best match"));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_log_changed_resolves_at_most_once() {
        let engine = engine();
        let resolution = engine.submit("none").unwrap();

        for _ in 0..5 {
            assert!(engine.on_log_changed(&engine.messages()).is_none());
        }
        assert!(resolution.finished().await);
        assert!(engine.on_log_changed(&engine.messages()).is_none());

        let log = engine.messages();
        assert_eq!(log.len(), 4);
        assert_eq!(log.iter().filter(|m| m.kind() == "actions").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_log_changed_without_loader_is_noop() {
        let engine = engine();
        engine.push_user_text("hello").unwrap();
        assert!(engine.on_log_changed(&engine.messages()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_and_forgets_loaders() {
        let engine = engine();
        let resolution = engine.submit("one").unwrap();
        let snapshot = engine.messages();

        engine.reset();
        assert!(engine.messages().is_empty());
        assert!(!resolution.finished().await);

        // The old loader id is unknown to the fresh session.
        let again = engine.on_log_changed(&snapshot).unwrap();
        assert!(again.finished().await);
        assert!(engine.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_resolution_frees_session() {
        let engine = engine();
        let resolution = engine.submit("one").unwrap();
        let snapshot = engine.messages();
        resolution.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!engine.is_busy());
        assert_eq!(engine.messages().len(), 1);
        assert!(engine.inner.state.lock().timers.is_empty());
        // A stale rescan does not bring the cancelled loader back.
        assert!(engine.on_log_changed(&snapshot).is_none());

        let next = engine.submit("many").unwrap();
        assert!(next.finished().await);
        assert_eq!(engine.messages().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cancel_leaves_new_session_alone() {
        let engine = engine();
        let stale = engine.submit("one").unwrap();
        let snapshot = engine.messages();
        engine.reset();

        engine.push_user_text("one").unwrap();
        let rescan = engine.on_log_changed(&snapshot).unwrap();
        stale.cancel();
        assert!(rescan.finished().await);
        assert!(engine.inner.state.lock().timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_more_through_engine() {
        let engine = engine();
        engine.submit("MORE please").unwrap().finished().await;

        let carousel = engine.messages()[1].id.clone();
        let next = engine.show_more(&carousel).unwrap();
        assert_eq!(next.len(), 3);
        assert_eq!(engine.messages()[1].visible_products().unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_action_returns_value() {
        let engine = engine();
        engine.submit("none").unwrap().finished().await;

        let chips = engine.messages()[2].id.clone();
        assert_eq!(
            engine.select_action(&chips, "Recommendation 1").unwrap(),
            "rec1"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_guided_intake_reads_current_answers() {
        let engine = ConversationEngine::new(EngineConfig {
            flow: Flow::GuidedIntake,
            ..Default::default()
        });

        engine.submit("hello").unwrap().finished().await;
        assert_eq!(engine.collected().skin_type, Answer::Pending);

        engine.submit("oily").unwrap().finished().await;
        assert_eq!(engine.collected().skin_type, Answer::Answered("oily".into()));

        let loader = engine.submit("none of these").unwrap();
        let loader_id = loader.loader_id().clone();
        loader.finished().await;

        let collected = engine.collected();
        assert_eq!(collected.budget, Answer::Answered("none of these".into()));

        let tail: Vec<MessageId> = engine
            .messages()
            .iter()
            .rev()
            .take(3)
            .rev()
            .map(|m| m.id.clone())
            .collect();
        assert_eq!(
            tail,
            [
                loader_id.derive("none"),
                loader_id.derive("actions"),
                loader_id.derive("support")
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_every_mutation() {
        let engine = engine();
        let mut rx = engine.subscribe();

        let resolution = engine.submit("feedback").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 2);

        resolution.finished().await;
        rx.changed().await.unwrap();
        let log = rx.borrow_and_update().clone();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].kind(), "feedback");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_timers() {
        let engine = engine();
        let resolution = engine.submit("one").unwrap();
        drop(engine);
        assert!(!resolution.finished().await);
    }
}
