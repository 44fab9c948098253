//! Widget lifecycle and view state.
//!
//! The widget opens on an explainer, moves to the topic chips, then to a
//! category's follow-up chips and finally to free chat. Each open creates a
//! fresh [`ConversationEngine`]; closing drops it, which cancels any reply
//! still in flight.

use std::sync::Arc;

use tracing::info;

use crate::catalog::ProductSource;
use crate::category::Category;
use crate::config::EngineConfig;
use crate::conversation::EngineError;
use crate::engine::{ConversationEngine, Resolution};
use crate::message::MessageId;

/// Title shown on the explainer screen.
pub const EXPLAIN_TITLE: &str = "How to use Quick Search";
/// Title shown everywhere else.
pub const GREETING_TITLE: &str = "Hello, what are you\nlooking for today?";

/// Which screen the widget shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// How-to explainer.
    Explain,
    /// Top-level topic chips.
    Chips,
    /// A picked topic with its follow-up chips.
    Category(Category),
    /// Free chat.
    Chat,
}

type ActionCallback = Box<dyn Fn(&str) + Send + Sync>;

/// The assistant widget.
pub struct Widget {
    config: EngineConfig,
    catalog: Arc<dyn ProductSource>,
    engine: Option<ConversationEngine>,
    view: View,
    show_subcategories: bool,
    cart_count: u32,
    on_action: Option<ActionCallback>,
}

impl Widget {
    /// Create a closed widget.
    pub fn new(config: EngineConfig, catalog: Arc<dyn ProductSource>) -> Self {
        Self {
            config,
            catalog,
            engine: None,
            view: View::Chips,
            show_subcategories: false,
            cart_count: 0,
            on_action: None,
        }
    }

    /// Register the handler that receives picked chip values.
    #[must_use]
    pub fn on_action(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_action = Some(Box::new(callback));
        self
    }

    /// Whether the widget is open.
    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    /// Current view.
    pub fn view(&self) -> View {
        self.view
    }

    /// Items in the cart.
    pub fn cart_count(&self) -> u32 {
        self.cart_count
    }

    /// The session's engine.
    pub fn engine(&self) -> Result<&ConversationEngine, WidgetError> {
        self.engine.as_ref().ok_or(WidgetError::Closed)
    }

    /// Open on the explainer with a fresh session.
    pub fn open(&mut self) {
        if self.engine.is_none() {
            self.engine = Some(ConversationEngine::with_catalog(
                self.config.clone(),
                Arc::clone(&self.catalog),
            ));
            info!("Widget opened");
        }
        self.view = View::Explain;
    }

    /// Leave the explainer for the topic chips.
    pub fn continue_to_chips(&mut self) -> Result<(), WidgetError> {
        self.engine()?;
        self.view = View::Chips;
        Ok(())
    }

    /// Pick a topic: the log restarts with the topic's canned sentence.
    pub fn pick_category(&mut self, category: Category) -> Result<MessageId, WidgetError> {
        let engine = self.engine()?;
        engine.reset();
        let id = engine.push_user_text(category.sentence())?;
        self.show_subcategories = true;
        self.view = View::Category(category);
        Ok(id)
    }

    /// Follow-up chips on offer, if any.
    pub fn subcategories(&self) -> Option<&'static [&'static str]> {
        match self.view {
            View::Category(category) if self.show_subcategories => Some(category.subcategories()),
            _ => None,
        }
    }

    /// Pick a follow-up chip: it is sent as a query.
    pub fn pick_subcategory(&mut self, label: &str) -> Result<Resolution, WidgetError> {
        let result = self.engine()?.submit(label);
        self.show_subcategories = false;
        self.view = View::Chat;
        Ok(result?)
    }

    /// Send a typed query. Any non-blank text switches to chat.
    pub fn send(&mut self, text: &str) -> Result<Resolution, WidgetError> {
        let engine = self.engine()?;
        let result = engine.submit(text);
        if !text.trim().is_empty() {
            self.view = View::Chat;
        }
        Ok(result?)
    }

    /// Go back: chat and category views return to the chips with a fresh
    /// session; anywhere else closes the widget.
    pub fn back(&mut self) {
        if matches!(self.view, View::Chat | View::Category(_)) {
            if let Some(engine) = &self.engine {
                engine.reset();
                self.show_subcategories = false;
                self.view = View::Chips;
                return;
            }
        }
        self.close();
    }

    /// Close and discard the session.
    pub fn close(&mut self) {
        if self.engine.take().is_some() {
            info!("Widget closed");
        }
        self.view = View::Chips;
        self.show_subcategories = false;
    }

    /// Count a product added from a card. The cart outlives sessions.
    pub fn add_to_cart(&mut self, title: &str) -> u32 {
        self.cart_count += 1;
        info!(title, cart = self.cart_count, "Added to cart");
        self.cart_count
    }

    /// Pick a chip in an actions message and hand its value to the
    /// registered handler.
    pub fn select_action(&self, message_id: &MessageId, label: &str) -> Result<String, WidgetError> {
        let value = self.engine()?.select_action(message_id, label)?;
        if let Some(callback) = &self.on_action {
            callback(&value);
        }
        Ok(value)
    }

    /// Modal title for the current view.
    pub fn title(&self) -> &'static str {
        match self.view {
            View::Explain => EXPLAIN_TITLE,
            _ => GREETING_TITLE,
        }
    }

    /// The title is hidden once the conversation has started or a topic is
    /// picked.
    pub fn shows_title(&self) -> bool {
        let empty = self
            .engine
            .as_ref()
            .is_none_or(|engine| engine.messages().is_empty());
        !matches!(self.view, View::Category(_)) && empty
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("view", &self.view)
            .field("open", &self.is_open())
            .field("cart_count", &self.cart_count)
            .finish_non_exhaustive()
    }
}

/// Errors returned by widget operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    /// The widget is closed.
    #[error("Widget is closed")]
    Closed,

    /// The conversation rejected the request.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MockCatalog;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn widget() -> Widget {
        Widget::new(EngineConfig::default(), Arc::new(MockCatalog))
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_starts_on_explainer() {
        let mut widget = widget();
        assert!(!widget.is_open());
        assert_eq!(widget.engine().unwrap_err(), WidgetError::Closed);

        widget.open();
        assert!(widget.is_open());
        assert_eq!(widget.view(), View::Explain);
        assert_eq!(widget.title(), EXPLAIN_TITLE);

        widget.continue_to_chips().unwrap();
        assert_eq!(widget.view(), View::Chips);
        assert_eq!(widget.title(), GREETING_TITLE);
        assert!(widget.shows_title());
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_then_subcategory_flow() {
        let mut widget = widget();
        widget.open();
        widget.continue_to_chips().unwrap();

        widget.pick_category(Category::Returns).unwrap();
        assert_eq!(widget.view(), View::Category(Category::Returns));
        assert!(!widget.shows_title());
        assert_eq!(widget.subcategories().unwrap()[0], "Start a return");

        let messages = widget.engine().unwrap().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), Some("I need help with returns."));

        let resolution = widget.pick_subcategory("Return policy").unwrap();
        assert_eq!(widget.view(), View::Chat);
        assert!(widget.subcategories().is_none());
        assert!(resolution.finished().await);

        // user sentence, chip query, help reply
        let messages = widget.engine().unwrap().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].text(), Some("Return policy"));
        assert_eq!(messages[2].kind(), "text");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_send_keeps_view() {
        let mut widget = widget();
        widget.open();
        widget.continue_to_chips().unwrap();

        assert_eq!(
            widget.send("  ").unwrap_err(),
            WidgetError::Engine(EngineError::EmptyQuery)
        );
        assert_eq!(widget.view(), View::Chips);

        widget.send("one").unwrap();
        assert_eq!(widget.view(), View::Chat);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_resets_session_but_keeps_cart() {
        let mut widget = widget();
        widget.open();
        widget.continue_to_chips().unwrap();
        let pending = widget.send("one").unwrap();
        widget.add_to_cart("Hydrating Gel Cleanser");

        widget.back();
        assert_eq!(widget.view(), View::Chips);
        assert!(widget.is_open());
        assert!(widget.engine().unwrap().messages().is_empty());
        assert!(!pending.finished().await);
        assert_eq!(widget.cart_count(), 1);

        // From the chips, back closes.
        widget.back();
        assert!(!widget.is_open());
        assert_eq!(widget.cart_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_reply() {
        let mut widget = widget();
        widget.open();
        let pending = widget.send("many").unwrap();
        widget.close();
        assert!(!pending.finished().await);

        widget.open();
        assert!(widget.engine().unwrap().messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_action_calls_handler() {
        let picked = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&picked);
        let mut widget = widget().on_action(move |value| {
            assert_eq!(value, "rec2");
            seen.fetch_add(1, Ordering::SeqCst);
        });
        widget.open();
        widget.send("none").unwrap().finished().await;

        let chips = widget.engine().unwrap().messages()[2].id.clone();
        assert_eq!(widget.select_action(&chips, "Recommendation 2").unwrap(), "rec2");
        assert_eq!(picked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closed_widget_rejects_actions() {
        let mut widget = widget();
        assert_eq!(widget.send("one").unwrap_err(), WidgetError::Closed);
        assert_eq!(
            widget.pick_category(Category::Payment).unwrap_err(),
            WidgetError::Closed
        );
        assert!(widget.shows_title());
    }

    #[test]
    fn test_topic_picks_keep_info_log_quiet() {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(buffer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut widget = widget();
            widget.open();
            widget.pick_category(Category::Payment).unwrap();
            widget.pick_category(Category::Returns).unwrap();
            widget.back();
        });

        let logs = buffer.contents();
        assert!(logs.contains("Widget opened"));
        assert!(!logs.contains("Conversation reset"));
    }
}
