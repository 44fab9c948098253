//! Plain-text rendering of the message log.

use std::fmt::Write;

use quicksearch_engine::{Message, MessageBody, Product, Role, TextStyle};

const CART_PROMPT: &str = "Would you like me to add this product to your cart?";
const FEEDBACK_TEXT: &str = "How did we do? Rate this conversation from 1 to 5.";
const CONNECTION_LOST_TEXT: &str =
    "A-oh, we lost a connection :( Check your internet and try to refresh the page.";

/// Render one message as terminal lines.
pub fn render_message(message: &Message) -> String {
    let mut out = String::new();
    match &message.body {
        MessageBody::Text { text, style } => match (message.role, style) {
            (Role::User, _) => {
                let _ = writeln!(out, "> {text}");
            }
            (_, Some(TextStyle::NoResults)) => {
                let _ = writeln!(out, "  ! {text}");
            }
            (_, Some(TextStyle::Support)) => {
                let _ = writeln!(out, "  ? {text}");
            }
            (_, None) => {
                let _ = writeln!(out, "  {text}");
            }
        },
        MessageBody::Loading => out.push_str("  ...\n"),
        MessageBody::Products {
            products,
            header,
            footer,
            show_more,
            ..
        } => {
            if let Some(header) = header {
                let _ = writeln!(out, "  {header}");
            }
            let visible = message.visible_products().unwrap_or_default();
            out.push_str(&render_products(visible));
            if *show_more {
                let _ = writeln!(
                    out,
                    "  ({} of {} shown, /more {} for more)",
                    visible.len(),
                    products.len(),
                    message.id
                );
            }
            if products.len() == 1 {
                let _ = writeln!(out, "  {CART_PROMPT}");
            } else if let Some(footer) = footer {
                let _ = writeln!(out, "  {footer}");
            }
        }
        MessageBody::Actions { actions } => {
            let chips: Vec<String> = actions.iter().map(|a| format!("[{}]", a.label)).collect();
            let _ = writeln!(out, "  {}  (/action {} <label>)", chips.join(" "), message.id);
        }
        MessageBody::Feedback => {
            let _ = writeln!(out, "  [feedback] {FEEDBACK_TEXT}");
        }
        MessageBody::ConnectionLost => {
            let _ = writeln!(out, "  [offline] {CONNECTION_LOST_TEXT}");
        }
        MessageBody::Error { text } => {
            let _ = writeln!(out, "  [error] {text}");
        }
    }
    out
}

/// Render product cards, one per line.
pub fn render_products(products: &[Product]) -> String {
    let mut out = String::new();
    for product in products {
        let _ = writeln!(
            out,
            "    - {} ({}) {} | {:.1} ({})",
            product.title,
            product.id,
            product.price_label(),
            product.display_rating(),
            product.display_reviews()
        );
    }
    out
}

/// Render a whole log.
pub fn render_log(messages: &[Message]) -> String {
    messages.iter().map(render_message).collect()
}
