//! Canned assistant replies.
//!
//! Both flows turn a resolved loader into the messages that replace it. Ids
//! are derived from the loader id so each reply stays traceable.

use crate::catalog::Product;
use crate::collected::{Answer, Collected};
use crate::config::EngineConfig;
use crate::message::{Action, Message, MessageId, TextStyle};
use crate::scenario::{classify, classify_intake, Scenario};

pub(crate) const BEST_MATCH_HEADER: &str =
    "Based on your request, this is the best match for your needs in our store:";
pub(crate) const INTAKE_BEST_MATCH_HEADER: &str = "Based on your skin type and other indications, this is the best match for your needs in our store:";
pub(crate) const CLOSEST_MATCHES_HEADER: &str = "I couldn’t find anything for your exact request, but here are the closest matches that our customers love:";
pub(crate) const MORE_HEADER: &str = "Here are some products you might like:";
pub(crate) const FOLLOW_UP_FOOTER: &str = "Do you need any further help?";
pub(crate) const SUPPORT_TEXT: &str = "If you need immediate help, call us (+3706 465 8132) or send us an email (info@shop.lt). Would you like me to help you draft and send an email to our customer support manager?";
pub(crate) const ERROR_TEXT: &str = "Something went wrong while looking for products. Please try again.";
pub(crate) const ASK_SKIN_TYPE: &str = "What’s your skin type? (oily, dry, normal…)";
pub(crate) const ASK_BUDGET: &str = "Great! What’s your budget range?";

/// Recommendation chips offered with a "no results" reply.
pub fn recommendations() -> Vec<Action> {
    vec![
        Action::new("Recommendation 1", "rec1"),
        Action::new("Recommendation 2", "rec2"),
    ]
}

/// Help text listing every recognised keyword.
pub fn help_text() -> String {
    let keywords: Vec<String> = Scenario::KEYWORDS
        .iter()
        .filter_map(|s| s.keyword())
        .map(|kw| format!("\"{kw}\""))
        .collect();
    format!(
        "I can show you a preview of every answer type. Try a message containing {}.",
        keywords.join(", ")
    )
}

/// Reply of the scripted demo flow: depends only on the current query.
pub fn scripted(
    loader: &MessageId,
    query: &str,
    products: Vec<Product>,
    config: &EngineConfig,
) -> Vec<Message> {
    match classify(query) {
        Scenario::One => vec![best_match(loader, products, BEST_MATCH_HEADER)],
        Scenario::Many => vec![Message::products(loader.derive("many"), products)
            .header(CLOSEST_MATCHES_HEADER)
            .footer(FOLLOW_UP_FOOTER)
            .capped(config.many_visible_count)
            .build()],
        Scenario::More => vec![Message::products(loader.derive("more"), products)
            .header(MORE_HEADER)
            .footer(FOLLOW_UP_FOOTER)
            .paginated(config.effective_page_size())
            .build()],
        Scenario::None => no_results(loader, query),
        Scenario::Feedback => vec![Message::feedback(loader.derive("feedback"))],
        Scenario::Connection => vec![Message::connection_lost(loader.derive("connection"))],
        Scenario::Error => vec![Message::error(loader.derive("error"), ERROR_TEXT)],
        Scenario::Default => vec![Message::assistant(loader.derive("help"), help_text())],
    }
}

/// Reply of the guided intake, plus the updated answers.
///
/// Once both answers are in, the intake is inert: no reply, answers
/// unchanged.
pub fn guided_intake(
    loader: &MessageId,
    query: &str,
    collected: &Collected,
    products: Vec<Product>,
) -> (Vec<Message>, Collected) {
    let answer = query.to_lowercase();
    let mut next = collected.clone();

    match (&collected.skin_type, &collected.budget) {
        (Answer::NotAsked, _) => {
            next.skin_type = Answer::Pending;
            (
                vec![Message::assistant(loader.derive("skin"), ASK_SKIN_TYPE)],
                next,
            )
        }
        (Answer::Pending, _) => {
            next.skin_type = Answer::Answered(answer);
            next.budget = Answer::Pending;
            (
                vec![Message::assistant(loader.derive("budget"), ASK_BUDGET)],
                next,
            )
        }
        (Answer::Answered(_), Answer::NotAsked | Answer::Pending) => {
            let reply = match classify_intake(&answer) {
                Scenario::None => no_results(loader, query),
                Scenario::Many => vec![Message::products(loader.derive("many"), products)
                    .header(CLOSEST_MATCHES_HEADER)
                    .footer(FOLLOW_UP_FOOTER)
                    .build()],
                _ => vec![best_match(loader, products, INTAKE_BEST_MATCH_HEADER)],
            };
            next.budget = Answer::Answered(answer);
            (reply, next)
        }
        (Answer::Answered(_), Answer::Answered(_)) => (Vec::new(), next),
    }
}

fn best_match(loader: &MessageId, products: Vec<Product>, header: &str) -> Message {
    let first: Vec<Product> = products.into_iter().take(1).collect();
    Message::products(loader.derive("one"), first)
        .header(header)
        .build()
}

fn no_results(loader: &MessageId, query: &str) -> Vec<Message> {
    let query = query.to_lowercase();
    let subject = if query.is_empty() {
        "your query"
    } else {
        query.as_str()
    };
    vec![
        Message::styled(
            loader.derive("none"),
            format!("No results found for {subject}. I suggest checking these items:"),
            TextStyle::NoResults,
        ),
        Message::actions(loader.derive("actions"), recommendations()),
        Message::styled(loader.derive("support"), SUPPORT_TEXT, TextStyle::Support),
    ]
}
