//! Keyword classification of shopper queries.

use serde::{Deserialize, Serialize};

/// Canned reply path picked from keywords in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// No results, with recommendation chips and support contact.
    None,
    /// Full product list, capped.
    Many,
    /// Single best match.
    One,
    /// Paginated product list.
    More,
    /// Feedback screen.
    Feedback,
    /// Connection-lost screen.
    Connection,
    /// Error bubble.
    Error,
    /// Help text listing the keywords.
    Default,
}

impl Scenario {
    /// Keyword scenarios in match precedence order.
    pub const KEYWORDS: [Scenario; 7] = [
        Scenario::None,
        Scenario::Many,
        Scenario::One,
        Scenario::More,
        Scenario::Feedback,
        Scenario::Connection,
        Scenario::Error,
    ];

    /// The trigger keyword, `None` for the default path.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::None => Some("none"),
            Self::Many => Some("many"),
            Self::One => Some("one"),
            Self::More => Some("more"),
            Self::Feedback => Some("feedback"),
            Self::Connection => Some("connection"),
            Self::Error => Some("error"),
            Self::Default => None,
        }
    }
}

/// Classify a query by case-insensitive substring match.
///
/// The first keyword in [`Scenario::KEYWORDS`] order wins, so `"none of
/// these, or many"` is [`Scenario::None`]. Note `"none"` itself contains
/// `"one"`; precedence is what keeps it on the no-results path.
pub fn classify(query: &str) -> Scenario {
    let query = query.to_lowercase();
    Scenario::KEYWORDS
        .into_iter()
        .find(|scenario| scenario.keyword().is_some_and(|kw| query.contains(kw)))
        .unwrap_or(Scenario::Default)
}

/// Classify a budget answer in the guided intake: `none`, `many`, else `one`.
pub fn classify_intake(answer: &str) -> Scenario {
    let answer = answer.to_lowercase();
    if answer.contains("none") {
        Scenario::None
    } else if answer.contains("many") {
        Scenario::Many
    } else {
        Scenario::One
    }
}
