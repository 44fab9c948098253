//! Top-level topic chips and their sub-category chips.

use serde::{Deserialize, Serialize};

/// Top-level topic a shopper can pick before typing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Consultation,
    OrderStatus,
    ShippingDelivery,
    Returns,
    ProductInformation,
    Payment,
}

impl Category {
    /// Chips in display order.
    pub const CHIPS: [Category; 6] = [
        Category::Payment,
        Category::Returns,
        Category::Consultation,
        Category::OrderStatus,
        Category::ProductInformation,
        Category::ShippingDelivery,
    ];

    /// Chip label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Consultation => "Consultation",
            Self::OrderStatus => "Order status",
            Self::ShippingDelivery => "Shipping & delivery",
            Self::Returns => "Returns",
            Self::ProductInformation => "Product Information",
            Self::Payment => "Payment",
        }
    }

    /// The sentence posted on the shopper's behalf when the chip is picked.
    pub fn sentence(self) -> &'static str {
        match self {
            Self::Consultation => "I’d like a consultation.",
            Self::OrderStatus => "I’m looking for my order status.",
            Self::ShippingDelivery => "I’m looking for information about Shipping & delivery.",
            Self::Returns => "I need help with returns.",
            Self::ProductInformation => "I’m looking for product information.",
            Self::Payment => "I have a question about payments.",
        }
    }

    /// Follow-up chips offered after the category is picked.
    pub fn subcategories(self) -> &'static [&'static str] {
        match self {
            Self::Consultation => &[
                "Book a call",
                "Skin type quiz",
                "Routine advice",
                "Shade matching",
                "Best-sellers",
            ],
            Self::OrderStatus => &[
                "Track order",
                "Change address",
                "Cancel order",
                "Invoice copy",
                "Late delivery",
            ],
            Self::ShippingDelivery => &[
                "Delivery methods",
                "Shipping status",
                "Shipping costs",
                "Delivery times",
                "International shipping",
            ],
            Self::Returns => &[
                "Start a return",
                "Return policy",
                "Refund timing",
                "Exchange item",
                "Return label",
            ],
            Self::ProductInformation => &[
                "Ingredients",
                "How to use",
                "Allergies & safety",
                "Stock availability",
                "Sizes & variants",
            ],
            Self::Payment => &[
                "Payment methods",
                "Installments",
                "Promo codes",
                "Billing issues",
                "Tax & VAT",
            ],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = UnknownCategory;

    /// Parse a chip label, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::CHIPS
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(wanted.to_string()))
    }
}

/// A label that matches no category chip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);
