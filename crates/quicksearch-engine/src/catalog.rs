//! Product data for assistant replies.
//!
//! Replies that show products pull them from a [`ProductSource`]. The engine
//! ships with [`MockCatalog`]; a JSON file can replace it via [`JsonCatalog`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::EngineConfig;

/// Price shown when a product carries none.
pub const FALLBACK_PRICE: &str = "120 €";
/// Rating shown when a product carries none.
pub const FALLBACK_RATING: f32 = 4.8;
/// Review count shown when a product carries none.
pub const FALLBACK_REVIEWS: u32 = 20;

/// A product stub as shown on a product card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Image reference (path or URL).
    pub image: String,
    /// Price in euros.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Average rating out of 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    /// Number of reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<u32>,
}

impl Product {
    /// Create a product with only the required fields.
    pub fn new(id: impl Into<String>, title: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image: image.into(),
            price: None,
            rating: None,
            reviews: None,
        }
    }

    /// Price label, e.g. `"34 €"`.
    pub fn price_label(&self) -> String {
        match self.price {
            Some(price) if price.fract() == 0.0 => format!("{price:.0} €"),
            Some(price) => format!("{price:.2} €"),
            None => FALLBACK_PRICE.to_string(),
        }
    }

    /// Rating with the display fallback applied.
    pub fn display_rating(&self) -> f32 {
        self.rating.unwrap_or(FALLBACK_RATING)
    }

    /// Review count with the display fallback applied.
    pub fn display_reviews(&self) -> u32 {
        self.reviews.unwrap_or(FALLBACK_REVIEWS)
    }
}

/// Source of products for assistant replies.
pub trait ProductSource: Send + Sync {
    /// All products, in display order.
    fn products(&self) -> Vec<Product>;
}

/// Built-in catalog of a few skincare products.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog;

impl ProductSource for MockCatalog {
    fn products(&self) -> Vec<Product> {
        vec![
            priced("p1", "Hydrating Gel Cleanser", "/img/products/p1.png", 24.0, 4.8, 132),
            priced("p2", "Vitamin C Brightening Serum", "/img/products/p2.png", 39.0, 4.7, 88),
            priced("p3", "Barrier Repair Moisturizer", "/img/products/p3.png", 32.5, 4.9, 210),
            priced("p4", "Mineral Sunscreen SPF 50", "/img/products/p4.png", 28.0, 4.6, 64),
            priced("p5", "Gentle Exfoliating Toner", "/img/products/p5.png", 21.0, 4.5, 47),
            priced("p6", "Overnight Recovery Mask", "/img/products/p6.png", 45.0, 4.8, 19),
            Product::new("p7", "Soothing Eye Cream", "/img/products/p7.png"),
        ]
    }
}

fn priced(id: &str, title: &str, image: &str, price: f64, rating: f32, reviews: u32) -> Product {
    Product {
        price: Some(price),
        rating: Some(rating),
        reviews: Some(reviews),
        ..Product::new(id, title, image)
    }
}

/// Catalog loaded from a JSON array of products.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    products: Vec<Product>,
}

impl JsonCatalog {
    /// Load a catalog file. An empty array is rejected.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(CatalogError::Io)?;
        let products: Vec<Product> = serde_json::from_str(&content).map_err(CatalogError::Parse)?;
        if products.is_empty() {
            return Err(CatalogError::Empty(path.display().to_string()));
        }
        Ok(Self { products })
    }
}

impl ProductSource for JsonCatalog {
    fn products(&self) -> Vec<Product> {
        self.products.clone()
    }
}

/// The catalog named by `config.catalog_path`, or the mock catalog.
pub fn catalog_for(config: &EngineConfig) -> Result<Arc<dyn ProductSource>, CatalogError> {
    match &config.catalog_path {
        Some(path) => Ok(Arc::new(JsonCatalog::load(path)?)),
        None => Ok(Arc::new(MockCatalog)),
    }
}

/// Errors that can occur when loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// The catalog file holds no products.
    #[error("Catalog has no products: {0}")]
    Empty(String),
}
