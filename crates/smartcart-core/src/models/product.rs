//! Product catalog models.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    /// Price in the smallest currency unit.
    pub price: i64,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub weight_g: Option<f64>,
}

/// In-store shelf location from `GET /products/{id}/location`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProductLocation {
    #[serde(default)]
    pub aisle: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProductLocation {
    /// One-line display form, e.g. "aisle 4 / dairy".
    pub fn display(&self) -> String {
        match (self.aisle.as_deref(), self.section.as_deref()) {
            (Some(aisle), Some(section)) => format!("aisle {} / {}", aisle, section),
            (Some(aisle), None) => format!("aisle {}", aisle),
            (None, Some(section)) => section.to_string(),
            (None, None) => self
                .description
                .clone()
                .unwrap_or_else(|| "location unknown".to_string()),
        }
    }
}
