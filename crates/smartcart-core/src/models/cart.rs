//! Cart session and line-item models mirrored from the cart endpoints.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a cart session, mirrored from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    Active,
    CheckedOut,
    Cancelled,
    /// Statuses this client version does not know yet.
    #[serde(other)]
    Unknown,
}

impl CartStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, CartStatus::Active)
    }
}

/// Verification state of a line item against the cart's scale/camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    Verified,
    Mismatch,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub cart_item_id: i64,
    pub product_id: i64,
    pub name: String,
    /// Unit price in the smallest currency unit.
    pub unit_price: i64,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
}

impl CartItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSession {
    pub cart_session_id: i64,
    pub status: CartStatus,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// Result of `POST /carts/weight/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub expected_weight_g: f64,
    #[serde(default)]
    pub measured_weight_g: f64,
    #[serde(default)]
    pub diff_weight_g: f64,
}
