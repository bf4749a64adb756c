//! Typed API client for the smart-cart backend.
//!
//! Thin wrappers over the [`Gateway`] for the endpoints the kiosk consumes:
//! auth/session, products (barcode lookup), the cart session and its line
//! items, weight validation, checkout, and recipe recommendations. The
//! backend owns all state; these calls mirror it.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::models::{
    CartItem, CartSession, Product, ProductLocation, RecipeDetail, RecipeRecommendation,
    UserProfile, WeightValidation,
};

use super::Gateway;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// API client for the smart-cart backend.
/// Clone is cheap - the gateway is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    gateway: Arc<Gateway>,
}

impl ApiClient {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    // ===== Auth & user =====

    /// Register a new account.
    pub async fn signup(&self, email: &str, password: &str, nickname: &str) -> Result<()> {
        let body = json!({ "email": email, "password": password, "nickname": nickname });
        self.gateway
            .post_unit_with("/auth/signup", &body)
            .await
            .context("Signup failed")
    }

    /// Log in and persist the returned access token. The refresh token
    /// arrives as an HTTP-only cookie and stays in the gateway's cookie jar.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let body = json!({ "email": email, "password": password });
        let response: LoginResponse = self
            .gateway
            .post("/auth/login", &body)
            .await
            .context("Login failed")?;
        self.gateway.store_token(&response.access_token)?;
        debug!("Logged in");
        Ok(())
    }

    /// Log out server-side (best effort) and clear the stored token.
    pub async fn logout(&self) -> Result<()> {
        if let Err(err) = self.gateway.post_unit("/auth/logout").await {
            warn!(error = %err, "Logout request failed, clearing local session anyway");
        }
        self.gateway.clear_token()
    }

    /// Fetch the logged-in user's profile.
    pub async fn me(&self) -> Result<UserProfile> {
        self.gateway.get("/users/me").await
    }

    pub async fn update_nickname(&self, nickname: &str) -> Result<()> {
        self.gateway
            .patch_unit("/users/me/nickname", &json!({ "nickname": nickname }))
            .await
    }

    // ===== Products =====

    pub async fn products(&self) -> Result<Vec<Product>> {
        self.gateway.get("/products/").await
    }

    pub async fn product(&self, product_id: i64) -> Result<Product> {
        self.gateway.get(&format!("/products/{}", product_id)).await
    }

    /// Fetch the in-store shelf location for a product.
    pub async fn product_location(&self, product_id: i64) -> Result<ProductLocation> {
        self.gateway
            .get(&format!("/products/{}/location", product_id))
            .await
    }

    /// Look a product up by its scanned barcode.
    pub async fn product_by_barcode(&self, barcode: &str) -> Result<Product> {
        self.gateway
            .get(&format!("/products/barcode/{}", barcode))
            .await
            .with_context(|| format!("No product found for barcode {}", barcode))
    }

    // ===== Cart session & items =====

    /// Open a new cart session (pairs this client with a physical cart).
    pub async fn create_cart(&self) -> Result<CartSession> {
        self.gateway.post_empty("/carts/").await
    }

    /// Fetch a cart session including its line items.
    pub async fn cart(&self, session_id: i64) -> Result<CartSession> {
        self.gateway.get(&format!("/carts/{}", session_id)).await
    }

    pub async fn add_item(
        &self,
        session_id: i64,
        product_id: i64,
        quantity: u32,
    ) -> Result<CartItem> {
        let body = json!({ "product_id": product_id, "quantity": quantity });
        self.gateway
            .post(&format!("/carts/{}/items", session_id), &body)
            .await
    }

    /// Barcode scan path: resolve the product, then add it to the cart.
    pub async fn add_item_by_barcode(
        &self,
        session_id: i64,
        barcode: &str,
        quantity: u32,
    ) -> Result<CartItem> {
        let product = self.product_by_barcode(barcode).await?;
        self.add_item(session_id, product.product_id, quantity).await
    }

    pub async fn update_quantity(&self, cart_item_id: i64, quantity: u32) -> Result<()> {
        self.gateway
            .patch_unit(
                &format!("/carts/items/{}", cart_item_id),
                &json!({ "quantity": quantity }),
            )
            .await
    }

    pub async fn remove_item(&self, cart_item_id: i64) -> Result<()> {
        self.gateway
            .delete_unit(&format!("/carts/items/{}", cart_item_id))
            .await
    }

    /// Ask the backend to compare the scale reading against the cart contents.
    pub async fn validate_weight(
        &self,
        session_id: i64,
        measured_weight_g: f64,
    ) -> Result<WeightValidation> {
        let body = json!({
            "cart_session_id": session_id,
            "measured_weight_g": measured_weight_g,
        });
        self.gateway.post("/carts/weight/validate", &body).await
    }

    /// Initiate checkout for the session.
    pub async fn checkout(&self, session_id: i64) -> Result<()> {
        self.gateway
            .post_unit(&format!("/carts/{}/checkout", session_id))
            .await
            .context("Checkout failed")
    }

    /// Cancel the session, releasing the cart.
    pub async fn cancel_cart(&self, session_id: i64) -> Result<()> {
        self.gateway
            .post_unit(&format!("/carts/{}/cancel", session_id))
            .await
    }

    /// Toggle the cart's shelf-facing camera view.
    pub async fn set_camera_view(&self, session_id: i64, on: bool) -> Result<()> {
        let state = if on { "on" } else { "off" };
        self.gateway
            .post_unit(&format!("/carts/{}/camera/view/{}", session_id, state))
            .await
    }

    // ===== Recommendations & recipes =====

    /// Recipes similar to a single product, optionally biased by the
    /// current cart contents.
    pub async fn recommendations_by_product(
        &self,
        product_id: i64,
        cart_session_id: Option<i64>,
    ) -> Result<Vec<RecipeRecommendation>> {
        let path = format!("/recommendations/by-product/{}", product_id);
        match cart_session_id {
            Some(session_id) => {
                self.gateway
                    .get_with(&path, &[("cart_session_id", session_id)])
                    .await
            }
            None => self.gateway.get(&path).await,
        }
    }

    /// Recipes recommended from the whole cart.
    pub async fn recommendations_by_cart(
        &self,
        session_id: i64,
    ) -> Result<Vec<RecipeRecommendation>> {
        self.gateway
            .get(&format!("/recommendations/by-cart/{}", session_id))
            .await
    }

    pub async fn recipe(&self, recipe_id: i64) -> Result<RecipeDetail> {
        self.gateway.get(&format!("/recipes/{}", recipe_id)).await
    }
}
