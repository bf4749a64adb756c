//! Domain models mirrored from the smart-cart REST resources.
//!
//! These are thin serde mirrors - the backend is the source of truth and the
//! client never derives state the server did not send.

pub mod cart;
pub mod product;
pub mod recipe;
pub mod user;

pub use cart::{CartItem, CartSession, CartStatus, ItemStatus, WeightValidation};
pub use product::{Product, ProductLocation};
pub use recipe::{RecipeDetail, RecipeIngredient, RecipeRecommendation};
pub use user::UserProfile;
