//! User profile model from `GET /users/me`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub email: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl UserProfile {
    /// Name to greet the shopper with.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"user_id": 1, "email": "a@example.com"}"#)
                .expect("profile should parse");
        assert_eq!(profile.display_name(), "a@example.com");
    }
}
