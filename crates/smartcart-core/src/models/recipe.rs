//! Recipe recommendation models.

use serde::{Deserialize, Serialize};

/// One row from the recommendation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRecommendation {
    pub recipe_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Similarity score from the recommender, when it reports one.
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub product_id: i64,
    pub name: String,
    #[serde(default)]
    pub quantity_info: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Full recipe from `GET /recipes/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub recipe_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub cooking_time_min: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipe_detail() {
        let json = r#"{
            "recipe_id": 12,
            "title": "Budae Jjigae",
            "description": "Army stew",
            "instructions": "Boil everything.",
            "image_url": null,
            "cooking_time_min": 30,
            "difficulty": "easy",
            "ingredients": [
                {"product_id": 3, "name": "Spam 200g", "quantity_info": "half a can", "image_url": null}
            ]
        }"#;
        let recipe: RecipeDetail = serde_json::from_str(json).expect("recipe should parse");
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.cooking_time_min, Some(30));
    }

    #[test]
    fn test_parse_recommendation_without_score() {
        let rec: RecipeRecommendation =
            serde_json::from_str(r#"{"recipe_id": 1, "title": "Carbonara"}"#)
                .expect("minimal recommendation should parse");
        assert!(rec.score.is_none());
    }
}
