use serde::Serialize;

/// Catalog stub: budget-proportional picks keyed off the requested style.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRecommendation {
    pub name: String,
    pub price: f64,
    pub category: String,
    #[serde(rename = "ecoFriendly")]
    pub eco_friendly: bool,
}

pub fn recommend_products(style: &str, budget: f64) -> Vec<ProductRecommendation> {
    vec![
        ProductRecommendation {
            name: format!("{style} Sofa"),
            price: budget * 0.3,
            category: "Furniture".to_string(),
            eco_friendly: true,
        },
        ProductRecommendation {
            name: "Abstract Wall Art".to_string(),
            price: budget * 0.05,
            category: "Decor".to_string(),
            eco_friendly: false,
        },
        ProductRecommendation {
            name: "Bamboo Coffee Table".to_string(),
            price: budget * 0.15,
            category: "Furniture".to_string(),
            eco_friendly: true,
        },
    ]
}
