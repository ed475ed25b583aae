//! Points valuation: category × condition multipliers over a common base.
//!
//! The value is derived once at submission and immutable afterwards; callers
//! never supply their own figure.

use serde::{Deserialize, Serialize};

/// Garment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tops,
    Bottoms,
    Dresses,
    Outerwear,
    Footwear,
    Accessories,
}

/// Garment condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    LikeNew,
    Excellent,
    Good,
    Fair,
}

/// Base points before multipliers.
pub const BASE_POINTS: f64 = 20.0;

impl Category {
    pub fn multiplier(self) -> f64 {
        match self {
            Category::Tops => 1.0,
            Category::Bottoms => 1.0,
            Category::Dresses => 1.3,
            Category::Outerwear => 1.5,
            Category::Footwear => 1.2,
            Category::Accessories => 0.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Tops => "tops",
            Category::Bottoms => "bottoms",
            Category::Dresses => "dresses",
            Category::Outerwear => "outerwear",
            Category::Footwear => "footwear",
            Category::Accessories => "accessories",
        }
    }
}

impl Condition {
    pub fn multiplier(self) -> f64 {
        match self {
            Condition::LikeNew => 1.5,
            Condition::Excellent => 1.3,
            Condition::Good => 1.0,
            Condition::Fair => 0.7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::LikeNew => "like-new",
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
        }
    }
}

/// Estimated points value for a new listing.
pub fn points_value(category: Category, condition: Condition) -> u64 {
    (BASE_POINTS * category.multiplier() * condition.multiplier()).round() as u64
}
