// src/food_lookup.rs
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db;
use crate::records::{new_record_id, CalorieLog, MealType};

pub const DEFAULT_BASE_URL: &str = "https://world.openfoodfacts.org";
const UNKNOWN_PRODUCT: &str = "Unknown product";

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Lookup service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Invalid barcode '{0}': expected digits only")]
    InvalidBarcode(String),
    #[error("No nutrition data found for barcode {0}. Enter it manually.")]
    NotFound(String),
    #[error("Nutrition source failed: {0}")]
    Source(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FactsSource {
    OpenFoodFacts,
    Dictionary,
}

/// Nutrition per 100 g.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NutritionFacts {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub source: FactsSource,
}

impl NutritionFacts {
    /// Builds a calorie log for one 100 g serving.
    #[must_use]
    pub fn into_calorie_log(self, date: NaiveDate, meal_type: MealType, now: DateTime<Utc>) -> CalorieLog {
        CalorieLog {
            id: new_record_id(),
            date,
            meal_type,
            food_name: self.name,
            calories: self.calories,
            protein: Some(self.protein),
            carbs: Some(self.carbs),
            fat: Some(self.fat),
            created_at: now,
        }
    }
}

/// Anything that can turn a barcode into nutrition facts.
pub trait NutritionSource {
    /// `Ok(None)` means the source has no entry for the barcode.
    /// # Errors
    /// Returns `LookupError` when the source itself fails.
    fn lookup(&self, barcode: &str) -> Result<Option<NutritionFacts>, LookupError>;
}

#[derive(Deserialize)]
struct ProductResponse {
    #[serde(default)]
    status: i64,
    product: Option<Product>,
}

#[derive(Deserialize)]
struct Product {
    product_name: Option<String>,
    product_name_ja: Option<String>,
    #[serde(default)]
    nutriments: HashMap<String, Value>,
}

impl Product {
    /// First positive value among `keys`, else 0.
    fn nutrient(&self, keys: &[&str]) -> f64 {
        keys.iter()
            .filter_map(|k| self.nutriments.get(*k))
            .filter_map(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .find(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(0.0)
    }

    fn into_facts(self) -> NutritionFacts {
        let calories = self.nutrient(&["energy-kcal_100g", "energy-kcal"]);
        let protein = self.nutrient(&["proteins_100g", "proteins"]);
        let fat = self.nutrient(&["fat_100g", "fat"]);
        let carbs = self.nutrient(&["carbohydrates_100g", "carbohydrates"]);
        let name = [self.product_name, self.product_name_ja]
            .into_iter()
            .flatten()
            .map(|n| n.trim().to_string())
            .find(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());
        NutritionFacts {
            name,
            calories,
            protein,
            fat,
            carbs,
            source: FactsSource::OpenFoodFacts,
        }
    }
}

/// Client for the public Open Food Facts product API.
pub struct OpenFoodFactsClient {
    http_client: Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    /// # Errors
    /// Returns `LookupError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("omnitrack/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl NutritionSource for OpenFoodFactsClient {
    fn lookup(&self, barcode: &str) -> Result<Option<NutritionFacts>, LookupError> {
        let url = format!("{}/api/v0/product/{barcode}.json", self.base_url);
        debug!(%url, "requesting product");
        let response = self.http_client.get(&url).send()?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status()));
        }
        let body: ProductResponse = response.json()?;
        match body.product {
            Some(product) if body.status == 1 => Ok(Some(product.into_facts())),
            _ => Ok(None),
        }
    }
}

/// The user's own food dictionary, keyed by barcode.
pub struct DictionarySource<'a> {
    conn: &'a rusqlite::Connection,
    user_id: i64,
}

impl<'a> DictionarySource<'a> {
    #[must_use]
    pub const fn new(conn: &'a rusqlite::Connection, user_id: i64) -> Self {
        Self { conn, user_id }
    }
}

impl NutritionSource for DictionarySource<'_> {
    fn lookup(&self, barcode: &str) -> Result<Option<NutritionFacts>, LookupError> {
        let entry = db::get_food_by_keyword(self.conn, self.user_id, barcode)
            .map_err(|e| LookupError::Source(e.to_string()))?;
        Ok(entry.map(|entry| NutritionFacts {
            name: entry.description.unwrap_or(entry.keyword),
            calories: entry.calories as f64,
            protein: entry.protein,
            fat: entry.fat,
            carbs: entry.carbs,
            source: FactsSource::Dictionary,
        }))
    }
}

fn validate_barcode(barcode: &str) -> Result<&str, LookupError> {
    let trimmed = barcode.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(LookupError::InvalidBarcode(barcode.to_string()));
    }
    Ok(trimmed)
}

/// Tries `primary`, then `fallback`.
///
/// When neither source knows the barcode the result is `LookupError::NotFound`.
/// If the primary source failed and the fallback could not answer, the
/// primary's error is returned so the caller can offer a retry.
/// # Errors
/// See above; also `LookupError::InvalidBarcode` for non-numeric input.
pub fn lookup_with_fallback(
    primary: &dyn NutritionSource,
    fallback: Option<&dyn NutritionSource>,
    barcode: &str,
) -> Result<NutritionFacts, LookupError> {
    let barcode = validate_barcode(barcode)?;
    let primary_error = match primary.lookup(barcode) {
        Ok(Some(facts)) => {
            info!(barcode, name = %facts.name, "product found");
            return Ok(facts);
        }
        Ok(None) => None,
        Err(e) => {
            warn!(barcode, error = %e, "primary nutrition lookup failed");
            Some(e)
        }
    };

    if let Some(fallback) = fallback {
        info!(barcode, "product not found, trying fallback source");
        match fallback.lookup(barcode) {
            Ok(Some(facts)) => return Ok(facts),
            Ok(None) => {}
            Err(e) => warn!(barcode, error = %e, "fallback nutrition lookup failed"),
        }
    }

    Err(primary_error.unwrap_or_else(|| LookupError::NotFound(barcode.to_string())))
}

/// Meal slot for a local hour of day.
#[must_use]
pub const fn meal_type_for_hour(hour: u32) -> MealType {
    match hour {
        5..=10 => MealType::Breakfast,
        11..=15 => MealType::Lunch,
        16..=21 => MealType::Dinner,
        _ => MealType::Snack,
    }
}
