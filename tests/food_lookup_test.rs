use anyhow::Result;
use chrono::{NaiveDate, Utc};
use omnitrack_lib::food_lookup::{
    lookup_with_fallback, meal_type_for_hour, FactsSource, OpenFoodFactsClient,
};
use omnitrack_lib::{LookupError, MealType, NutritionFacts, NutritionSource};
use std::time::Duration;

fn client(server: &mockito::Server) -> Result<OpenFoodFactsClient> {
    Ok(OpenFoodFactsClient::new(&server.url(), Duration::from_secs(5))?)
}

/// Fixed answer for fallback tests.
struct StaticSource(Option<NutritionFacts>);

impl NutritionSource for StaticSource {
    fn lookup(&self, _barcode: &str) -> Result<Option<NutritionFacts>, LookupError> {
        Ok(self.0.clone())
    }
}

fn oat_bar() -> NutritionFacts {
    NutritionFacts {
        name: "Oat bar".to_string(),
        calories: 410.0,
        protein: 9.0,
        fat: 14.0,
        carbs: 60.0,
        source: FactsSource::Dictionary,
    }
}

#[test]
fn test_lookup_parses_product() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v0/product/4901234567890.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "status": 1,
                "product": {
                    "product_name": "  ",
                    "product_name_ja": "Green Tea",
                    "nutriments": {
                        "energy-kcal_100g": 0,
                        "energy-kcal": "2",
                        "proteins_100g": 0.1,
                        "fat_100g": 0,
                        "carbohydrates_100g": 0.3
                    }
                }
            }"#,
        )
        .create();

    let facts = client(&server)?
        .lookup("4901234567890")?
        .expect("product should be found");
    mock.assert();

    assert_eq!(facts.name, "Green Tea");
    assert_eq!(facts.calories, 2.0);
    assert_eq!(facts.protein, 0.1);
    assert_eq!(facts.fat, 0.0);
    assert_eq!(facts.carbs, 0.3);
    assert_eq!(facts.source, FactsSource::OpenFoodFacts);
    Ok(())
}

#[test]
fn test_lookup_missing_product() -> Result<()> {
    let mut server = mockito::Server::new();
    let _unknown = server
        .mock("GET", "/api/v0/product/111.json")
        .with_status(200)
        .with_body(r#"{"status": 0, "status_verbose": "product not found"}"#)
        .create();
    let _gone = server
        .mock("GET", "/api/v0/product/222.json")
        .with_status(404)
        .create();

    let client = client(&server)?;
    assert!(client.lookup("111")?.is_none());
    assert!(client.lookup("222")?.is_none());

    let err = lookup_with_fallback(&client, None, "111").unwrap_err();
    assert!(matches!(err, LookupError::NotFound(ref code) if code == "111"));
    Ok(())
}

#[test]
fn test_lookup_server_error_is_reported() -> Result<()> {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/api/v0/product/333.json")
        .with_status(503)
        .create();

    let client = client(&server)?;
    assert!(matches!(
        client.lookup("333"),
        Err(LookupError::Status(status)) if status.as_u16() == 503
    ));

    // Fallback has nothing either, so the primary failure surfaces
    let empty = StaticSource(None);
    assert!(matches!(
        lookup_with_fallback(&client, Some(&empty as &dyn NutritionSource), "333"),
        Err(LookupError::Status(_))
    ));
    Ok(())
}

#[test]
fn test_fallback_answers_when_primary_misses() -> Result<()> {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/api/v0/product/444.json")
        .with_status(404)
        .create();

    let fallback = StaticSource(Some(oat_bar()));
    let facts = lookup_with_fallback(&client(&server)?, Some(&fallback as &dyn NutritionSource), " 444 ")?;
    assert_eq!(facts.name, "Oat bar");
    assert_eq!(facts.source, FactsSource::Dictionary);
    Ok(())
}

#[test]
fn test_invalid_barcode_skips_network() {
    let primary = StaticSource(Some(oat_bar()));
    for bad in ["", "   ", "12a45", "../etc"] {
        assert!(matches!(
            lookup_with_fallback(&primary, None, bad),
            Err(LookupError::InvalidBarcode(_))
        ));
    }
}

#[test]
fn test_facts_into_calorie_log() {
    let now = Utc::now();
    let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let log = oat_bar().into_calorie_log(day, MealType::Snack, now);
    assert_eq!(log.food_name, "Oat bar");
    assert_eq!(log.calories, 410.0);
    assert_eq!(log.protein, Some(9.0));
    assert_eq!(log.meal_type, MealType::Snack);
    assert_eq!(log.created_at, now);
    assert!(!log.id.is_empty());
}

#[test]
fn test_meal_type_for_hour() {
    assert_eq!(meal_type_for_hour(4), MealType::Snack);
    assert_eq!(meal_type_for_hour(5), MealType::Breakfast);
    assert_eq!(meal_type_for_hour(10), MealType::Breakfast);
    assert_eq!(meal_type_for_hour(11), MealType::Lunch);
    assert_eq!(meal_type_for_hour(15), MealType::Lunch);
    assert_eq!(meal_type_for_hour(16), MealType::Dinner);
    assert_eq!(meal_type_for_hour(21), MealType::Dinner);
    assert_eq!(meal_type_for_hour(23), MealType::Snack);
}
