use anyhow::Result;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use omnitrack_lib::db::{self, DbError, UserRole};
use omnitrack_lib::food_lookup::{lookup_with_fallback, DictionarySource, FactsSource};
use omnitrack_lib::seed::{seed_preset_exercises, PRESET_EXERCISES};
use omnitrack_lib::{BodyPart, EquipmentType, Gender, LookupError, MealType, NutritionFacts, NutritionSource, WorkoutSet};
use rusqlite::Connection;

// Helper function to create an initialized in-memory database with one user
fn create_test_db() -> Result<(Connection, i64)> {
    let conn = Connection::open_in_memory()?;
    db::init_db(&conn)?;
    let user_id = db::upsert_user(
        &conn,
        &db::NewUser {
            open_id: "user-1",
            name: Some("Test User"),
            ..Default::default()
        },
    )?;
    Ok((conn, user_id))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn add_exercise(conn: &Connection, name: &str, created_by: Option<i64>) -> Result<i64> {
    Ok(db::create_exercise(
        conn,
        &db::NewExercise {
            name,
            part: BodyPart::Chest,
            equipment_type: EquipmentType::Barbell,
            is_preset: created_by.is_none(),
            created_by,
            description: None,
        },
    )?)
}

#[test]
fn test_init_db_is_idempotent() -> Result<()> {
    let (conn, _) = create_test_db()?;
    db::init_db(&conn)?;
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(tables, 10);
    Ok(())
}

#[test]
fn test_upsert_user_keeps_id_and_fields() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    let again = db::upsert_user(
        &conn,
        &db::NewUser {
            open_id: "user-1",
            email: Some("test@example.com"),
            role: Some(UserRole::Admin),
            ..Default::default()
        },
    )?;
    assert_eq!(again, user_id);

    let user = db::get_user_by_open_id(&conn, "user-1")?.expect("user exists");
    assert_eq!(user.name.as_deref(), Some("Test User"));
    assert_eq!(user.email.as_deref(), Some("test@example.com"));
    assert_eq!(user.role, UserRole::Admin);
    assert!(db::get_user_by_open_id(&conn, "nobody")?.is_none());
    Ok(())
}

#[test]
fn test_user_profile_crud() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    assert!(db::get_user_profile(&conn, user_id)?.is_none());

    db::create_user_profile(
        &conn,
        user_id,
        &db::ProfileFields {
            height: Some(180.0),
            weight: Some(80.0),
            age: Some(35),
            gender: Some(Gender::Male),
            ..Default::default()
        },
    )?;
    let profile = db::get_user_profile(&conn, user_id)?.expect("profile exists");
    assert_eq!(profile.default_interval_seconds, 90);
    assert_eq!(profile.gender, Some(Gender::Male));
    assert_eq!(profile.target_calories, None);

    db::update_user_profile(
        &conn,
        user_id,
        db::ProfileFields {
            weight: Some(78.5),
            target_calories: Some(2200),
            ..Default::default()
        },
    )?;
    let profile = db::get_user_profile(&conn, user_id)?.expect("profile exists");
    assert_eq!(profile.weight, Some(78.5));
    assert_eq!(profile.height, Some(180.0));
    assert_eq!(profile.target_calories, Some(2200));

    // A second profile for the same user violates the unique constraint
    assert!(matches!(
        db::create_user_profile(&conn, user_id, &db::ProfileFields::default()),
        Err(DbError::InsertFailed(_))
    ));
    assert!(matches!(
        db::update_user_profile(&conn, user_id, db::ProfileFields::default()),
        Err(DbError::NothingToUpdate { .. })
    ));
    assert!(matches!(
        db::update_user_profile(&conn, 999, db::ProfileFields::default()),
        Err(DbError::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_exercise_visibility_and_updates() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    let other = db::upsert_user(
        &conn,
        &db::NewUser {
            open_id: "user-2",
            ..Default::default()
        },
    )?;
    let preset = add_exercise(&conn, "Bench Press", None)?;
    let mine = add_exercise(&conn, "Spoto Press", Some(user_id))?;
    add_exercise(&conn, "Floor Press", Some(other))?;

    assert_eq!(db::get_all_exercises(&conn, None)?.len(), 1);
    let visible = db::get_all_exercises(&conn, Some(user_id))?;
    let ids: Vec<i64> = visible.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![preset, mine]);
    assert!(db::get_exercises_by_part(&conn, BodyPart::Back, Some(user_id))?.is_empty());

    db::update_exercise(
        &conn,
        mine,
        db::ExerciseUpdate {
            part: Some(BodyPart::Arms),
            description: Some("Paused bench".to_string()),
            ..Default::default()
        },
    )?;
    let updated = db::get_exercise_by_id(&conn, mine)?.expect("exercise exists");
    assert_eq!(updated.part, BodyPart::Arms);
    assert_eq!(updated.name, "Spoto Press");
    assert_eq!(updated.description.as_deref(), Some("Paused bench"));
    assert!(!updated.is_preset);

    assert_eq!(db::delete_exercise(&conn, mine)?, 1);
    assert!(matches!(
        db::delete_exercise(&conn, mine),
        Err(DbError::NotFound {
            table: "exercises",
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_workout_log_sets_round_trip_through_json() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    let exercise_id = add_exercise(&conn, "Bench Press", None)?;
    let sets = vec![
        WorkoutSet {
            id: "s1".to_string(),
            weight: 100.0,
            reps: 5,
            completed: true,
        },
        WorkoutSet {
            id: "s2".to_string(),
            weight: 100.0,
            reps: 3,
            completed: false,
        },
    ];
    let id = db::create_workout_log(
        &conn,
        &db::NewWorkoutLog {
            user_id,
            exercise_id,
            date: date(2024, 2, 10),
            sets: &sets,
            total_volume: Some(500.0),
            estimated_1rm: Some(117.0),
            notes: None,
        },
    )?;

    let log = db::get_workout_log_by_id(&conn, id)?.expect("log exists");
    assert_eq!(log.sets, sets);
    assert_eq!(log.total_volume, Some(500.0));

    let in_range =
        db::get_workout_logs_by_date_range(&conn, user_id, date(2024, 2, 1), date(2024, 2, 29))?;
    assert_eq!(in_range.len(), 1);
    assert!(
        db::get_workout_logs_by_date_range(&conn, user_id, date(2024, 3, 1), date(2024, 3, 31))?
            .is_empty()
    );

    db::update_workout_log(
        &conn,
        id,
        db::WorkoutLogUpdate {
            notes: Some("felt strong".to_string()),
            ..Default::default()
        },
    )?;
    let log = db::get_workout_log_by_id(&conn, id)?.expect("log exists");
    assert_eq!(log.notes.as_deref(), Some("felt strong"));
    assert_eq!(log.sets.len(), 2);

    assert_eq!(db::delete_workout_log(&conn, id)?, 1);
    assert!(db::get_workout_log_by_id(&conn, id)?.is_none());
    Ok(())
}

#[test]
fn test_cardio_log_crud() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    let exercise_id = add_exercise(&conn, "Treadmill", None)?;
    let id = db::create_cardio_log(
        &conn,
        &db::NewCardioLog {
            user_id,
            exercise_id,
            date: date(2024, 2, 10),
            duration_minutes: Some(30),
            distance_km: Some(5.2),
            calories_burned: Some(300),
            notes: None,
        },
    )?;
    db::update_cardio_log(
        &conn,
        id,
        db::CardioLogUpdate {
            duration_minutes: Some(35),
            ..Default::default()
        },
    )?;
    let logs = db::get_cardio_logs_by_date_range(&conn, user_id, date(2024, 2, 10), date(2024, 2, 10))?;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].duration_minutes, Some(35));
    assert_eq!(logs[0].distance_km, Some(5.2));

    assert!(matches!(
        db::update_cardio_log(&conn, id, db::CardioLogUpdate::default()),
        Err(DbError::NothingToUpdate { .. })
    ));
    assert_eq!(db::delete_cardio_log(&conn, id)?, 1);
    Ok(())
}

#[test]
fn test_diet_log_totals() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    let items = vec![
        db::FoodItem {
            name: "Rice".to_string(),
            calories: 252.4,
            protein: 3.8,
            fat: 0.5,
            carbs: 55.7,
        },
        db::FoodItem {
            name: "Salmon".to_string(),
            calories: 208.0,
            protein: 20.0,
            fat: 13.0,
            carbs: 0.0,
        },
    ];
    let id = db::create_diet_log(&conn, user_id, date(2024, 2, 10), MealType::Dinner, &items, None)?;

    let logs = db::get_diet_logs_by_date_range(&conn, user_id, date(2024, 2, 10), date(2024, 2, 10))?;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].total_calories, 460);
    assert!((logs[0].total_protein - 23.8).abs() < 1e-9);
    assert_eq!(logs[0].items.len(), 2);
    assert_eq!(logs[0].meal_type, MealType::Dinner);

    db::update_diet_log(&conn, id, Some(MealType::Lunch), None)?;
    let logs = db::get_diet_logs_by_date_range(&conn, user_id, date(2024, 2, 10), date(2024, 2, 10))?;
    assert_eq!(logs[0].meal_type, MealType::Lunch);

    assert_eq!(db::delete_diet_log(&conn, id)?, 1);
    assert!(matches!(
        db::delete_diet_log(&conn, id),
        Err(DbError::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_gym_check_in_and_out() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    let gym = db::create_gym_location(&conn, user_id, "Iron Temple", 35.68, 139.76, None)?;
    let locations = db::get_gym_locations(&conn, user_id)?;
    assert_eq!(locations[0].radius_meters, 100);

    db::update_gym_location(&conn, gym, None, None, Some(250))?;
    assert_eq!(db::get_gym_locations(&conn, user_id)?[0].radius_meters, 250);

    let arrived = Utc.with_ymd_and_hms(2024, 2, 10, 18, 0, 0).unwrap();
    let first = db::create_gym_check_in(&conn, user_id, gym, arrived)?;
    let second = db::create_gym_check_in(&conn, user_id, gym, arrived + Duration::days(1))?;
    db::record_gym_check_out(&conn, first, arrived + Duration::minutes(75))?;

    let logs = db::get_gym_check_in_logs(&conn, user_id, 10)?;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].id, second);
    assert_eq!(logs[0].check_out_time, None);
    assert_eq!(logs[1].duration_minutes, Some(75));
    assert_eq!(db::get_gym_check_in_logs(&conn, user_id, 1)?.len(), 1);

    assert!(matches!(
        db::record_gym_check_out(&conn, 999, arrived),
        Err(DbError::NotFound { .. })
    ));

    // Deleting the location cascades to its check-ins
    db::delete_gym_location(&conn, gym)?;
    assert!(db::get_gym_check_in_logs(&conn, user_id, 10)?.is_empty());
    Ok(())
}

#[test]
fn test_personal_record_rows() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    let exercise_id = add_exercise(&conn, "Squat", None)?;
    assert!(db::get_personal_record_by_exercise(&conn, user_id, exercise_id)?.is_none());

    let id = db::create_personal_record(&conn, user_id, exercise_id, 140.0, date(2024, 1, 5))?;
    db::update_personal_record(&conn, id, 150.0, date(2024, 2, 5))?;
    let pr = db::get_personal_record_by_exercise(&conn, user_id, exercise_id)?.expect("record");
    assert_eq!(pr.best_1rm, 150.0);
    assert_eq!(pr.achieved_date, date(2024, 2, 5));
    Ok(())
}

#[test]
fn test_seed_presets_once() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    let inserted = seed_preset_exercises(&conn)?;
    assert_eq!(inserted, PRESET_EXERCISES.len());
    assert_eq!(inserted, 36);
    assert_eq!(seed_preset_exercises(&conn)?, 0);

    let all = db::get_all_exercises(&conn, Some(user_id))?;
    assert_eq!(all.len(), 36);
    assert!(all.iter().all(|e| e.is_preset && e.created_by.is_none()));
    let legs = db::get_exercises_by_part(&conn, BodyPart::Legs, None)?;
    assert_eq!(legs.len(), 6);
    Ok(())
}

#[test]
fn test_food_dictionary_as_lookup_fallback() -> Result<()> {
    let (conn, user_id) = create_test_db()?;
    let entry_id = db::create_food_entry(
        &conn,
        &db::NewFoodEntry {
            user_id,
            keyword: "4901234567890",
            calories: 120,
            protein: 4.0,
            fat: 2.5,
            carbs: 20.0,
            description: Some("Homemade granola"),
        },
    )?;
    db::create_food_entry(
        &conn,
        &db::NewFoodEntry {
            user_id,
            keyword: "Natto",
            calories: 90,
            protein: 7.4,
            fat: 4.5,
            carbs: 5.4,
            description: None,
        },
    )?;
    assert_eq!(db::get_food_dictionary(&conn, user_id)?.len(), 2);
    assert!(db::get_food_by_keyword(&conn, user_id, "natto")?.is_some());

    struct Offline;
    impl NutritionSource for Offline {
        fn lookup(&self, _barcode: &str) -> Result<Option<NutritionFacts>, LookupError> {
            Ok(None)
        }
    }

    let dictionary = DictionarySource::new(&conn, user_id);
    let facts = lookup_with_fallback(
        &Offline,
        Some(&dictionary as &dyn NutritionSource),
        "4901234567890",
    )?;
    assert_eq!(facts.name, "Homemade granola");
    assert_eq!(facts.calories, 120.0);
    assert_eq!(facts.source, FactsSource::Dictionary);

    db::update_food_entry(
        &conn,
        entry_id,
        db::FoodEntryUpdate {
            calories: Some(130),
            ..Default::default()
        },
    )?;
    assert_eq!(
        dictionary.lookup("4901234567890")?.map(|f| f.calories),
        Some(130.0)
    );
    db::delete_food_entry(&conn, entry_id)?;
    assert!(dictionary.lookup("4901234567890")?.is_none());
    Ok(())
}
