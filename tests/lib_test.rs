use anyhow::Result;
use chrono::NaiveDate;
use omnitrack_lib::geofence::GeofenceEvent;
use omnitrack_lib::{
    ActivityLevel, AppService, BodyMetricsParams, CardioKind, CheckInType, Config, EquipmentType,
    Gender, Goal, GymLocation, KeyValueStore, LogCardioParams, LogMealParams, LogWorkoutParams,
    MacroTargets, MealType, MemoryStore, OneRepMaxFormula, PfcMode, RecordStore, SetInput,
    StorageError, Units, UserSettingsParams, DEFAULT_BODY_FAT_PERCENTAGE,
};
use std::io;
use std::sync::Arc;

// Helper function to create a test service over an in-memory store
fn create_test_service() -> AppService {
    let config = Config {
        units: Units::Metric,
        ..Default::default()
    };
    AppService::with_store(config, RecordStore::new(Arc::new(MemoryStore::new())))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn set(weight: f64, reps: u32) -> SetInput {
    SetInput {
        weight,
        reps,
        completed: true,
    }
}

fn bench(day: NaiveDate, sets: Vec<SetInput>) -> LogWorkoutParams<'static> {
    LogWorkoutParams {
        date: day,
        exercise_id: 1,
        exercise_name: "Bench Press",
        equipment_type: EquipmentType::Barbell,
        body_part: "chest",
        sets,
        notes: None,
    }
}

#[test]
fn test_log_workout_computes_volume_and_record() -> Result<()> {
    let service = create_test_service();

    let (log, new_record) = service.log_workout(bench(date(2024, 5, 1), vec![set(100.0, 8)]))?;
    assert_eq!(log.total_volume, 800.0);
    assert_eq!(log.estimated_1rm, 127.0);
    assert!(new_record);

    let prs = service.store.get_personal_records();
    let pr = prs.get(&1).expect("bench PR should exist");
    assert_eq!(pr.best_1rm, 127.0);
    assert_eq!(pr.weight, 100.0);
    assert_eq!(pr.reps, 8);

    // A heavier single beats it
    let (_, new_record) = service.log_workout(bench(date(2024, 5, 3), vec![set(130.0, 1)]))?;
    assert!(new_record);
    assert_eq!(service.store.get_personal_records()[&1].best_1rm, 130.0);

    // A lighter session does not
    let (_, new_record) = service.log_workout(bench(date(2024, 5, 5), vec![set(80.0, 5)]))?;
    assert!(!new_record);
    assert_eq!(service.store.get_personal_records()[&1].date, date(2024, 5, 3));

    Ok(())
}

#[test]
fn test_log_workout_ignores_skipped_sets() -> Result<()> {
    let service = create_test_service();
    let sets = vec![
        set(60.0, 10),
        SetInput {
            weight: 200.0,
            reps: 5,
            completed: false,
        },
    ];
    let (log, _) = service.log_workout(bench(date(2024, 5, 1), sets))?;
    assert_eq!(log.total_volume, 600.0);
    assert_eq!(log.estimated_1rm, 80.0);
    assert_eq!(log.sets.len(), 2);
    Ok(())
}

#[test]
fn test_log_workout_validation() {
    let service = create_test_service();
    assert!(service.log_workout(bench(date(2024, 5, 1), vec![])).is_err());
    assert!(service
        .log_workout(bench(date(2024, 5, 1), vec![set(f64::NAN, 5)]))
        .is_err());
    assert!(service
        .log_workout(bench(date(2024, 5, 1), vec![set(-20.0, 5)]))
        .is_err());
    assert!(service
        .log_workout(bench(date(2024, 5, 1), vec![set(100.0, 0)]))
        .is_err());
    let all_skipped = vec![SetInput {
        weight: 100.0,
        reps: 5,
        completed: false,
    }];
    assert!(service
        .log_workout(bench(date(2024, 5, 1), all_skipped))
        .is_err());
    assert!(service.store.get_workout_logs().is_empty());
}

#[test]
fn test_delete_workout_is_idempotent() -> Result<()> {
    let service = create_test_service();
    let (log, _) = service.log_workout(bench(date(2024, 5, 1), vec![set(100.0, 5)]))?;
    assert!(service.delete_workout(&log.id)?);
    assert!(!service.delete_workout(&log.id)?);
    assert!(service.store.get_workout_logs_by_date(date(2024, 5, 1)).is_empty());
    Ok(())
}

#[test]
fn test_log_cardio_estimates_calories() -> Result<()> {
    let service = create_test_service();
    let log = service.log_cardio(LogCardioParams {
        date: date(2024, 5, 1),
        kind: CardioKind::Running,
        duration_minutes: 30.0,
        distance_km: 5.0,
        calories: None,
        notes: Some("  ".to_string()),
    })?;
    assert_eq!(log.calories, 300.0);
    assert_eq!(log.exercise_type, "running");
    assert_eq!(log.notes, None);

    let explicit = service.log_cardio(LogCardioParams {
        date: date(2024, 5, 1),
        kind: CardioKind::Cycling,
        duration_minutes: 20.0,
        distance_km: 8.0,
        calories: Some(250.0),
        notes: None,
    })?;
    assert_eq!(explicit.calories, 250.0);

    assert!(service
        .log_cardio(LogCardioParams {
            date: date(2024, 5, 1),
            kind: CardioKind::Walking,
            duration_minutes: 0.0,
            distance_km: 1.0,
            calories: None,
            notes: None,
        })
        .is_err());
    Ok(())
}

#[test]
fn test_log_meal_validation_and_totals() -> Result<()> {
    let service = create_test_service();
    let day = date(2024, 5, 1);
    service.log_meal(LogMealParams {
        date: Some(day),
        meal_type: Some(MealType::Breakfast),
        food_name: "Oatmeal".to_string(),
        calories: 350.0,
        protein: Some(12.0),
        ..Default::default()
    })?;
    service.log_meal(LogMealParams {
        date: Some(day),
        meal_type: Some(MealType::Lunch),
        food_name: "Chicken rice".to_string(),
        calories: 650.0,
        ..Default::default()
    })?;
    assert_eq!(service.store.get_total_calories_by_date(day), 1000.0);

    assert!(service
        .log_meal(LogMealParams {
            food_name: "   ".to_string(),
            calories: 100.0,
            ..Default::default()
        })
        .is_err());
    assert!(service
        .log_meal(LogMealParams {
            food_name: "Bad".to_string(),
            calories: f64::NAN,
            ..Default::default()
        })
        .is_err());
    Ok(())
}

#[test]
fn test_record_body_metrics_rejects_nan() {
    let service = create_test_service();
    let params = BodyMetricsParams {
        date: date(2024, 5, 1),
        height: 175.0,
        weight: f64::NAN,
        body_fat_percentage: 15.0,
        age: 30,
        gender: Gender::Male,
        activity_level: ActivityLevel::Moderate,
    };
    assert!(service.record_body_metrics(params.clone()).is_err());
    assert!(service
        .record_body_metrics(BodyMetricsParams {
            weight: 70.0,
            body_fat_percentage: 120.0,
            ..params.clone()
        })
        .is_err());
    assert!(service
        .record_body_metrics(BodyMetricsParams {
            weight: 70.0,
            ..params
        })
        .is_ok());
    assert_eq!(service.store.get_body_records().len(), 1);
}

#[test]
fn test_update_user_settings_computes_targets() -> Result<()> {
    let service = create_test_service();
    let settings = service.update_user_settings(UserSettingsParams {
        date: date(2024, 5, 1),
        age: 30,
        gender: Gender::Male,
        height: 175.0,
        weight: 70.0,
        activity_level: ActivityLevel::Moderate,
        goal: Goal::LoseWeight,
        pfc_mode: PfcMode::PresetCut,
        interval_timer_duration: 120,
        manual_macros: None,
        body_fat_percentage: Some(18.0),
    })?;

    // Revised Harris-Benedict: 88.362 + 13.397*70 + 4.799*175 - 5.677*30
    assert_eq!(settings.bmr, 1696.0);
    assert_eq!(settings.tdee, 2628.0);
    assert_eq!(settings.target_calories, 2128.0);
    assert_eq!(settings.target_protein, 154.0);
    assert_eq!(settings.target_fat, 47.0);
    assert!(settings.target_carbs > 0.0);

    assert_eq!(service.store.get_user_settings(), Some(settings));
    assert_eq!(service.store.get_timer_settings().default_duration, 120);
    let body = service
        .store
        .get_latest_body_record()
        .expect("settings append a body record");
    assert_eq!(body.weight, 70.0);
    assert_eq!(body.body_fat_percentage, 18.0);
    Ok(())
}

fn settings_params(body_fat_percentage: Option<f64>) -> UserSettingsParams {
    UserSettingsParams {
        date: date(2024, 5, 1),
        age: 30,
        gender: Gender::Male,
        height: 175.0,
        weight: 70.0,
        activity_level: ActivityLevel::Moderate,
        goal: Goal::Maintain,
        pfc_mode: PfcMode::PresetMaintain,
        interval_timer_duration: 90,
        manual_macros: None,
        body_fat_percentage,
    }
}

/// Memory store whose writes to one key always fail.
struct RejectingStore {
    inner: MemoryStore,
    rejected_key: &'static str,
}

impl KeyValueStore for RejectingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == self.rejected_key {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.inner.keys()
    }
}

#[test]
fn test_update_user_settings_body_fat_fallback() -> Result<()> {
    let service = create_test_service();

    // No earlier body record
    service.update_user_settings(settings_params(None))?;
    let first = service.store.get_latest_body_record().expect("body record");
    assert_eq!(first.body_fat_percentage, DEFAULT_BODY_FAT_PERCENTAGE);
    assert_eq!(first.body_fat_percentage, 15.0);

    // Carried forward from the latest record
    service.update_user_settings(settings_params(Some(21.5)))?;
    service.update_user_settings(settings_params(None))?;
    let records = service.store.get_body_records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].body_fat_percentage, 21.5);
    Ok(())
}

#[test]
fn test_failed_settings_write_leaves_no_body_record() {
    let backend = RejectingStore {
        inner: MemoryStore::new(),
        rejected_key: "@omnitrack_user_settings",
    };
    let service = AppService::with_store(Config::default(), RecordStore::new(Arc::new(backend)));

    assert!(service.update_user_settings(settings_params(Some(18.0))).is_err());
    assert!(service.store.get_body_records().is_empty());
    assert!(service.store.get_user_settings().is_none());
    assert_eq!(service.store.get_timer_settings().default_duration, 90);
}

#[test]
fn test_update_user_settings_manual_macros() -> Result<()> {
    let service = create_test_service();
    let mut params = UserSettingsParams {
        date: date(2024, 5, 1),
        age: 28,
        gender: Gender::Female,
        height: 162.0,
        weight: 55.0,
        activity_level: ActivityLevel::Light,
        goal: Goal::Maintain,
        pfc_mode: PfcMode::Manual,
        interval_timer_duration: 90,
        manual_macros: None,
        body_fat_percentage: None,
    };
    assert!(service.update_user_settings(params.clone()).is_err());

    params.manual_macros = Some(MacroTargets {
        protein: 100.0,
        fat: 50.0,
        carbs: 200.0,
    });
    let settings = service.update_user_settings(params)?;
    assert_eq!(settings.target_protein, 100.0);
    assert_eq!(settings.target_fat, 50.0);
    assert_eq!(settings.target_carbs, 200.0);
    Ok(())
}

#[test]
fn test_daily_summary() -> Result<()> {
    let service = create_test_service();
    let day = date(2024, 5, 1);

    let empty = service.daily_summary(day);
    assert_eq!(empty.intake, 0.0);
    assert_eq!(empty.burned, 0.0);

    service.record_body_metrics(BodyMetricsParams {
        date: day,
        height: 175.0,
        weight: 70.0,
        body_fat_percentage: 15.0,
        age: 30,
        gender: Gender::Male,
        activity_level: ActivityLevel::Sedentary,
    })?;
    service.log_workout(bench(day, vec![set(100.0, 8), set(100.0, 8)]))?;
    service.log_cardio(LogCardioParams {
        date: day,
        kind: CardioKind::Walking,
        duration_minutes: 25.0,
        distance_km: 2.0,
        calories: None,
        notes: None,
    })?;
    service.log_meal(LogMealParams {
        date: Some(day),
        meal_type: Some(MealType::Dinner),
        food_name: "Steak".to_string(),
        calories: 800.0,
        ..Default::default()
    })?;

    let summary = service.daily_summary(day);
    // BMR 1695.667 * 1.2 + 100 kcal walking + 2 sets * 5 kcal
    assert_eq!(summary.burned, 2145.0);
    assert_eq!(summary.intake, 800.0);
    assert_eq!(summary.balance, -1345.0);
    assert_eq!(summary.workouts, 1);
    assert_eq!(summary.cardio_minutes, 25.0);
    Ok(())
}

#[test]
fn test_calculate_rm() -> Result<()> {
    let service = create_test_service();
    let (epley, table) = service.calculate_rm(100.0, 10, OneRepMaxFormula::Epley)?;
    assert_eq!(epley, 133.3);
    assert_eq!(table.len(), 8);
    assert_eq!(table[0].percent, 95);
    assert_eq!(table[0].weight, 126.6);

    let (brzycki, _) = service.calculate_rm(100.0, 10, OneRepMaxFormula::Brzycki)?;
    assert_eq!(brzycki, 133.3);

    assert!(service.calculate_rm(100.0, 40, OneRepMaxFormula::Brzycki).is_err());
    assert!(service.calculate_rm(0.0, 5, OneRepMaxFormula::Epley).is_err());
    Ok(())
}

#[test]
fn test_custom_exercises_and_timer() -> Result<()> {
    let service = create_test_service();
    assert!(service
        .add_custom_exercise("  ", "chest", EquipmentType::Barbell)
        .is_err());
    let ex = service.add_custom_exercise("Landmine Press", " Shoulders ", EquipmentType::Barbell)?;
    assert_eq!(ex.body_part, "shoulders");
    assert_eq!(
        service.store.get_custom_exercises_by_body_part("shoulders").len(),
        1
    );

    assert_eq!(service.store.get_timer_settings().default_duration, 90);
    assert!(service.set_timer_duration(0).is_err());
    service.set_timer_duration(60)?;
    assert_eq!(service.store.get_timer_settings().default_duration, 60);
    Ok(())
}

#[test]
fn test_gym_location_and_geofence_events() -> Result<()> {
    let service = create_test_service();
    let now = chrono::Utc::now();

    // No gym configured: events are ignored
    assert!(service
        .handle_geofence_event(GeofenceEvent::Enter, now)?
        .is_none());

    assert!(service
        .set_gym_location(GymLocation {
            name: "Iron Temple".to_string(),
            latitude: 95.0,
            longitude: 0.0,
            radius: 100.0,
        })
        .is_err());

    service.set_gym_location(GymLocation {
        name: "Iron Temple".to_string(),
        latitude: 35.6812,
        longitude: 139.7671,
        radius: 100.0,
    })?;
    let checked_in = service
        .handle_geofence_event(GeofenceEvent::Enter, now)?
        .expect("gym configured");
    assert_eq!(checked_in.kind, CheckInType::CheckIn);
    service.handle_geofence_event(GeofenceEvent::Exit, now + chrono::Duration::hours(1))?;

    let history = service.store.get_check_in_history(None);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, CheckInType::CheckOut);
    assert_eq!(history[1].gym_name, "Iron Temple");
    Ok(())
}
