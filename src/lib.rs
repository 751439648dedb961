use anyhow::{bail, Context, Result};
// Use anyhow::Result as standard Result for service layer
use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// --- Declare modules ---
pub mod calendar;
mod config;
pub mod db;
pub mod food_lookup;
pub mod geofence;
pub mod logging;
pub mod metrics;
pub mod records;
pub mod seed;
pub mod storage;
pub mod store;
pub mod timer;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Config, ConfigError, FoodLookupConfig, StandardColor, Theme, Units,
};
pub use db::DbError;
pub use food_lookup::{LookupError, NutritionFacts, NutritionSource};
pub use metrics::{BmrFormula, MacroTargets, MetricsError, OneRepMaxFormula, RmPercentage};
pub use records::{
    ActivityLevel, BodyPart, BodyRecord, CalorieLog, CardioKind, CardioLog, CheckInRecord,
    CheckInType, CustomExercise, CustomExerciseUpdate, EquipmentType, Gender, Goal, GymLocation,
    MealType, PersonalRecord, PfcMode, TimerSettings, UserSettings, WorkoutLog, WorkoutSet,
};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageError};
pub use store::{RecordStore, StoreError};

pub const KM_TO_MILE: f64 = 0.621_371;
pub const KG_TO_LB: f64 = 2.204_62;
/// Body fat recorded with new settings when no earlier value exists.
pub const DEFAULT_BODY_FAT_PERCENTAGE: f64 = 15.0;

/// Converts a stored metric weight for display.
#[must_use]
pub fn display_weight(kg: f64, units: Units) -> f64 {
    match units {
        Units::Metric => kg,
        Units::Imperial => kg * KG_TO_LB,
    }
}

/// Converts a stored metric distance for display.
#[must_use]
pub fn display_distance(km: f64, units: Units) -> f64 {
    match units {
        Units::Metric => km,
        Units::Imperial => km * KM_TO_MILE,
    }
}

/// One set as entered on the session screen. Weight is in kilograms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetInput {
    pub weight: f64,
    pub reps: u32,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct LogWorkoutParams<'a> {
    pub date: NaiveDate,
    pub exercise_id: i64,
    pub exercise_name: &'a str,
    pub equipment_type: EquipmentType,
    pub body_part: &'a str,
    pub sets: Vec<SetInput>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LogCardioParams {
    pub date: NaiveDate,
    pub kind: CardioKind,
    pub duration_minutes: f64,
    pub distance_km: f64,
    /// Estimated from `kind` and duration when absent.
    pub calories: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LogMealParams {
    pub date: Option<NaiveDate>,
    /// Derived from the local hour when absent.
    pub meal_type: Option<MealType>,
    pub food_name: String,
    pub calories: f64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct BodyMetricsParams {
    pub date: NaiveDate,
    pub height: f64,
    pub weight: f64,
    pub body_fat_percentage: f64,
    pub age: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
}

#[derive(Debug, Clone)]
pub struct UserSettingsParams {
    pub date: NaiveDate,
    pub age: u32,
    pub gender: Gender,
    pub height: f64,
    pub weight: f64,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub pfc_mode: PfcMode,
    pub interval_timer_duration: u32,
    /// Required for `PfcMode::Manual`, ignored otherwise.
    pub manual_macros: Option<MacroTargets>,
    /// Carried over from the latest body record when absent.
    pub body_fat_percentage: Option<f64>,
}

/// Intake against expenditure for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub intake: f64,
    pub burned: f64,
    pub balance: f64,
    pub target_calories: Option<f64>,
    pub workouts: usize,
    pub cardio_minutes: f64,
}

fn require_finite_positive(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{field} must be a positive number, got {value}");
    }
    Ok(value)
}

fn require_finite_non_negative(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        bail!("{field} must be zero or more, got {value}");
    }
    Ok(value)
}

pub struct AppService {
    pub config: Config,
    pub store: RecordStore,
    pub config_path: PathBuf,
    pub data_path: PathBuf,
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/store path determination, loading, or opening fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let data_path = storage::get_store_path(config.data_dir.as_deref())
            .context("Failed to determine record store path")?;
        let backend = SqliteStore::open(&data_path)
            .with_context(|| format!("Failed to open record store at {data_path:?}"))?;

        Ok(Self {
            config,
            store: RecordStore::new(Arc::new(backend)),
            config_path,
            data_path,
        })
    }

    /// Builds a service around an existing store, without touching the filesystem.
    #[must_use]
    pub fn with_store(config: Config, store: RecordStore) -> Self {
        Self {
            config,
            store,
            config_path: PathBuf::new(),
            data_path: PathBuf::from(":memory:"),
        }
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_data_path(&self) -> &Path {
        &self.data_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets the measurement units used for display.
    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_units(&mut self, units: Units) -> Result<(), ConfigError> {
        self.config.units = units;
        self.save_config()
    }

    // --- Strength ---

    /// Saves a finished exercise and updates its personal record.
    ///
    /// Returns the stored log and whether it set a new personal record.
    /// # Errors
    /// - `anyhow::Error` if there are no sets, a weight is not a positive number,
    ///   reps are zero, or no set was completed.
    /// - `anyhow::Error` wrapping `StoreError` if the store cannot be updated.
    pub fn log_workout(&self, params: LogWorkoutParams) -> Result<(WorkoutLog, bool)> {
        let name = params.exercise_name.trim();
        if name.is_empty() {
            bail!("Exercise name cannot be empty.");
        }
        if params.sets.is_empty() {
            bail!("A workout needs at least one set.");
        }
        for (i, set) in params.sets.iter().enumerate() {
            require_finite_positive(&format!("Set {} weight", i + 1), set.weight)?;
            if set.reps == 0 {
                bail!("Set {} needs at least one rep.", i + 1);
            }
        }

        let sets: Vec<WorkoutSet> = params
            .sets
            .iter()
            .map(|s| WorkoutSet {
                id: records::new_record_id(),
                weight: s.weight,
                reps: s.reps,
                completed: s.completed,
            })
            .collect();
        let Some(best) = metrics::best_set(&sets) else {
            bail!("Complete at least one set before saving.");
        };

        let log = WorkoutLog {
            id: records::new_record_id(),
            date: params.date,
            exercise_id: params.exercise_id,
            exercise_name: name.to_string(),
            equipment_type: params.equipment_type,
            body_part: params.body_part.to_string(),
            total_volume: metrics::total_volume(&sets),
            estimated_1rm: best.one_rep_max,
            sets,
            notes: params.notes.filter(|n| !n.trim().is_empty()),
            created_at: Utc::now(),
        };
        self.store
            .save_workout_log(&log)
            .context("Failed to save workout log")?;

        let new_record = self
            .store
            .update_personal_record(PersonalRecord {
                exercise_id: log.exercise_id,
                exercise_name: log.exercise_name.clone(),
                best_1rm: best.one_rep_max,
                weight: best.weight,
                reps: best.reps,
                date: log.date,
            })
            .context("Failed to update personal record")?;
        if new_record {
            tracing::info!(exercise = %log.exercise_name, one_rm = best.one_rep_max, "new personal record");
        }
        Ok((log, new_record))
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the delete cannot be applied.
    pub fn delete_workout(&self, id: &str) -> Result<bool> {
        self.store
            .delete_workout_log(id)
            .with_context(|| format!("Failed to delete workout log {id}"))
    }

    /// Estimated 1RM and the training-load table for a set.
    /// # Errors
    /// Returns `anyhow::Error` if the set is outside the formula's domain.
    pub fn calculate_rm(
        &self,
        weight: f64,
        reps: u32,
        formula: OneRepMaxFormula,
    ) -> Result<(f64, Vec<RmPercentage>)> {
        let Some(one_rm) = metrics::estimate_one_rep_max(formula, weight, reps) else {
            bail!("Cannot estimate a 1RM for {weight} kg x {reps} with the {formula} formula.");
        };
        let one_rm = metrics::round_to(one_rm, 1);
        Ok((one_rm, metrics::one_rep_max_percentages(one_rm)))
    }

    /// Adds a user-defined exercise.
    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or the store cannot be updated.
    pub fn add_custom_exercise(
        &self,
        name: &str,
        body_part: &str,
        equipment_type: EquipmentType,
    ) -> Result<CustomExercise> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Exercise name cannot be empty.");
        }
        let exercise = CustomExercise {
            id: records::new_record_id(),
            name: name.to_string(),
            body_part: body_part.trim().to_lowercase(),
            equipment_type,
            created_at: Utc::now(),
        };
        self.store
            .save_custom_exercise(&exercise)
            .context("Failed to save custom exercise")?;
        Ok(exercise)
    }

    // --- Cardio ---

    /// # Errors
    /// Returns `anyhow::Error` for non-positive durations, negative distances,
    /// or if the store cannot be updated.
    pub fn log_cardio(&self, params: LogCardioParams) -> Result<CardioLog> {
        let duration = require_finite_positive("Duration", params.duration_minutes)?;
        let distance = require_finite_non_negative("Distance", params.distance_km)?;
        let calories = match params.calories {
            Some(c) => require_finite_non_negative("Calories", c)?,
            None => metrics::estimate_cardio_calories(params.kind, duration),
        };
        let log = CardioLog {
            id: records::new_record_id(),
            date: params.date,
            exercise_type: params.kind.to_string(),
            duration,
            distance,
            calories,
            notes: params.notes.filter(|n| !n.trim().is_empty()),
            created_at: Utc::now(),
        };
        self.store
            .save_cardio_log(&log)
            .context("Failed to save cardio log")?;
        Ok(log)
    }

    // --- Nutrition ---

    /// # Errors
    /// Returns `anyhow::Error` if the food name is empty, a value is negative,
    /// or the store cannot be updated.
    pub fn log_meal(&self, params: LogMealParams) -> Result<CalorieLog> {
        let food_name = params.food_name.trim();
        if food_name.is_empty() {
            bail!("Food name cannot be empty.");
        }
        let calories = require_finite_non_negative("Calories", params.calories)?;
        for (field, value) in [
            ("Protein", params.protein),
            ("Carbohydrate", params.carbs),
            ("Fat", params.fat),
        ] {
            if let Some(v) = value {
                require_finite_non_negative(field, v)?;
            }
        }
        let now = Local::now();
        let log = CalorieLog {
            id: records::new_record_id(),
            date: params.date.unwrap_or_else(|| now.date_naive()),
            meal_type: params
                .meal_type
                .unwrap_or_else(|| food_lookup::meal_type_for_hour(now.hour())),
            food_name: food_name.to_string(),
            calories,
            protein: params.protein,
            carbs: params.carbs,
            fat: params.fat,
            created_at: now.with_timezone(&Utc),
        };
        self.store
            .save_calorie_log(&log)
            .context("Failed to save meal")?;
        Ok(log)
    }

    /// Looks a barcode up in Open Food Facts, then in `fallback`.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `LookupError` when no source has the product.
    pub fn lookup_food(
        &self,
        barcode: &str,
        fallback: Option<&dyn NutritionSource>,
    ) -> Result<NutritionFacts> {
        let client = food_lookup::OpenFoodFactsClient::new(
            &self.config.food_lookup.base_url,
            Duration::from_secs(self.config.food_lookup.timeout_secs),
        )
        .context("Failed to build food lookup client")?;
        food_lookup::lookup_with_fallback(&client, fallback, barcode)
            .with_context(|| format!("Food lookup failed for barcode {barcode}"))
    }

    // --- Body ---

    /// # Errors
    /// Returns `anyhow::Error` for non-positive or NaN measurements, a body fat
    /// percentage outside 0-100, age 0, or if the store cannot be updated.
    pub fn record_body_metrics(&self, params: BodyMetricsParams) -> Result<BodyRecord> {
        let height = require_finite_positive("Height", params.height)?;
        let weight = require_finite_positive("Weight", params.weight)?;
        let body_fat = params.body_fat_percentage;
        if !body_fat.is_finite() || !(0.0..=100.0).contains(&body_fat) {
            bail!("Body fat percentage must be between 0 and 100, got {body_fat}");
        }
        if params.age == 0 {
            bail!("Age must be at least 1 year.");
        }
        let record = BodyRecord {
            id: records::new_record_id(),
            date: params.date,
            height,
            weight,
            body_fat_percentage: body_fat,
            age: params.age,
            gender: params.gender,
            activity_level: params.activity_level,
            created_at: Utc::now(),
        };
        self.store
            .save_body_record(&record)
            .context("Failed to save body record")?;
        Ok(record)
    }

    /// Recomputes energy and macro targets from the profile, stores the
    /// settings, then appends a matching body record and the timer default.
    /// Body fat falls back to the latest record, then to 15 %.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `MetricsError` for invalid inputs, or
    /// `StoreError` if anything cannot be saved.
    pub fn update_user_settings(&self, params: UserSettingsParams) -> Result<UserSettings> {
        if params.interval_timer_duration == 0 {
            bail!("Interval timer duration must be at least 1 second.");
        }
        let bmr = metrics::bmr(params.weight, params.height, params.age, params.gender)?;
        let tdee = metrics::tdee(bmr, params.activity_level);
        let target_calories = metrics::target_calories(tdee, params.goal).round();
        let macros = metrics::macro_targets(
            target_calories,
            params.weight,
            params.pfc_mode,
            params.manual_macros,
        )?;

        let settings = UserSettings {
            age: params.age,
            gender: params.gender,
            height: params.height,
            weight: params.weight,
            activity_level: params.activity_level,
            goal: params.goal,
            pfc_mode: params.pfc_mode,
            interval_timer_duration: params.interval_timer_duration,
            bmr: bmr.round(),
            tdee: tdee.round(),
            target_calories,
            target_protein: macros.protein,
            target_fat: macros.fat,
            target_carbs: macros.carbs,
        };
        self.store
            .save_user_settings(&settings)
            .context("Failed to save user settings")?;

        let body_fat = params.body_fat_percentage.unwrap_or_else(|| {
            self.store
                .get_latest_body_record()
                .map(|r| r.body_fat_percentage)
                .filter(|bf| *bf > 0.0)
                .unwrap_or(DEFAULT_BODY_FAT_PERCENTAGE)
        });
        self.record_body_metrics(BodyMetricsParams {
            date: params.date,
            height: params.height,
            weight: params.weight,
            body_fat_percentage: body_fat,
            age: params.age,
            gender: params.gender,
            activity_level: params.activity_level,
        })?;
        self.store
            .save_timer_settings(TimerSettings {
                default_duration: params.interval_timer_duration,
            })
            .context("Failed to save timer settings")?;
        Ok(settings)
    }

    /// # Errors
    /// Returns `anyhow::Error` for a zero duration or if the store cannot be updated.
    pub fn set_timer_duration(&self, seconds: u32) -> Result<()> {
        if seconds == 0 {
            bail!("Timer duration must be at least 1 second.");
        }
        self.store
            .save_timer_settings(TimerSettings {
                default_duration: seconds,
            })
            .context("Failed to save timer settings")
    }

    // --- Gym ---

    /// # Errors
    /// Returns `anyhow::Error` for out-of-range coordinates, a non-positive
    /// radius, or if the store cannot be updated.
    pub fn set_gym_location(&self, location: GymLocation) -> Result<()> {
        if !location.is_valid() {
            bail!(
                "Invalid gym location '{}' ({}, {}) with radius {} m.",
                location.name,
                location.latitude,
                location.longitude,
                location.radius
            );
        }
        self.store
            .save_gym_location(&location)
            .context("Failed to save gym location")
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the check-in cannot be saved.
    pub fn handle_geofence_event(
        &self,
        event: geofence::GeofenceEvent,
        at: DateTime<Utc>,
    ) -> Result<Option<CheckInRecord>> {
        geofence::handle_geofence_event(&self.store, event, at)
            .context("Failed to record geofence event")
    }

    // --- Summaries ---

    #[must_use]
    pub fn daily_summary(&self, date: NaiveDate) -> DailySummary {
        let intake = self.store.get_total_calories_by_date(date);
        let burned = self.store.get_total_burned_calories_by_date(date).round();
        DailySummary {
            date,
            intake,
            burned,
            balance: intake - burned,
            target_calories: self.store.get_user_settings().map(|s| s.target_calories),
            workouts: self.store.get_workout_logs_by_date(date).len(),
            cardio_minutes: self
                .store
                .get_cardio_logs_by_date(date)
                .iter()
                .map(|c| c.duration)
                .sum(),
        }
    }
}
