// src/store.rs
//! Local record store.
//!
//! Every collection is one JSON document under a fixed key, wrapped in a
//! `{"version": N, "data": ...}` envelope. Documents written by the legacy
//! app carry no envelope and are read as version 1, then migrated.
//!
//! Reads used for display swallow failures and return an empty/default value.
//! Mutations read strictly, so a document that fails to parse is never
//! overwritten, and run under a per-collection lock.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::metrics;
use crate::records::{
    BodyRecord, CalorieLog, CardioLog, CheckInRecord, CustomExercise, CustomExerciseUpdate,
    GymLocation, PersonalRecord, TimerSettings, UserSettings, WorkoutLog,
};
use crate::storage::{KeyValueStore, StorageError};

/// Envelope version written by this crate.
pub const CURRENT_VERSION: u32 = 2;
const LEGACY_VERSION: u32 = 1;

/// Rough energy cost of one strength set, in kcal.
pub const KCAL_PER_STRENGTH_SET: f64 = 5.0;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Malformed document under '{key}': {source}")]
    Malformed {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("Document under '{key}' has version {found}, newer than supported version {supported}")]
    UnsupportedVersion {
        key: &'static str,
        found: u32,
        supported: u32,
    },
    #[error("Migration of '{key}' failed: {reason}")]
    Migration { key: &'static str, reason: String },
    #[error("Collection lock poisoned: {0}")]
    Poisoned(&'static str),
}

type Migration = fn(u32, Value) -> Result<Value, StoreError>;

#[derive(Clone, Copy)]
struct Slot {
    key: &'static str,
    migrate: Migration,
}

const WORKOUT_LOGS: Slot = Slot {
    key: "@omnitrack_workout_logs",
    migrate: migrate_workout_logs,
};
const CARDIO_LOGS: Slot = Slot {
    key: "@omnitrack_cardio_logs",
    migrate: migrate_cardio_logs,
};
const CALORIE_LOGS: Slot = Slot {
    key: "@omnitrack_calorie_logs",
    migrate: no_migration,
};
const BODY_RECORDS: Slot = Slot {
    key: "@omnitrack_body_records",
    migrate: no_migration,
};
const PERSONAL_RECORDS: Slot = Slot {
    key: "@omnitrack_personal_records",
    migrate: migrate_personal_records,
};
const CUSTOM_EXERCISES: Slot = Slot {
    key: "@omnitrack_custom_exercises",
    migrate: no_migration,
};
const TIMER_SETTINGS: Slot = Slot {
    key: "@omnitrack_timer_settings",
    migrate: no_migration,
};
const GYM_LOCATION: Slot = Slot {
    key: "@omnitrack_gym_location",
    migrate: no_migration,
};
const CHECK_IN_HISTORY: Slot = Slot {
    key: "@omnitrack_check_in_history",
    migrate: no_migration,
};
const USER_SETTINGS: Slot = Slot {
    key: "@omnitrack_user_settings",
    migrate: no_migration,
};

const ALL_SLOTS: [Slot; 10] = [
    WORKOUT_LOGS,
    CARDIO_LOGS,
    CALORIE_LOGS,
    BODY_RECORDS,
    PERSONAL_RECORDS,
    CUSTOM_EXERCISES,
    TIMER_SETTINGS,
    GYM_LOCATION,
    CHECK_IN_HISTORY,
    USER_SETTINGS,
];

/// Keys of every collection the store owns.
#[must_use]
pub fn collection_keys() -> Vec<&'static str> {
    ALL_SLOTS.iter().map(|slot| slot.key).collect()
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: Value,
}

fn no_migration(_from: u32, data: Value) -> Result<Value, StoreError> {
    Ok(data)
}

/// Fills `field` with `default` on every object of a legacy array.
fn fill_missing(data: Value, field: &str, default: &Value) -> Value {
    match data {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|mut item| {
                    if let Value::Object(ref mut obj) = item {
                        obj.entry(field.to_string())
                            .or_insert_with(|| default.clone());
                    }
                    item
                })
                .collect(),
        ),
        other => other,
    }
}

fn migrate_workout_logs(from: u32, data: Value) -> Result<Value, StoreError> {
    if from >= CURRENT_VERSION {
        return Ok(data);
    }
    let data = fill_missing(data, "bodyPart", &Value::String("other".into()));
    Ok(fill_missing(data, "notes", &Value::Null))
}

fn migrate_cardio_logs(from: u32, data: Value) -> Result<Value, StoreError> {
    if from >= CURRENT_VERSION {
        return Ok(data);
    }
    Ok(fill_missing(data, "notes", &Value::Null))
}

/// Version 1 stored personal records as `{"<exerciseId>": record}`.
fn migrate_personal_records(from: u32, data: Value) -> Result<Value, StoreError> {
    if from >= CURRENT_VERSION {
        return Ok(data);
    }
    match data {
        Value::Object(map) => Ok(Value::Array(map.into_iter().map(|(_, v)| v).collect())),
        Value::Array(items) => Ok(Value::Array(items)),
        other => Err(StoreError::Migration {
            key: PERSONAL_RECORDS.key,
            reason: format!("expected an object or array, found {other}"),
        }),
    }
}

/// Per-collection write serialization point.
struct LockTable {
    locks: HashMap<&'static str, Mutex<()>>,
}

impl LockTable {
    fn new() -> Self {
        Self {
            locks: ALL_SLOTS
                .iter()
                .map(|slot| (slot.key, Mutex::new(())))
                .collect(),
        }
    }

    fn acquire(&self, key: &'static str) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.locks
            .get(key)
            .ok_or(StoreError::Poisoned(key))?
            .lock()
            .map_err(|_| StoreError::Poisoned(key))
    }
}

/// One point of a per-exercise 1RM history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneRepMaxPoint {
    pub date: NaiveDate,
    pub rm: f64,
    pub weight: f64,
    pub reps: u32,
}

pub struct RecordStore {
    backend: Arc<dyn KeyValueStore>,
    locks: LockTable,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            locks: LockTable::new(),
        }
    }

    // --- Document plumbing ---

    fn read_strict<T: DeserializeOwned>(&self, slot: Slot) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(slot.key)? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
            key: slot.key,
            source,
        })?;
        let (version, data) = split_envelope(value);
        if version > CURRENT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                key: slot.key,
                found: version,
                supported: CURRENT_VERSION,
            });
        }
        if data.is_null() {
            return Ok(None);
        }
        let data = if version < CURRENT_VERSION {
            debug!(key = slot.key, from = version, "migrating document");
            (slot.migrate)(version, data)?
        } else {
            data
        };
        serde_json::from_value(data)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                key: slot.key,
                source,
            })
    }

    fn read_lenient<T: DeserializeOwned + Default>(&self, slot: Slot) -> T {
        match self.read_strict(slot) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(key = slot.key, error = %e, "failed to read collection, using default");
                T::default()
            }
        }
    }

    fn write<T: Serialize>(&self, slot: Slot, data: &T) -> Result<(), StoreError> {
        let envelope = EnvelopeRef {
            version: CURRENT_VERSION,
            data,
        };
        let raw = serde_json::to_string(&envelope).map_err(|source| StoreError::Malformed {
            key: slot.key,
            source,
        })?;
        self.backend.set(slot.key, &raw).map_err(|e| {
            error!(key = slot.key, error = %e, "failed to write collection");
            StoreError::from(e)
        })
    }

    /// Read-modify-write of one collection under its lock.
    fn modify<T, R, F>(&self, slot: Slot, f: F) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> (R, bool),
    {
        let _guard = self.locks.acquire(slot.key)?;
        let mut items: Vec<T> = self.read_strict(slot)?.unwrap_or_default();
        let (result, changed) = f(&mut items);
        if changed {
            self.write(slot, &items)?;
        }
        Ok(result)
    }

    fn append<T: Serialize + DeserializeOwned>(&self, slot: Slot, record: T) -> Result<(), StoreError> {
        self.modify(slot, |items: &mut Vec<T>| {
            items.push(record);
            ((), true)
        })
    }

    fn remove_where<T, P>(&self, slot: Slot, predicate: P) -> Result<bool, StoreError>
    where
        T: Serialize + DeserializeOwned,
        P: Fn(&T) -> bool,
    {
        self.modify(slot, |items: &mut Vec<T>| {
            let before = items.len();
            items.retain(|item| !predicate(item));
            let removed = items.len() != before;
            (removed, removed)
        })
    }

    // --- Workout logs ---

    /// Appends a workout log.
    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn save_workout_log(&self, log: &WorkoutLog) -> Result<(), StoreError> {
        self.append(WORKOUT_LOGS, log.clone())
    }

    pub fn get_workout_logs(&self) -> Vec<WorkoutLog> {
        self.read_lenient(WORKOUT_LOGS)
    }

    pub fn get_workout_logs_by_date(&self, date: NaiveDate) -> Vec<WorkoutLog> {
        self.get_workout_logs()
            .into_iter()
            .filter(|log| log.date == date)
            .collect()
    }

    /// Logs with `start <= date <= end`.
    pub fn get_workout_logs_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<WorkoutLog> {
        self.get_workout_logs()
            .into_iter()
            .filter(|log| log.date >= start && log.date <= end)
            .collect()
    }

    /// Deletes a workout log. Returns `false` if no log had this id.
    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn delete_workout_log(&self, id: &str) -> Result<bool, StoreError> {
        self.remove_where(WORKOUT_LOGS, |log: &WorkoutLog| log.id == id)
    }

    pub fn get_total_volume_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> f64 {
        self.get_workout_logs_by_date_range(start, end)
            .iter()
            .map(|log| log.total_volume)
            .sum()
    }

    /// Number of distinct days with at least one workout log.
    pub fn get_workout_days_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> usize {
        self.get_workout_logs_by_date_range(start, end)
            .iter()
            .map(|log| log.date)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Estimated 1RM per session for one exercise, oldest first.
    pub fn get_one_rep_max_history(&self, exercise_id: i64) -> Vec<OneRepMaxPoint> {
        let mut history: Vec<OneRepMaxPoint> = self
            .get_workout_logs()
            .into_iter()
            .filter(|log| log.exercise_id == exercise_id)
            .map(|log| {
                let best = metrics::best_set(&log.sets);
                OneRepMaxPoint {
                    date: log.date,
                    rm: log.estimated_1rm,
                    weight: best.as_ref().map_or(0.0, |b| b.weight),
                    reps: best.as_ref().map_or(0, |b| b.reps),
                }
            })
            .collect();
        history.sort_by_key(|point| point.date);
        history
    }

    // --- Personal records ---

    pub fn get_personal_records(&self) -> BTreeMap<i64, PersonalRecord> {
        let records: Vec<PersonalRecord> = self.read_lenient(PERSONAL_RECORDS);
        records
            .into_iter()
            .map(|record| (record.exercise_id, record))
            .collect()
    }

    /// Stores `candidate` if it beats the current best for its exercise.
    /// Returns `true` only when the store was changed.
    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn update_personal_record(&self, candidate: PersonalRecord) -> Result<bool, StoreError> {
        self.modify(PERSONAL_RECORDS, |records: &mut Vec<PersonalRecord>| {
            match records
                .iter()
                .position(|r| r.exercise_id == candidate.exercise_id)
            {
                Some(i) if candidate.best_1rm > records[i].best_1rm => {
                    records[i] = candidate;
                    (true, true)
                }
                Some(_) => (false, false),
                None => {
                    records.push(candidate);
                    (true, true)
                }
            }
        })
    }

    // --- Cardio logs ---

    /// Appends a cardio log.
    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn save_cardio_log(&self, log: &CardioLog) -> Result<(), StoreError> {
        self.append(CARDIO_LOGS, log.clone())
    }

    pub fn get_cardio_logs(&self) -> Vec<CardioLog> {
        self.read_lenient(CARDIO_LOGS)
    }

    pub fn get_cardio_logs_by_date(&self, date: NaiveDate) -> Vec<CardioLog> {
        self.get_cardio_logs()
            .into_iter()
            .filter(|log| log.date == date)
            .collect()
    }

    pub fn get_cardio_logs_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<CardioLog> {
        self.get_cardio_logs()
            .into_iter()
            .filter(|log| log.date >= start && log.date <= end)
            .collect()
    }

    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn delete_cardio_log(&self, id: &str) -> Result<bool, StoreError> {
        self.remove_where(CARDIO_LOGS, |log: &CardioLog| log.id == id)
    }

    // --- Calorie logs ---

    /// Appends a calorie log.
    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn save_calorie_log(&self, log: &CalorieLog) -> Result<(), StoreError> {
        self.append(CALORIE_LOGS, log.clone())
    }

    pub fn get_calorie_logs(&self) -> Vec<CalorieLog> {
        self.read_lenient(CALORIE_LOGS)
    }

    pub fn get_calorie_logs_by_date(&self, date: NaiveDate) -> Vec<CalorieLog> {
        self.get_calorie_logs()
            .into_iter()
            .filter(|log| log.date == date)
            .collect()
    }

    pub fn get_calorie_logs_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<CalorieLog> {
        self.get_calorie_logs()
            .into_iter()
            .filter(|log| log.date >= start && log.date <= end)
            .collect()
    }

    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn delete_calorie_log(&self, id: &str) -> Result<bool, StoreError> {
        self.remove_where(CALORIE_LOGS, |log: &CalorieLog| log.id == id)
    }

    pub fn get_total_calories_by_date(&self, date: NaiveDate) -> f64 {
        self.get_calorie_logs_by_date(date)
            .iter()
            .map(|log| log.calories)
            .sum()
    }

    /// TDEE from the latest body record, plus cardio calories and a flat
    /// per-set estimate for strength work. Zero without a body record.
    pub fn get_total_burned_calories_by_date(&self, date: NaiveDate) -> f64 {
        let Some(body) = self.get_latest_body_record() else {
            return 0.0;
        };
        let tdee = match metrics::bmr(body.weight, body.height, body.age, body.gender) {
            Ok(bmr) => metrics::tdee(bmr, body.activity_level),
            Err(e) => {
                warn!(error = %e, record = %body.id, "latest body record is not usable");
                return 0.0;
            }
        };
        let cardio: f64 = self
            .get_cardio_logs_by_date(date)
            .iter()
            .map(|log| log.calories)
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let strength: f64 = self
            .get_workout_logs_by_date(date)
            .iter()
            .map(|log| log.sets.len() as f64 * KCAL_PER_STRENGTH_SET)
            .sum();
        tdee + cardio + strength
    }

    // --- Body records ---

    /// Appends a body record.
    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn save_body_record(&self, record: &BodyRecord) -> Result<(), StoreError> {
        self.append(BODY_RECORDS, record.clone())
    }

    pub fn get_body_records(&self) -> Vec<BodyRecord> {
        self.read_lenient(BODY_RECORDS)
    }

    pub fn get_body_records_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<BodyRecord> {
        self.get_body_records()
            .into_iter()
            .filter(|r| r.date >= start && r.date <= end)
            .collect()
    }

    /// Most recently created body record.
    pub fn get_latest_body_record(&self) -> Option<BodyRecord> {
        self.get_body_records()
            .into_iter()
            .max_by_key(|r| r.created_at)
    }

    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn delete_body_record(&self, id: &str) -> Result<bool, StoreError> {
        self.remove_where(BODY_RECORDS, |r: &BodyRecord| r.id == id)
    }

    // --- Custom exercises ---

    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn save_custom_exercise(&self, exercise: &CustomExercise) -> Result<(), StoreError> {
        self.append(CUSTOM_EXERCISES, exercise.clone())
    }

    pub fn get_custom_exercises(&self) -> Vec<CustomExercise> {
        self.read_lenient(CUSTOM_EXERCISES)
    }

    pub fn get_custom_exercises_by_body_part(&self, body_part: &str) -> Vec<CustomExercise> {
        self.get_custom_exercises()
            .into_iter()
            .filter(|ex| ex.body_part.eq_ignore_ascii_case(body_part))
            .collect()
    }

    /// Applies `update` to the exercise with `id`. Returns `false` if none matched.
    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn update_custom_exercise(
        &self,
        id: &str,
        update: CustomExerciseUpdate,
    ) -> Result<bool, StoreError> {
        self.modify(CUSTOM_EXERCISES, |items: &mut Vec<CustomExercise>| {
            let Some(ex) = items.iter_mut().find(|ex| ex.id == id) else {
                return (false, false);
            };
            if let Some(name) = update.name {
                ex.name = name;
            }
            if let Some(part) = update.body_part {
                ex.body_part = part;
            }
            if let Some(equipment) = update.equipment_type {
                ex.equipment_type = equipment;
            }
            (true, true)
        })
    }

    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn delete_custom_exercise(&self, id: &str) -> Result<bool, StoreError> {
        self.remove_where(CUSTOM_EXERCISES, |ex: &CustomExercise| ex.id == id)
    }

    // --- Singletons ---

    pub fn get_timer_settings(&self) -> TimerSettings {
        self.read_lenient(TIMER_SETTINGS)
    }

    /// # Errors
    /// Returns `StoreError` if the settings cannot be written.
    pub fn save_timer_settings(&self, settings: TimerSettings) -> Result<(), StoreError> {
        let _guard = self.locks.acquire(TIMER_SETTINGS.key)?;
        self.write(TIMER_SETTINGS, &settings)
    }

    pub fn get_gym_location(&self) -> Option<GymLocation> {
        self.read_lenient(GYM_LOCATION)
    }

    /// # Errors
    /// Returns `StoreError` if the location cannot be written.
    pub fn save_gym_location(&self, location: &GymLocation) -> Result<(), StoreError> {
        let _guard = self.locks.acquire(GYM_LOCATION.key)?;
        self.write(GYM_LOCATION, location)
    }

    /// # Errors
    /// Returns `StoreError` if the backend fails to remove the key.
    pub fn clear_gym_location(&self) -> Result<(), StoreError> {
        let _guard = self.locks.acquire(GYM_LOCATION.key)?;
        self.backend.remove(GYM_LOCATION.key).map_err(Into::into)
    }

    pub fn get_user_settings(&self) -> Option<UserSettings> {
        self.read_lenient(USER_SETTINGS)
    }

    /// # Errors
    /// Returns `StoreError` if the settings cannot be written.
    pub fn save_user_settings(&self, settings: &UserSettings) -> Result<(), StoreError> {
        let _guard = self.locks.acquire(USER_SETTINGS.key)?;
        self.write(USER_SETTINGS, settings)
    }

    // --- Check-in history ---

    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn save_check_in(&self, record: &CheckInRecord) -> Result<(), StoreError> {
        self.append(CHECK_IN_HISTORY, record.clone())
    }

    /// Check-ins, newest first.
    pub fn get_check_in_history(&self, limit: Option<usize>) -> Vec<CheckInRecord> {
        let mut history: Vec<CheckInRecord> = self.read_lenient(CHECK_IN_HISTORY);
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            history.truncate(limit);
        }
        history
    }

    /// # Errors
    /// Returns `StoreError` if the collection cannot be read or written.
    pub fn delete_check_in(&self, id: &str) -> Result<bool, StoreError> {
        self.remove_where(CHECK_IN_HISTORY, |r: &CheckInRecord| r.id == id)
    }

    // --- Maintenance ---

    /// Removes every collection. Intended for debugging.
    /// # Errors
    /// Returns `StoreError` on the first key that cannot be removed.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        for slot in ALL_SLOTS {
            let _guard = self.locks.acquire(slot.key)?;
            self.backend.remove(slot.key)?;
        }
        Ok(())
    }

    /// Version each stored collection was written with; `None` for absent keys.
    /// # Errors
    /// Returns `StoreError` if a document cannot be read or parsed.
    pub fn stored_versions(&self) -> Result<Vec<(&'static str, Option<u32>)>, StoreError> {
        let mut out = Vec::with_capacity(ALL_SLOTS.len());
        for slot in ALL_SLOTS {
            let version = match self.backend.get(slot.key)? {
                Some(raw) => {
                    let value: Value =
                        serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                            key: slot.key,
                            source,
                        })?;
                    Some(split_envelope(value).0)
                }
                None => None,
            };
            out.push((slot.key, version));
        }
        Ok(out)
    }
}

fn split_envelope(value: Value) -> (u32, Value) {
    if is_envelope(&value) {
        if let Ok(env) = serde_json::from_value::<Envelope>(value.clone()) {
            return (env.version, env.data);
        }
    }
    (LEGACY_VERSION, value)
}

fn is_envelope(value: &Value) -> bool {
    matches!(value, Value::Object(obj) if has_only_envelope_keys(obj))
}

fn has_only_envelope_keys(obj: &Map<String, Value>) -> bool {
    obj.len() == 2 && obj.contains_key("version") && obj.contains_key("data")
}
