// src/records.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

fn default_body_part() -> String {
    "other".to_string()
}

/// Generates a fresh record id.
#[must_use]
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Goal {
    LoseWeight,
    Maintain,
    GainMuscle,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PfcMode {
    PresetCut,
    PresetBulk,
    PresetMaintain,
    Manual,
}

/// Equipment of an exercise. Values outside the known set are kept verbatim
/// in `Other`, so a legacy document keeps them when it is rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EquipmentType {
    Barbell,
    Dumbbell,
    Machine,
    Bodyweight,
    Other(String),
}

impl EquipmentType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Barbell => "barbell",
            Self::Dumbbell => "dumbbell",
            Self::Machine => "machine",
            Self::Bodyweight => "bodyweight",
            Self::Other(raw) => raw,
        }
    }

    fn from_known(raw: &str) -> Option<Self> {
        [Self::Barbell, Self::Dumbbell, Self::Machine, Self::Bodyweight]
            .into_iter()
            .find(|known| known.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the four known kinds and `other`; anything else is rejected so
/// typos on the command line do not become new equipment kinds.
impl FromStr for EquipmentType {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(known) = Self::from_known(trimmed) {
            return Ok(known);
        }
        if trimmed.eq_ignore_ascii_case("other") {
            return Ok(Self::Other("other".to_string()));
        }
        Err(strum::ParseError::VariantNotFound)
    }
}

impl Serialize for EquipmentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EquipmentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match Self::from_known(&raw) {
            Some(known) if known.as_str() == raw => Ok(known),
            _ => Ok(Self::Other(raw)),
        }
    }
}

/// Body parts of the exercise master list.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BodyPart {
    Chest,
    Back,
    Legs,
    Shoulders,
    Arms,
    Abs,
    Cardio,
}

/// Cardio activities offered by the session screen.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CardioKind {
    Running,
    Cycling,
    Swimming,
    Walking,
    Rowing,
    JumpRope,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum CheckInType {
    #[serde(rename = "check-in")]
    #[strum(serialize = "check-in")]
    CheckIn,
    #[serde(rename = "check-out")]
    #[strum(serialize = "check-out")]
    CheckOut,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    pub id: String,
    pub weight: f64,
    pub reps: u32,
    pub completed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLog {
    pub id: String,
    pub date: NaiveDate,
    pub exercise_id: i64,
    pub exercise_name: String,
    pub equipment_type: EquipmentType,
    #[serde(default = "default_body_part")]
    pub body_part: String,
    pub sets: Vec<WorkoutSet>,
    pub total_volume: f64,
    #[serde(rename = "estimated1RM")]
    pub estimated_1rm: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardioLog {
    pub id: String,
    pub date: NaiveDate,
    pub exercise_type: String,
    /// Minutes.
    pub duration: f64,
    /// Kilometres.
    pub distance: f64,
    pub calories: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalorieLog {
    pub id: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub food_name: String,
    pub calories: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyRecord {
    pub id: String,
    pub date: NaiveDate,
    /// Centimetres.
    pub height: f64,
    /// Kilograms.
    pub weight: f64,
    pub body_fat_percentage: f64,
    pub age: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Best estimated 1RM for one exercise. At most one per `exercise_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalRecord {
    pub exercise_id: i64,
    pub exercise_name: String,
    #[serde(rename = "best1RM")]
    pub best_1rm: f64,
    pub weight: f64,
    pub reps: u32,
    pub date: NaiveDate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomExercise {
    pub id: String,
    pub name: String,
    pub body_part: String,
    pub equipment_type: EquipmentType,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Partial update for a custom exercise; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CustomExerciseUpdate {
    pub name: Option<String>,
    pub body_part: Option<String>,
    pub equipment_type: Option<EquipmentType>,
}

pub const DEFAULT_TIMER_SECONDS: u32 = 90;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    /// Seconds.
    pub default_duration: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            default_duration: DEFAULT_TIMER_SECONDS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GymLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Metres.
    pub radius: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CheckInType,
    pub timestamp: DateTime<Utc>,
    pub gym_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub age: u32,
    pub gender: Gender,
    pub height: f64,
    pub weight: f64,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub pfc_mode: PfcMode,
    pub interval_timer_duration: u32,
    pub bmr: f64,
    pub tdee: f64,
    pub target_calories: f64,
    pub target_protein: f64,
    pub target_fat: f64,
    pub target_carbs: f64,
}
