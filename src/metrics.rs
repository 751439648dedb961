// src/metrics.rs
//! Derived fitness metrics.
//!
//! This is the only place these formulas live. Each metric has one canonical
//! entry point (`one_rep_max`, `bmr`); the alternative formulas are exposed
//! through an explicit formula selector so callers never mix them by accident.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::records::{ActivityLevel, CardioKind, Gender, Goal, PfcMode, WorkoutSet};

/// Brzycki divides by `37 - reps`; past this it is meaningless.
pub const BRZYCKI_MAX_REPS: u32 = 36;

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("Age must be at least 1 year")]
    InvalidAge,
    #[error("Manual PFC mode requires explicit protein, fat and carbohydrate targets")]
    MissingManualTargets,
}

fn require_positive(field: &'static str, value: f64) -> Result<f64, MetricsError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(MetricsError::NotPositive { field, value })
    }
}

/// Rounds to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// --- One-rep max ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OneRepMaxFormula {
    /// `weight × (1 + reps / 30)`
    #[default]
    Epley,
    /// `weight × 36 / (37 − reps)`, reps ≤ 36
    Brzycki,
}

/// Estimates a one-rep max from a sub-maximal set.
///
/// Returns `None` for non-positive or non-finite weight, zero reps, or reps
/// outside the formula's domain. A single rep is its own 1RM under both formulas.
#[must_use]
pub fn estimate_one_rep_max(formula: OneRepMaxFormula, weight: f64, reps: u32) -> Option<f64> {
    if !weight.is_finite() || weight <= 0.0 || reps == 0 {
        return None;
    }
    if reps == 1 {
        return Some(weight);
    }
    match formula {
        OneRepMaxFormula::Epley => Some(weight * (1.0 + f64::from(reps) / 30.0)),
        OneRepMaxFormula::Brzycki if reps <= BRZYCKI_MAX_REPS => {
            Some(weight * 36.0 / (37.0 - f64::from(reps)))
        }
        OneRepMaxFormula::Brzycki => None,
    }
}

/// Canonical 1RM estimate (Epley).
#[must_use]
pub fn one_rep_max(weight: f64, reps: u32) -> Option<f64> {
    estimate_one_rep_max(OneRepMaxFormula::Epley, weight, reps)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RmPercentage {
    pub percent: u32,
    pub rep_range: &'static str,
    pub weight: f64,
}

const RM_TABLE: [(u32, &str); 8] = [
    (95, "1-2"),
    (90, "3-4"),
    (85, "5-6"),
    (80, "7-8"),
    (75, "9-10"),
    (70, "11-12"),
    (65, "13-15"),
    (60, "16-20"),
];

/// Training-load table derived from a 1RM, weights rounded to 0.1.
#[must_use]
pub fn one_rep_max_percentages(one_rm: f64) -> Vec<RmPercentage> {
    RM_TABLE
        .iter()
        .map(|&(percent, rep_range)| RmPercentage {
            percent,
            rep_range,
            weight: round_to(one_rm * f64::from(percent) / 100.0, 1),
        })
        .collect()
}

/// Sum of `weight × reps` over completed sets.
#[must_use]
pub fn total_volume(sets: &[WorkoutSet]) -> f64 {
    sets.iter()
        .filter(|s| s.completed)
        .map(|s| s.weight * f64::from(s.reps))
        .sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestSet {
    pub weight: f64,
    pub reps: u32,
    /// Rounded to the nearest kilogram.
    pub one_rep_max: f64,
}

/// The completed set with the highest canonical 1RM. Earlier sets win ties.
#[must_use]
pub fn best_set(sets: &[WorkoutSet]) -> Option<BestSet> {
    sets.iter()
        .filter(|s| s.completed)
        .filter_map(|s| {
            one_rep_max(s.weight, s.reps).map(|rm| BestSet {
                weight: s.weight,
                reps: s.reps,
                one_rep_max: rm.round(),
            })
        })
        .fold(None, |best: Option<BestSet>, cand| match best {
            Some(b) if b.one_rep_max >= cand.one_rep_max => Some(b),
            _ => Some(cand),
        })
}

// --- Energy expenditure ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BmrFormula {
    /// Harris & Benedict (1918).
    HarrisBenedictOriginal,
    /// Roza & Shizgal (1984) revision of Harris-Benedict.
    #[default]
    HarrisBenedictRevised,
}

struct BmrCoefficients {
    constant: f64,
    weight: f64,
    height: f64,
    age: f64,
}

const fn coefficients(formula: BmrFormula, gender: Gender) -> BmrCoefficients {
    match (formula, gender) {
        (BmrFormula::HarrisBenedictOriginal, Gender::Male) => BmrCoefficients {
            constant: 66.47,
            weight: 13.75,
            height: 5.003,
            age: 6.755,
        },
        (BmrFormula::HarrisBenedictOriginal, Gender::Female) => BmrCoefficients {
            constant: 655.1,
            weight: 9.563,
            height: 1.85,
            age: 4.676,
        },
        (BmrFormula::HarrisBenedictRevised, Gender::Male) => BmrCoefficients {
            constant: 88.362,
            weight: 13.397,
            height: 4.799,
            age: 5.677,
        },
        (BmrFormula::HarrisBenedictRevised, Gender::Female) => BmrCoefficients {
            constant: 447.593,
            weight: 9.247,
            height: 3.098,
            age: 4.33,
        },
    }
}

/// Basal metabolic rate in kcal/day.
///
/// # Arguments
/// * `weight_kg` - Body weight in kilograms
/// * `height_cm` - Height in centimetres
/// * `age` - Age in years
///
/// # Errors
/// Returns `MetricsError` for non-positive or non-finite weight/height, or age 0.
pub fn basal_metabolic_rate(
    formula: BmrFormula,
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    gender: Gender,
) -> Result<f64, MetricsError> {
    let weight_kg = require_positive("Weight", weight_kg)?;
    let height_cm = require_positive("Height", height_cm)?;
    if age == 0 {
        return Err(MetricsError::InvalidAge);
    }
    let c = coefficients(formula, gender);
    Ok(c.constant + c.weight * weight_kg + c.height * height_cm - c.age * f64::from(age))
}

/// Canonical BMR (revised Harris-Benedict).
///
/// # Errors
/// See [`basal_metabolic_rate`].
pub fn bmr(weight_kg: f64, height_cm: f64, age: u32, gender: Gender) -> Result<f64, MetricsError> {
    basal_metabolic_rate(
        BmrFormula::HarrisBenedictRevised,
        weight_kg,
        height_cm,
        age,
        gender,
    )
}

#[must_use]
pub const fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::Active => 1.725,
        ActivityLevel::VeryActive => 1.9,
    }
}

/// Total daily energy expenditure: BMR scaled by activity.
#[must_use]
pub fn tdee(bmr: f64, level: ActivityLevel) -> f64 {
    bmr * activity_multiplier(level)
}

#[must_use]
pub const fn goal_adjustment(goal: Goal) -> f64 {
    match goal {
        Goal::LoseWeight => -500.0,
        Goal::Maintain => 0.0,
        Goal::GainMuscle => 300.0,
    }
}

#[must_use]
pub fn target_calories(tdee: f64, goal: Goal) -> f64 {
    tdee + goal_adjustment(goal)
}

// --- Macro targets ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MacroTargets {
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl MacroTargets {
    #[must_use]
    pub fn calories(&self) -> f64 {
        self.protein * KCAL_PER_G_PROTEIN + self.fat * KCAL_PER_G_FAT + self.carbs * KCAL_PER_G_CARBS
    }
}

/// (protein g/kg, fat share of calories)
const fn preset_allocation(mode: PfcMode) -> Option<(f64, f64)> {
    match mode {
        PfcMode::PresetCut => Some((2.2, 0.20)),
        PfcMode::PresetBulk => Some((2.0, 0.25)),
        PfcMode::PresetMaintain => Some((1.8, 0.25)),
        PfcMode::Manual => None,
    }
}

/// Protein/fat/carbohydrate targets in grams, rounded to whole grams.
///
/// Presets allocate protein per kilogram of body weight and fat as a share of
/// the calorie target; carbohydrates take whatever is left (never negative).
/// `PfcMode::Manual` returns `manual` unchanged.
///
/// # Errors
/// Returns `MetricsError` for non-positive inputs, or when `Manual` is
/// requested without `manual` targets.
pub fn macro_targets(
    target_calories: f64,
    weight_kg: f64,
    mode: PfcMode,
    manual: Option<MacroTargets>,
) -> Result<MacroTargets, MetricsError> {
    let Some((protein_per_kg, fat_share)) = preset_allocation(mode) else {
        let manual = manual.ok_or(MetricsError::MissingManualTargets)?;
        require_positive("Protein", manual.protein)?;
        require_positive("Fat", manual.fat)?;
        require_positive("Carbohydrate", manual.carbs)?;
        return Ok(manual);
    };
    let target_calories = require_positive("Target calories", target_calories)?;
    let weight_kg = require_positive("Weight", weight_kg)?;

    let protein = (weight_kg * protein_per_kg).round();
    let fat = (target_calories * fat_share / KCAL_PER_G_FAT).round();
    let remaining = target_calories - protein * KCAL_PER_G_PROTEIN - fat * KCAL_PER_G_FAT;
    let carbs = (remaining / KCAL_PER_G_CARBS).max(0.0).round();

    Ok(MacroTargets {
        protein,
        fat,
        carbs,
    })
}

// --- Cardio ---

#[must_use]
pub const fn calories_per_minute(kind: CardioKind) -> f64 {
    match kind {
        CardioKind::Running => 10.0,
        CardioKind::Cycling => 8.0,
        CardioKind::Swimming => 12.0,
        CardioKind::Walking => 4.0,
        CardioKind::Rowing => 11.0,
        CardioKind::JumpRope => 13.0,
    }
}

/// Calories burned over `minutes`, rounded to whole kcal. Non-positive or
/// non-finite durations burn nothing.
#[must_use]
pub fn estimate_cardio_calories(kind: CardioKind, minutes: f64) -> f64 {
    if !minutes.is_finite() || minutes <= 0.0 {
        return 0.0;
    }
    (calories_per_minute(kind) * minutes).round()
}
