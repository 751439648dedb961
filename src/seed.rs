// src/seed.rs
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::db::{self, DbError, NewExercise};
use crate::records::BodyPart::{self, Abs, Arms, Back, Cardio, Chest, Legs, Shoulders};
use crate::records::EquipmentType::{self, Barbell, Bodyweight, Dumbbell, Machine};

pub struct PresetExercise {
    pub name: &'static str,
    pub part: BodyPart,
    pub equipment_type: EquipmentType,
    pub description: &'static str,
}

const fn preset(
    name: &'static str,
    part: BodyPart,
    equipment_type: EquipmentType,
    description: &'static str,
) -> PresetExercise {
    PresetExercise {
        name,
        part,
        equipment_type,
        description,
    }
}

/// Built-in exercise master list.
pub const PRESET_EXERCISES: &[PresetExercise] = &[
    preset("Bench Press", Chest, Barbell, "Foundational chest lift"),
    preset("Incline Bench Press", Chest, Barbell, "Targets the upper chest"),
    preset("Dumbbell Press", Chest, Dumbbell, "Chest press with a longer range of motion"),
    preset("Dumbbell Fly", Chest, Dumbbell, "Chest stretch movement"),
    preset("Chest Press Machine", Chest, Machine, "Guided chest press"),
    preset("Push-up", Chest, Bodyweight, "Bodyweight chest exercise"),
    preset("Deadlift", Back, Barbell, "Whole posterior chain"),
    preset("Bent-over Row", Back, Barbell, "Builds back thickness"),
    preset("Dumbbell Row", Back, Dumbbell, "One side at a time"),
    preset("Lat Pulldown", Back, Machine, "Builds back width"),
    preset("Seated Row", Back, Machine, "Mid-back focus"),
    preset("Chin-up", Back, Bodyweight, "Bodyweight back exercise"),
    preset("Squat", Legs, Barbell, "The king of leg exercises"),
    preset("Leg Press", Legs, Machine, "Guided leg training"),
    preset("Leg Extension", Legs, Machine, "Quadriceps isolation"),
    preset("Leg Curl", Legs, Machine, "Hamstring isolation"),
    preset("Bulgarian Split Squat", Legs, Dumbbell, "Single-leg squat"),
    preset("Lunge", Legs, Bodyweight, "Bodyweight leg exercise"),
    preset("Shoulder Press", Shoulders, Barbell, "Overall shoulder development"),
    preset("Dumbbell Shoulder Press", Shoulders, Dumbbell, "Shoulder press with a longer range of motion"),
    preset("Lateral Raise", Shoulders, Dumbbell, "Side delts"),
    preset("Front Raise", Shoulders, Dumbbell, "Front delts"),
    preset("Rear Delt Raise", Shoulders, Dumbbell, "Rear delts"),
    preset("Barbell Curl", Arms, Barbell, "Biceps"),
    preset("Dumbbell Curl", Arms, Dumbbell, "One arm at a time"),
    preset("Hammer Curl", Arms, Dumbbell, "Biceps and forearms"),
    preset("Triceps Extension", Arms, Dumbbell, "Triceps"),
    preset("Dips", Arms, Bodyweight, "Bodyweight triceps exercise"),
    preset("Crunch", Abs, Bodyweight, "Basic ab exercise"),
    preset("Leg Raise", Abs, Bodyweight, "Lower abs"),
    preset("Plank", Abs, Bodyweight, "Core stability"),
    preset("Ab Roller", Abs, Machine, "Whole abdominal wall"),
    preset("Treadmill", Cardio, Machine, "Running machine"),
    preset("Exercise Bike", Cardio, Machine, "Stationary cycling"),
    preset("Cross Trainer", Cardio, Machine, "Full-body cardio"),
    preset("Running", Cardio, Bodyweight, "Outdoor running"),
];

/// Inserts every preset that is not already present, in one transaction.
/// Returns the number of rows inserted; rerunning is a no-op.
///
/// # Errors
/// Returns `DbError` if any insert fails. Nothing is committed in that case.
pub fn seed_preset_exercises(conn: &Connection) -> Result<usize, DbError> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    for exercise in PRESET_EXERCISES {
        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM exercises WHERE is_preset = 1 AND name = ?1)",
                params![exercise.name],
                |row| row.get(0),
            )
            .map_err(DbError::QueryFailed)?;
        if exists {
            debug!(name = exercise.name, "preset already present");
            continue;
        }
        db::create_exercise(
            &tx,
            &NewExercise {
                name: exercise.name,
                part: exercise.part,
                equipment_type: exercise.equipment_type.clone(),
                is_preset: true,
                created_by: None,
                description: Some(exercise.description),
            },
        )?;
        info!(name = exercise.name, "inserted preset exercise");
        inserted += 1;
    }
    tx.commit()?;
    Ok(inserted)
}
