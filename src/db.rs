// src/db.rs
//! Relational schema for the server-backed mode, with plain CRUD accessors.
//!
//! Every table is keyed by an integer user id. Nothing here is synchronized
//! with the local record store; the two are independent persistence paths.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::records::{BodyPart, EquipmentType, Gender, MealType, WorkoutSet};

const DB_FILE_NAME: &str = "omnitrack-remote.sqlite";
const APP_DATA_DIR: &str = "omnitrack";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode JSON column: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{table} row not found: ID {id}")]
    NotFound { table: &'static str, id: i64 },
    #[error("No fields provided to update for {table} ID {id}")]
    NothingToUpdate { table: &'static str, id: i64 },
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database update failed: {0}")]
    UpdateFailed(rusqlite::Error),
    #[error("Database insert failed: {0}")]
    InsertFailed(rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

/// Gets the path to the relational database file inside `data_dir`, or the
/// platform data directory when none is configured. Creates the directory if needed.
/// # Errors
/// Returns `DbError::DataDir` if no data directory can be determined.
pub fn get_db_path(data_dir: Option<&Path>) -> Result<PathBuf, DbError> {
    let app_dir = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_dir().ok_or(DbError::DataDir)?.join(APP_DATA_DIR),
    };
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
/// # Errors
/// Returns `DbError::Connection` if the file cannot be opened.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::Connection)
}

/// Initializes the database tables if they don't exist.
/// # Errors
/// Returns `DbError::Connection` if any statement fails.
pub fn init_db(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            open_id TEXT NOT NULL UNIQUE,
            name TEXT,
            email TEXT,
            login_method TEXT,
            role TEXT NOT NULL DEFAULT 'user' CHECK(role IN ('user', 'admin')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_signed_in TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            height REAL,
            weight REAL,
            age INTEGER,
            gender TEXT CHECK(gender IN ('male', 'female')),
            target_weight REAL,
            target_bench_press REAL,
            target_calories INTEGER,
            target_protein REAL,
            target_fat REAL,
            target_carbs REAL,
            default_interval_seconds INTEGER NOT NULL DEFAULT 90,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            part TEXT NOT NULL CHECK(part IN ('chest', 'back', 'legs', 'shoulders', 'arms', 'abs', 'cardio')),
            equipment_type TEXT NOT NULL CHECK(equipment_type IN ('barbell', 'dumbbell', 'machine', 'bodyweight')),
            is_preset INTEGER NOT NULL DEFAULT 0,
            created_by INTEGER REFERENCES users(id) ON DELETE CASCADE, -- NULL for presets
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workout_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            exercise_id INTEGER NOT NULL REFERENCES exercises(id),
            date TEXT NOT NULL,
            sets TEXT NOT NULL,               -- JSON array of sets
            total_volume REAL,
            estimated_1rm REAL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cardio_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            exercise_id INTEGER NOT NULL REFERENCES exercises(id),
            date TEXT NOT NULL,
            duration_minutes INTEGER,
            distance_km REAL,
            calories_burned INTEGER,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS food_dictionary (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            keyword TEXT NOT NULL,
            calories INTEGER NOT NULL,
            protein REAL NOT NULL,
            fat REAL NOT NULL,
            carbs REAL NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS diet_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            meal_type TEXT NOT NULL CHECK(meal_type IN ('breakfast', 'lunch', 'dinner', 'snack')),
            items TEXT NOT NULL,              -- JSON array of food items
            total_calories INTEGER NOT NULL,
            total_protein REAL NOT NULL,
            total_fat REAL NOT NULL,
            total_carbs REAL NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS gym_locations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            radius_meters INTEGER NOT NULL DEFAULT 100,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS gym_check_in_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            gym_location_id INTEGER NOT NULL REFERENCES gym_locations(id) ON DELETE CASCADE,
            check_in_time TEXT NOT NULL,
            check_out_time TEXT,
            duration_minutes INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS personal_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            exercise_id INTEGER NOT NULL REFERENCES exercises(id),
            best_1rm REAL NOT NULL,
            achieved_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_workout_logs_user_date ON workout_logs(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_cardio_logs_user_date ON cardio_logs(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_diet_logs_user_date ON diet_logs(user_id, date);",
    )
    .map_err(DbError::Connection)
}

// --- Shared helpers ---

fn parse_column<T>(row: &Row, idx: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> Result<T, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Builds and runs `UPDATE <table> SET ... WHERE id = ?` from the provided columns.
fn update_columns(
    conn: &Connection,
    table: &'static str,
    id: i64,
    mut columns: Vec<(&'static str, Box<dyn ToSql>)>,
) -> Result<u64, DbError> {
    if columns.is_empty() {
        return Err(DbError::NothingToUpdate { table, id });
    }
    columns.push(("updated_at", Box::new(Utc::now())));

    let assignments: Vec<String> = columns.iter().map(|(col, _)| format!("{col} = ?")).collect();
    let sql = format!("UPDATE {table} SET {} WHERE id = ?", assignments.join(", "));

    let mut params_vec: Vec<&dyn ToSql> = columns.iter().map(|(_, v)| v.as_ref()).collect();
    params_vec.push(&id);

    let rows_affected = conn
        .execute(&sql, params_vec.as_slice())
        .map_err(DbError::UpdateFailed)?;
    if rows_affected == 0 {
        Err(DbError::NotFound { table, id })
    } else {
        Ok(rows_affected as u64)
    }
}

fn delete_row(conn: &Connection, table: &'static str, id: i64) -> Result<u64, DbError> {
    let sql = format!("DELETE FROM {table} WHERE id = ?1");
    let rows_affected = conn
        .execute(&sql, params![id])
        .map_err(DbError::DeleteFailed)?;
    if rows_affected == 0 {
        Err(DbError::NotFound { table, id })
    } else {
        Ok(rows_affected as u64)
    }
}

fn push_opt<T: ToSql + 'static>(
    columns: &mut Vec<(&'static str, Box<dyn ToSql>)>,
    name: &'static str,
    value: Option<T>,
) {
    if let Some(v) = value {
        columns.push((name, Box::new(v)));
    }
}

// --- Users ---

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct NewUser<'a> {
    pub open_id: &'a str,
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub login_method: Option<&'a str>,
    pub role: Option<UserRole>,
}

fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        open_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        login_method: row.get(4)?,
        role: parse_column(row, 5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        last_signed_in: row.get(8)?,
    })
}

const USER_COLUMNS: &str =
    "id, open_id, name, email, login_method, role, created_at, updated_at, last_signed_in";

/// Inserts a user or refreshes the provided fields of an existing one
/// (matched by `open_id`). Returns the user id.
/// # Errors
/// Returns `DbError::InsertFailed` if the statement fails.
pub fn upsert_user(conn: &Connection, user: &NewUser) -> Result<i64, DbError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO users (open_id, name, email, login_method, role, created_at, updated_at, last_signed_in)
         VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 'user'), ?6, ?6, ?6)
         ON CONFLICT(open_id) DO UPDATE SET
            name = COALESCE(excluded.name, users.name),
            email = COALESCE(excluded.email, users.email),
            login_method = COALESCE(excluded.login_method, users.login_method),
            role = COALESCE(?5, users.role),
            updated_at = excluded.updated_at,
            last_signed_in = excluded.last_signed_in",
        params![
            user.open_id,
            user.name,
            user.email,
            user.login_method,
            user.role.map(|r| r.to_string()),
            now
        ],
    )
    .map_err(DbError::InsertFailed)?;

    conn.query_row(
        "SELECT id FROM users WHERE open_id = ?1",
        params![user.open_id],
        |row| row.get(0),
    )
    .map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_user_by_open_id(conn: &Connection, open_id: &str) -> Result<Option<User>, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE open_id = ?1");
    conn.query_row(&sql, params![open_id], map_row_to_user)
        .optional()
        .map_err(DbError::QueryFailed)
}

// --- User profiles ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub target_weight: Option<f64>,
    pub target_bench_press: Option<f64>,
    pub target_calories: Option<i64>,
    pub target_protein: Option<f64>,
    pub target_fat: Option<f64>,
    pub target_carbs: Option<f64>,
    pub default_interval_seconds: u32,
}

/// Fields of a profile; `None` means "leave unset/unchanged".
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub target_weight: Option<f64>,
    pub target_bench_press: Option<f64>,
    pub target_calories: Option<i64>,
    pub target_protein: Option<f64>,
    pub target_fat: Option<f64>,
    pub target_carbs: Option<f64>,
    pub default_interval_seconds: Option<u32>,
}

fn map_row_to_profile(row: &Row) -> Result<UserProfile, rusqlite::Error> {
    let gender: Option<String> = row.get(6)?;
    let gender = gender
        .map(|g| g.parse::<Gender>())
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(UserProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        height: row.get(2)?,
        weight: row.get(3)?,
        age: row.get(4)?,
        target_weight: row.get(5)?,
        gender,
        target_bench_press: row.get(7)?,
        target_calories: row.get(8)?,
        target_protein: row.get(9)?,
        target_fat: row.get(10)?,
        target_carbs: row.get(11)?,
        default_interval_seconds: row.get(12)?,
    })
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_user_profile(conn: &Connection, user_id: i64) -> Result<Option<UserProfile>, DbError> {
    conn.query_row(
        "SELECT id, user_id, height, weight, age, target_weight, gender, target_bench_press,
                target_calories, target_protein, target_fat, target_carbs, default_interval_seconds
         FROM user_profiles WHERE user_id = ?1",
        params![user_id],
        map_row_to_profile,
    )
    .optional()
    .map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::InsertFailed` if the user already has a profile or the insert fails.
pub fn create_user_profile(conn: &Connection, user_id: i64, fields: &ProfileFields) -> Result<i64, DbError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO user_profiles (user_id, height, weight, age, gender, target_weight, target_bench_press,
             target_calories, target_protein, target_fat, target_carbs, default_interval_seconds,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, COALESCE(?12, 90), ?13, ?13)",
        params![
            user_id,
            fields.height,
            fields.weight,
            fields.age,
            fields.gender.map(|g| g.to_string()),
            fields.target_weight,
            fields.target_bench_press,
            fields.target_calories,
            fields.target_protein,
            fields.target_fat,
            fields.target_carbs,
            fields.default_interval_seconds,
            now
        ],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// Updates the provided profile fields of `user_id`'s profile.
/// # Errors
/// Returns `DbError::NotFound` if the user has no profile.
pub fn update_user_profile(conn: &Connection, user_id: i64, fields: ProfileFields) -> Result<u64, DbError> {
    let profile_id: i64 = conn
        .query_row(
            "SELECT id FROM user_profiles WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(DbError::QueryFailed)?
        .ok_or(DbError::NotFound {
            table: "user_profiles",
            id: user_id,
        })?;

    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    push_opt(&mut columns, "height", fields.height);
    push_opt(&mut columns, "weight", fields.weight);
    push_opt(&mut columns, "age", fields.age);
    push_opt(&mut columns, "gender", fields.gender.map(|g| g.to_string()));
    push_opt(&mut columns, "target_weight", fields.target_weight);
    push_opt(&mut columns, "target_bench_press", fields.target_bench_press);
    push_opt(&mut columns, "target_calories", fields.target_calories);
    push_opt(&mut columns, "target_protein", fields.target_protein);
    push_opt(&mut columns, "target_fat", fields.target_fat);
    push_opt(&mut columns, "target_carbs", fields.target_carbs);
    push_opt(&mut columns, "default_interval_seconds", fields.default_interval_seconds);
    update_columns(conn, "user_profiles", profile_id, columns)
}

// --- Exercise master data ---

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseDefinition {
    pub id: i64,
    pub name: String,
    pub part: BodyPart,
    pub equipment_type: EquipmentType,
    pub is_preset: bool,
    pub created_by: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewExercise<'a> {
    pub name: &'a str,
    pub part: BodyPart,
    pub equipment_type: EquipmentType,
    pub is_preset: bool,
    pub created_by: Option<i64>,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct ExerciseUpdate {
    pub name: Option<String>,
    pub part: Option<BodyPart>,
    pub equipment_type: Option<EquipmentType>,
    pub description: Option<String>,
}

const EXERCISE_COLUMNS: &str = "id, name, part, equipment_type, is_preset, created_by, description";

fn map_row_to_exercise(row: &Row) -> Result<ExerciseDefinition, rusqlite::Error> {
    Ok(ExerciseDefinition {
        id: row.get(0)?,
        name: row.get(1)?,
        part: parse_column(row, 2)?,
        equipment_type: parse_column(row, 3)?,
        is_preset: row.get(4)?,
        created_by: row.get(5)?,
        description: row.get(6)?,
    })
}

/// Presets plus, when `user_id` is given, that user's custom exercises.
/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_all_exercises(conn: &Connection, user_id: Option<i64>) -> Result<Vec<ExerciseDefinition>, DbError> {
    let sql = format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises
         WHERE is_preset = 1 OR (?1 IS NOT NULL AND created_by = ?1)
         ORDER BY part, id"
    );
    let mut stmt = conn.prepare(&sql).map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![user_id], map_row_to_exercise)
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_exercises_by_part(
    conn: &Connection,
    part: BodyPart,
    user_id: Option<i64>,
) -> Result<Vec<ExerciseDefinition>, DbError> {
    Ok(get_all_exercises(conn, user_id)?
        .into_iter()
        .filter(|ex| ex.part == part)
        .collect())
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_exercise_by_id(conn: &Connection, id: i64) -> Result<Option<ExerciseDefinition>, DbError> {
    let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?1");
    conn.query_row(&sql, params![id], map_row_to_exercise)
        .optional()
        .map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::InsertFailed` if the insert fails.
pub fn create_exercise(conn: &Connection, exercise: &NewExercise) -> Result<i64, DbError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO exercises (name, part, equipment_type, is_preset, created_by, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            exercise.name,
            exercise.part.to_string(),
            exercise.equipment_type.to_string(),
            exercise.is_preset,
            exercise.created_by,
            exercise.description,
            now
        ],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// # Errors
/// Returns `DbError::NotFound` if no exercise has this id.
pub fn update_exercise(conn: &Connection, id: i64, update: ExerciseUpdate) -> Result<u64, DbError> {
    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    push_opt(&mut columns, "name", update.name);
    push_opt(&mut columns, "part", update.part.map(|p| p.to_string()));
    push_opt(
        &mut columns,
        "equipment_type",
        update.equipment_type.map(|e| e.to_string()),
    );
    push_opt(&mut columns, "description", update.description);
    update_columns(conn, "exercises", id, columns)
}

/// # Errors
/// Returns `DbError::NotFound` if no exercise has this id.
pub fn delete_exercise(conn: &Connection, id: i64) -> Result<u64, DbError> {
    delete_row(conn, "exercises", id)
}

// --- Workout logs ---

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteWorkoutLog {
    pub id: i64,
    pub user_id: i64,
    pub exercise_id: i64,
    pub date: NaiveDate,
    pub sets: Vec<WorkoutSet>,
    pub total_volume: Option<f64>,
    pub estimated_1rm: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewWorkoutLog<'a> {
    pub user_id: i64,
    pub exercise_id: i64,
    pub date: NaiveDate,
    pub sets: &'a [WorkoutSet],
    pub total_volume: Option<f64>,
    pub estimated_1rm: Option<f64>,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkoutLogUpdate {
    pub exercise_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub sets: Option<Vec<WorkoutSet>>,
    pub total_volume: Option<f64>,
    pub estimated_1rm: Option<f64>,
    pub notes: Option<String>,
}

const WORKOUT_COLUMNS: &str =
    "id, user_id, exercise_id, date, sets, total_volume, estimated_1rm, notes";

fn map_row_to_workout_log(row: &Row) -> Result<RemoteWorkoutLog, rusqlite::Error> {
    Ok(RemoteWorkoutLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        exercise_id: row.get(2)?,
        date: row.get(3)?,
        sets: parse_json_column(row, 4)?,
        total_volume: row.get(5)?,
        estimated_1rm: row.get(6)?,
        notes: row.get(7)?,
    })
}

/// Logs of `user_id` with `start <= date <= end`, oldest first.
/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_workout_logs_by_date_range(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RemoteWorkoutLog>, DbError> {
    let sql = format!(
        "SELECT {WORKOUT_COLUMNS} FROM workout_logs
         WHERE user_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date, id"
    );
    let mut stmt = conn.prepare(&sql).map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![user_id, start, end], map_row_to_workout_log)
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_workout_log_by_id(conn: &Connection, id: i64) -> Result<Option<RemoteWorkoutLog>, DbError> {
    let sql = format!("SELECT {WORKOUT_COLUMNS} FROM workout_logs WHERE id = ?1");
    conn.query_row(&sql, params![id], map_row_to_workout_log)
        .optional()
        .map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::Json` or `DbError::InsertFailed`.
pub fn create_workout_log(conn: &Connection, log: &NewWorkoutLog) -> Result<i64, DbError> {
    let sets_json = serde_json::to_string(log.sets)?;
    let now = Utc::now();
    conn.execute(
        "INSERT INTO workout_logs (user_id, exercise_id, date, sets, total_volume, estimated_1rm, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            log.user_id,
            log.exercise_id,
            log.date,
            sets_json,
            log.total_volume,
            log.estimated_1rm,
            log.notes,
            now
        ],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// # Errors
/// Returns `DbError::NotFound` if no log has this id.
pub fn update_workout_log(conn: &Connection, id: i64, update: WorkoutLogUpdate) -> Result<u64, DbError> {
    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    push_opt(&mut columns, "exercise_id", update.exercise_id);
    push_opt(&mut columns, "date", update.date);
    if let Some(sets) = update.sets {
        columns.push(("sets", Box::new(serde_json::to_string(&sets)?)));
    }
    push_opt(&mut columns, "total_volume", update.total_volume);
    push_opt(&mut columns, "estimated_1rm", update.estimated_1rm);
    push_opt(&mut columns, "notes", update.notes);
    update_columns(conn, "workout_logs", id, columns)
}

/// # Errors
/// Returns `DbError::NotFound` if no log has this id.
pub fn delete_workout_log(conn: &Connection, id: i64) -> Result<u64, DbError> {
    delete_row(conn, "workout_logs", id)
}

// --- Cardio logs ---

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCardioLog {
    pub id: i64,
    pub user_id: i64,
    pub exercise_id: i64,
    pub date: NaiveDate,
    pub duration_minutes: Option<i64>,
    pub distance_km: Option<f64>,
    pub calories_burned: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCardioLog<'a> {
    pub user_id: i64,
    pub exercise_id: i64,
    pub date: NaiveDate,
    pub duration_minutes: Option<i64>,
    pub distance_km: Option<f64>,
    pub calories_burned: Option<i64>,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct CardioLogUpdate {
    pub date: Option<NaiveDate>,
    pub duration_minutes: Option<i64>,
    pub distance_km: Option<f64>,
    pub calories_burned: Option<i64>,
    pub notes: Option<String>,
}

fn map_row_to_cardio_log(row: &Row) -> Result<RemoteCardioLog, rusqlite::Error> {
    Ok(RemoteCardioLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        exercise_id: row.get(2)?,
        date: row.get(3)?,
        duration_minutes: row.get(4)?,
        distance_km: row.get(5)?,
        calories_burned: row.get(6)?,
        notes: row.get(7)?,
    })
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_cardio_logs_by_date_range(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RemoteCardioLog>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, exercise_id, date, duration_minutes, distance_km, calories_burned, notes
             FROM cardio_logs WHERE user_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date, id",
        )
        .map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![user_id, start, end], map_row_to_cardio_log)
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::InsertFailed` if the insert fails.
pub fn create_cardio_log(conn: &Connection, log: &NewCardioLog) -> Result<i64, DbError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO cardio_logs (user_id, exercise_id, date, duration_minutes, distance_km, calories_burned, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            log.user_id,
            log.exercise_id,
            log.date,
            log.duration_minutes,
            log.distance_km,
            log.calories_burned,
            log.notes,
            now
        ],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// # Errors
/// Returns `DbError::NotFound` if no log has this id.
pub fn update_cardio_log(conn: &Connection, id: i64, update: CardioLogUpdate) -> Result<u64, DbError> {
    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    push_opt(&mut columns, "date", update.date);
    push_opt(&mut columns, "duration_minutes", update.duration_minutes);
    push_opt(&mut columns, "distance_km", update.distance_km);
    push_opt(&mut columns, "calories_burned", update.calories_burned);
    push_opt(&mut columns, "notes", update.notes);
    update_columns(conn, "cardio_logs", id, columns)
}

/// # Errors
/// Returns `DbError::NotFound` if no log has this id.
pub fn delete_cardio_log(conn: &Connection, id: i64) -> Result<u64, DbError> {
    delete_row(conn, "cardio_logs", id)
}

// --- Food dictionary ---

#[derive(Debug, Clone, PartialEq)]
pub struct FoodDictionaryEntry {
    pub id: i64,
    pub user_id: i64,
    pub keyword: String,
    pub calories: i64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewFoodEntry<'a> {
    pub user_id: i64,
    pub keyword: &'a str,
    pub calories: i64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct FoodEntryUpdate {
    pub keyword: Option<String>,
    pub calories: Option<i64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub description: Option<String>,
}

const FOOD_COLUMNS: &str = "id, user_id, keyword, calories, protein, fat, carbs, description";

fn map_row_to_food_entry(row: &Row) -> Result<FoodDictionaryEntry, rusqlite::Error> {
    Ok(FoodDictionaryEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        keyword: row.get(2)?,
        calories: row.get(3)?,
        protein: row.get(4)?,
        fat: row.get(5)?,
        carbs: row.get(6)?,
        description: row.get(7)?,
    })
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_food_dictionary(conn: &Connection, user_id: i64) -> Result<Vec<FoodDictionaryEntry>, DbError> {
    let sql = format!("SELECT {FOOD_COLUMNS} FROM food_dictionary WHERE user_id = ?1 ORDER BY keyword");
    let mut stmt = conn.prepare(&sql).map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![user_id], map_row_to_food_entry)
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::QueryFailed)
}

/// Exact (case-insensitive) keyword match.
/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_food_by_keyword(
    conn: &Connection,
    user_id: i64,
    keyword: &str,
) -> Result<Option<FoodDictionaryEntry>, DbError> {
    let sql = format!(
        "SELECT {FOOD_COLUMNS} FROM food_dictionary
         WHERE user_id = ?1 AND keyword = ?2 COLLATE NOCASE LIMIT 1"
    );
    conn.query_row(&sql, params![user_id, keyword], map_row_to_food_entry)
        .optional()
        .map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::InsertFailed` if the insert fails.
pub fn create_food_entry(conn: &Connection, entry: &NewFoodEntry) -> Result<i64, DbError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO food_dictionary (user_id, keyword, calories, protein, fat, carbs, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            entry.user_id,
            entry.keyword,
            entry.calories,
            entry.protein,
            entry.fat,
            entry.carbs,
            entry.description,
            now
        ],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// # Errors
/// Returns `DbError::NotFound` if no entry has this id.
pub fn update_food_entry(conn: &Connection, id: i64, update: FoodEntryUpdate) -> Result<u64, DbError> {
    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    push_opt(&mut columns, "keyword", update.keyword);
    push_opt(&mut columns, "calories", update.calories);
    push_opt(&mut columns, "protein", update.protein);
    push_opt(&mut columns, "fat", update.fat);
    push_opt(&mut columns, "carbs", update.carbs);
    push_opt(&mut columns, "description", update.description);
    update_columns(conn, "food_dictionary", id, columns)
}

/// # Errors
/// Returns `DbError::NotFound` if no entry has this id.
pub fn delete_food_entry(conn: &Connection, id: i64) -> Result<u64, DbError> {
    delete_row(conn, "food_dictionary", id)
}

// --- Diet logs ---

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct FoodItem {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DietLog {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub items: Vec<FoodItem>,
    pub total_calories: i64,
    pub total_protein: f64,
    pub total_fat: f64,
    pub total_carbs: f64,
    pub notes: Option<String>,
}

fn map_row_to_diet_log(row: &Row) -> Result<DietLog, rusqlite::Error> {
    Ok(DietLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        meal_type: parse_column(row, 3)?,
        items: parse_json_column(row, 4)?,
        total_calories: row.get(5)?,
        total_protein: row.get(6)?,
        total_fat: row.get(7)?,
        total_carbs: row.get(8)?,
        notes: row.get(9)?,
    })
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_diet_logs_by_date_range(
    conn: &Connection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DietLog>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, date, meal_type, items, total_calories, total_protein, total_fat, total_carbs, notes
             FROM diet_logs WHERE user_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date, id",
        )
        .map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![user_id, start, end], map_row_to_diet_log)
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::QueryFailed)
}

/// Inserts a meal; totals are summed from `items`.
/// # Errors
/// Returns `DbError::Json` or `DbError::InsertFailed`.
pub fn create_diet_log(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    items: &[FoodItem],
    notes: Option<&str>,
) -> Result<i64, DbError> {
    let total_calories: f64 = items.iter().map(|i| i.calories).sum();
    let total_protein: f64 = items.iter().map(|i| i.protein).sum();
    let total_fat: f64 = items.iter().map(|i| i.fat).sum();
    let total_carbs: f64 = items.iter().map(|i| i.carbs).sum();
    let items_json = serde_json::to_string(items)?;
    let now = Utc::now();
    #[allow(clippy::cast_possible_truncation)]
    let total_calories = total_calories.round() as i64;
    conn.execute(
        "INSERT INTO diet_logs (user_id, date, meal_type, items, total_calories, total_protein, total_fat, total_carbs, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            user_id,
            date,
            meal_type.to_string(),
            items_json,
            total_calories,
            total_protein,
            total_fat,
            total_carbs,
            notes,
            now
        ],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// Replaces the notes or meal type of a diet log.
/// # Errors
/// Returns `DbError::NotFound` if no log has this id.
pub fn update_diet_log(
    conn: &Connection,
    id: i64,
    meal_type: Option<MealType>,
    notes: Option<String>,
) -> Result<u64, DbError> {
    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    push_opt(&mut columns, "meal_type", meal_type.map(|m| m.to_string()));
    push_opt(&mut columns, "notes", notes);
    update_columns(conn, "diet_logs", id, columns)
}

/// # Errors
/// Returns `DbError::NotFound` if no log has this id.
pub fn delete_diet_log(conn: &Connection, id: i64) -> Result<u64, DbError> {
    delete_row(conn, "diet_logs", id)
}

// --- Gym locations and check-ins ---

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteGymLocation {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: i64,
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_gym_locations(conn: &Connection, user_id: i64) -> Result<Vec<RemoteGymLocation>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, name, latitude, longitude, radius_meters
             FROM gym_locations WHERE user_id = ?1 ORDER BY id",
        )
        .map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(RemoteGymLocation {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
                radius_meters: row.get(5)?,
            })
        })
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::InsertFailed` if the insert fails.
pub fn create_gym_location(
    conn: &Connection,
    user_id: i64,
    name: &str,
    latitude: f64,
    longitude: f64,
    radius_meters: Option<i64>,
) -> Result<i64, DbError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO gym_locations (user_id, name, latitude, longitude, radius_meters, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 100), ?6, ?6)",
        params![user_id, name, latitude, longitude, radius_meters, now],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// # Errors
/// Returns `DbError::NotFound` if no location has this id.
pub fn update_gym_location(
    conn: &Connection,
    id: i64,
    name: Option<String>,
    coordinates: Option<(f64, f64)>,
    radius_meters: Option<i64>,
) -> Result<u64, DbError> {
    let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
    push_opt(&mut columns, "name", name);
    if let Some((lat, lon)) = coordinates {
        columns.push(("latitude", Box::new(lat)));
        columns.push(("longitude", Box::new(lon)));
    }
    push_opt(&mut columns, "radius_meters", radius_meters);
    update_columns(conn, "gym_locations", id, columns)
}

/// # Errors
/// Returns `DbError::NotFound` if no location has this id.
pub fn delete_gym_location(conn: &Connection, id: i64) -> Result<u64, DbError> {
    delete_row(conn, "gym_locations", id)
}

#[derive(Debug, Clone, PartialEq)]
pub struct GymCheckInLog {
    pub id: i64,
    pub user_id: i64,
    pub gym_location_id: i64,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
}

/// Most recent check-ins first.
/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_gym_check_in_logs(conn: &Connection, user_id: i64, limit: u32) -> Result<Vec<GymCheckInLog>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, gym_location_id, check_in_time, check_out_time, duration_minutes
             FROM gym_check_in_logs WHERE user_id = ?1 ORDER BY check_in_time DESC LIMIT ?2",
        )
        .map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![user_id, limit], |row| {
            Ok(GymCheckInLog {
                id: row.get(0)?,
                user_id: row.get(1)?,
                gym_location_id: row.get(2)?,
                check_in_time: row.get(3)?,
                check_out_time: row.get(4)?,
                duration_minutes: row.get(5)?,
            })
        })
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::InsertFailed` if the insert fails.
pub fn create_gym_check_in(
    conn: &Connection,
    user_id: i64,
    gym_location_id: i64,
    check_in_time: DateTime<Utc>,
) -> Result<i64, DbError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO gym_check_in_logs (user_id, gym_location_id, check_in_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![user_id, gym_location_id, check_in_time, now],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// Closes a check-in, storing the stay length in whole minutes.
/// # Errors
/// Returns `DbError::NotFound` if no check-in has this id.
pub fn record_gym_check_out(conn: &Connection, id: i64, check_out_time: DateTime<Utc>) -> Result<u64, DbError> {
    let check_in_time: DateTime<Utc> = conn
        .query_row(
            "SELECT check_in_time FROM gym_check_in_logs WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(DbError::QueryFailed)?
        .ok_or(DbError::NotFound {
            table: "gym_check_in_logs",
            id,
        })?;
    let minutes = (check_out_time - check_in_time).num_minutes().max(0);
    update_columns(
        conn,
        "gym_check_in_logs",
        id,
        vec![
            ("check_out_time", Box::new(check_out_time)),
            ("duration_minutes", Box::new(minutes)),
        ],
    )
}

// --- Personal records ---

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePersonalRecord {
    pub id: i64,
    pub user_id: i64,
    pub exercise_id: i64,
    pub best_1rm: f64,
    pub achieved_date: NaiveDate,
}

/// # Errors
/// Returns `DbError::QueryFailed` if the query fails.
pub fn get_personal_record_by_exercise(
    conn: &Connection,
    user_id: i64,
    exercise_id: i64,
) -> Result<Option<RemotePersonalRecord>, DbError> {
    conn.query_row(
        "SELECT id, user_id, exercise_id, best_1rm, achieved_date
         FROM personal_records WHERE user_id = ?1 AND exercise_id = ?2
         ORDER BY best_1rm DESC LIMIT 1",
        params![user_id, exercise_id],
        |row| {
            Ok(RemotePersonalRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                exercise_id: row.get(2)?,
                best_1rm: row.get(3)?,
                achieved_date: row.get(4)?,
            })
        },
    )
    .optional()
    .map_err(DbError::QueryFailed)
}

/// # Errors
/// Returns `DbError::InsertFailed` if the insert fails.
pub fn create_personal_record(
    conn: &Connection,
    user_id: i64,
    exercise_id: i64,
    best_1rm: f64,
    achieved_date: NaiveDate,
) -> Result<i64, DbError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO personal_records (user_id, exercise_id, best_1rm, achieved_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![user_id, exercise_id, best_1rm, achieved_date, now],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// # Errors
/// Returns `DbError::NotFound` if no record has this id.
pub fn update_personal_record(
    conn: &Connection,
    id: i64,
    best_1rm: f64,
    achieved_date: NaiveDate,
) -> Result<u64, DbError> {
    update_columns(
        conn,
        "personal_records",
        id,
        vec![
            ("best_1rm", Box::new(best_1rm)),
            ("achieved_date", Box::new(achieved_date)),
        ],
    )
}
