// src/cli.rs
use chrono::{Duration, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use omnitrack_lib::geofence::DEFAULT_RADIUS_M;
use omnitrack_lib::{
    ActivityLevel, CardioKind, EquipmentType, Gender, Goal, MealType, OneRepMaxFormula, PfcMode,
    SetInput,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Track strength training, cardio, meals and body metrics", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Print list output as CSV instead of a table
    #[arg(long, global = true)]
    pub export_csv: bool,
}

// Custom parser for date strings and shorthands
pub fn parse_date_shorthand(s: &str) -> Result<NaiveDate, String> {
    let today = Local::now().date_naive();
    match s.to_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        _ => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%d.%m.%Y"))
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
            .map_err(|_| {
                format!(
                    "Invalid date format: '{s}'. Use 'today', 'yesterday', YYYY-MM-DD, DD.MM.YYYY, or YYYY/MM/DD."
                )
            }),
    }
}

/// Parses `WEIGHTxREPS` (e.g. `100x8`). A leading `~` marks a set that was
/// not completed.
pub fn parse_set_shorthand(s: &str) -> Result<SetInput, String> {
    let (completed, body) = match s.strip_prefix('~') {
        Some(rest) => (false, rest),
        None => (true, s),
    };
    let (weight, reps) = body
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("Invalid set '{s}'. Use WEIGHTxREPS, e.g. 100x8."))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("Invalid weight in set '{s}'."))?;
    let reps: u32 = reps
        .trim()
        .parse()
        .map_err(|_| format!("Invalid reps in set '{s}'."))?;
    Ok(SetInput {
        weight,
        reps,
        completed,
    })
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitsCli {
    Metric,
    Imperial,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeofenceEventCli {
    Enter,
    Exit,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save a finished strength exercise
    LogWorkout {
        /// Exercise master id
        #[arg(long)]
        exercise_id: i64,
        /// Exercise name (e.g., "Bench Press")
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value = "barbell")]
        equipment: EquipmentType,
        #[arg(long, default_value = "other")]
        body_part: String,
        /// Sets as WEIGHTxREPS; prefix with ~ for a set that was not completed
        #[arg(short, long, required = true, num_args = 1.., value_parser = parse_set_shorthand)]
        sets: Vec<SetInput>,
        #[arg(short, long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List workout logs
    ListWorkouts {
        /// Show a single day
        #[arg(short, long, value_parser = parse_date_shorthand, conflicts_with_all = &["start_date", "end_date"])]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_shorthand, requires = "end_date")]
        start_date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_shorthand, requires = "start_date")]
        end_date: Option<NaiveDate>,
        /// Otherwise show the last N days
        #[arg(short = 'n', long, default_value_t = 7)]
        days: u32,
    },
    DeleteWorkout {
        /// ID of the workout log to delete
        id: String,
    },
    /// Total volume and training days, this week by default
    Volume {
        #[arg(long, value_parser = parse_date_shorthand, requires = "end_date")]
        start_date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_shorthand, requires = "start_date")]
        end_date: Option<NaiveDate>,
    },
    /// List personal records (best estimated 1RM per exercise)
    Prs,
    /// Estimated 1RM over time for one exercise
    RmHistory { exercise_id: i64 },
    /// Estimate a 1RM and print the training-load table
    Rm {
        weight: f64,
        reps: u32,
        #[arg(short, long, default_value = "epley")]
        formula: OneRepMaxFormula,
    },
    /// Log a cardio session
    AddCardio {
        /// running, cycling, swimming, walking, rowing or jump_rope
        kind: CardioKind,
        /// Duration in minutes
        #[arg(short = 't', long)]
        duration: f64,
        /// Distance in km
        #[arg(long, default_value_t = 0.0)]
        distance: f64,
        /// Calories burned; estimated from the activity when omitted
        #[arg(short, long)]
        calories: Option<f64>,
        #[arg(short, long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
        #[arg(long)]
        notes: Option<String>,
    },
    ListCardio {
        #[arg(short, long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    DeleteCardio { id: String },
    /// Log a meal
    AddMeal {
        food: String,
        #[arg(short, long)]
        calories: f64,
        #[arg(long)]
        protein: Option<f64>,
        #[arg(long)]
        carbs: Option<f64>,
        #[arg(long)]
        fat: Option<f64>,
        /// Derived from the current hour when omitted
        #[arg(short, long)]
        meal: Option<MealType>,
        #[arg(short, long, value_parser = parse_date_shorthand)]
        date: Option<NaiveDate>,
    },
    ListMeals {
        #[arg(short, long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    DeleteMeal { id: String },
    /// Look a barcode up and optionally log it as a meal
    LookupFood {
        barcode: String,
        /// Log one 100 g serving of the product
        #[arg(long)]
        log: bool,
        #[arg(short, long)]
        meal: Option<MealType>,
        /// Fall back to this user's food dictionary in the relational database
        #[arg(long)]
        user_id: Option<i64>,
        /// Relational database file (defaults to the data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Record body measurements
    AddBody {
        /// Height in cm
        #[arg(long)]
        height: f64,
        /// Weight in kg
        #[arg(short, long)]
        weight: f64,
        #[arg(long, default_value_t = 0.0)]
        body_fat: f64,
        #[arg(short, long)]
        age: u32,
        #[arg(short, long)]
        gender: Gender,
        #[arg(long, default_value = "moderate")]
        activity: ActivityLevel,
        #[arg(short, long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    ListBody {
        #[arg(short = 'n', long, default_value_t = 30)]
        days: u32,
    },
    /// Update the profile and recompute calorie and macro targets
    Settings {
        #[arg(short, long)]
        age: u32,
        #[arg(short, long)]
        gender: Gender,
        /// Height in cm
        #[arg(long)]
        height: f64,
        /// Weight in kg
        #[arg(short, long)]
        weight: f64,
        #[arg(long, default_value = "moderate")]
        activity: ActivityLevel,
        #[arg(long, default_value = "maintain")]
        goal: Goal,
        #[arg(long, default_value = "preset_maintain")]
        pfc: PfcMode,
        /// Rest interval in seconds
        #[arg(long, default_value_t = 90)]
        interval: u32,
        /// Manual targets in grams, required with --pfc manual
        #[arg(long, required_if_eq("pfc", "manual"))]
        protein: Option<f64>,
        #[arg(long, required_if_eq("pfc", "manual"))]
        fat: Option<f64>,
        #[arg(long, required_if_eq("pfc", "manual"))]
        carbs: Option<f64>,
        #[arg(long)]
        body_fat: Option<f64>,
    },
    ShowSettings,
    AddCustomExercise {
        name: String,
        #[arg(short, long)]
        body_part: String,
        #[arg(short, long, default_value = "barbell")]
        equipment: EquipmentType,
    },
    ListCustomExercises {
        #[arg(short, long)]
        body_part: Option<String>,
    },
    EditCustomExercise {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        body_part: Option<String>,
        #[arg(short, long)]
        equipment: Option<EquipmentType>,
    },
    DeleteCustomExercise { id: String },
    /// List the exercise master data from the relational database
    ListExercises {
        #[arg(short, long)]
        part: Option<omnitrack_lib::BodyPart>,
        #[arg(long)]
        user_id: Option<i64>,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show or set the default rest interval
    Timer {
        /// New default in seconds
        seconds: Option<u32>,
    },
    /// Run a rest countdown in the terminal
    Rest {
        /// Override the default interval (seconds)
        seconds: Option<u32>,
    },
    SetGym {
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Region radius in metres
        #[arg(short, long, default_value_t = DEFAULT_RADIUS_M)]
        radius: f64,
    },
    ShowGym,
    ClearGym,
    /// Feed a geofence transition for the configured gym
    Geofence {
        #[arg(value_enum)]
        event: GeofenceEventCli,
    },
    /// Check a position against the configured gym region
    CheckPosition {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Whether the previous position was inside the region
        #[arg(long)]
        was_inside: bool,
    },
    /// Gym check-in history, newest first
    Checkins {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Calories in versus out for a day
    Summary {
        #[arg(short, long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Month view with training days marked
    Calendar {
        #[arg(short, long)]
        year: Option<i32>,
        #[arg(short, long)]
        month: Option<u32>,
    },
    /// Insert the preset exercise list into the relational database
    SeedExercises {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Delete every locally stored record
    ClearAll {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show the storage envelope version of every collection
    StoreInfo,
    /// Show the path to the record store file
    DataPath,
    /// Set default units (Metric/Imperial)
    SetUnits {
        #[arg(value_enum)]
        units: UnitsCli,
    },
    GenerateCompletion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
