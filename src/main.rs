//src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate, Timelike, Utc};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdin, stdout, Write};
use std::path::Path;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use omnitrack_lib::calendar;
use omnitrack_lib::db;
use omnitrack_lib::food_lookup::{self, DictionarySource, NutritionSource};
use omnitrack_lib::geofence::{self, GeofenceEvent};
use omnitrack_lib::metrics;
use omnitrack_lib::seed;
use omnitrack_lib::timer::RestTimer;
use omnitrack_lib::{
    display_distance, display_weight, parse_color, AppService, BodyMetricsParams, BodyRecord,
    CalorieLog, CardioLog, CustomExerciseUpdate, GymLocation, LogCardioParams, LogMealParams,
    LogWorkoutParams, MacroTargets, PersonalRecord, Units, UserSettingsParams, WorkoutLog,
};

fn main() -> ExitCode {
    let cli_args = cli::parse_args();

    // Completion scripts need neither config nor storage.
    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return ExitCode::SUCCESS;
    }

    match run(cli_args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli_args: cli::Cli) -> Result<()> {
    let export_csv = cli_args.export_csv;
    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;

    if let Err(e) = omnitrack_lib::logging::init(&service.config.log_level) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let header_color: Color = parse_color(&service.config.theme.header_color)
        .map(Into::into)
        .unwrap_or(Color::Green);
    let units = service.config.units;
    let today = Local::now().date_naive();

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        // --- Strength ---
        cli::Commands::LogWorkout {
            exercise_id,
            name,
            equipment,
            body_part,
            sets,
            date,
            notes,
        } => {
            let (log, new_record) = service.log_workout(LogWorkoutParams {
                date,
                exercise_id,
                exercise_name: &name,
                equipment_type: equipment,
                body_part: &body_part,
                sets,
                notes,
            })?;
            println!(
                "Saved {} ({} sets) on {}: volume {:.1}, estimated 1RM {:.0} kg. ID: {}",
                log.exercise_name,
                log.sets.len(),
                log.date,
                log.total_volume,
                log.estimated_1rm,
                log.id
            );
            if new_record {
                println!("*** New personal record for {}! ***", log.exercise_name);
            }
        }
        cli::Commands::ListWorkouts {
            date,
            start_date,
            end_date,
            days,
        } => {
            let logs = match (date, start_date, end_date) {
                (Some(d), _, _) => service.store.get_workout_logs_by_date(d),
                (None, Some(start), Some(end)) => {
                    service.store.get_workout_logs_by_date_range(start, end)
                }
                _ => {
                    let (start, end) = calendar::trailing_range(today, days);
                    service.store.get_workout_logs_by_date_range(start, end)
                }
            };
            if logs.is_empty() {
                println!("No workouts found.");
            } else if export_csv {
                print_workout_csv(&logs, units)?;
            } else {
                print_workout_table(&logs, header_color, units);
            }
        }
        cli::Commands::DeleteWorkout { id } => {
            if service.delete_workout(&id)? {
                println!("Deleted workout log {id}.");
            } else {
                println!("No workout log with ID {id}.");
            }
        }
        cli::Commands::Volume {
            start_date,
            end_date,
        } => {
            let (start, end) = match (start_date, end_date) {
                (Some(s), Some(e)) => (s, e),
                _ => calendar::week_range(today),
            };
            let volume = service.store.get_total_volume_by_date_range(start, end);
            let days = service.store.get_workout_days_by_date_range(start, end);
            println!(
                "{start} to {end}: total volume {:.1} {}, {days} training day(s).",
                display_weight(volume, units),
                weight_unit(units)
            );
        }
        cli::Commands::Prs => {
            let records: Vec<PersonalRecord> =
                service.store.get_personal_records().into_values().collect();
            if records.is_empty() {
                println!("No personal records yet.");
            } else if export_csv {
                print_pr_csv(&records, units)?;
            } else {
                print_pr_table(&records, header_color, units);
            }
        }
        cli::Commands::RmHistory { exercise_id } => {
            let history = service.store.get_one_rep_max_history(exercise_id);
            if history.is_empty() {
                println!("No history for exercise {exercise_id}.");
            } else if export_csv {
                let mut writer = csv::Writer::from_writer(io::stdout());
                writer.write_record(["Date", "Estimated_1RM", "Weight", "Reps"])?;
                for point in history {
                    writer.write_record(&[
                        point.date.to_string(),
                        format!("{:.1}", display_weight(point.rm, units)),
                        format!("{:.1}", display_weight(point.weight, units)),
                        point.reps.to_string(),
                    ])?;
                }
                writer.flush()?;
            } else {
                let mut table = styled_table(
                    &["Date", "Estimated 1RM", "Best set"],
                    header_color,
                );
                for point in history {
                    table.add_row(vec![
                        Cell::new(point.date),
                        Cell::new(format!("{:.1}", display_weight(point.rm, units))),
                        Cell::new(format!(
                            "{:.1} x {}",
                            display_weight(point.weight, units),
                            point.reps
                        )),
                    ]);
                }
                println!("{table}");
            }
        }
        cli::Commands::Rm {
            weight,
            reps,
            formula,
        } => {
            let (one_rm, table_rows) = service.calculate_rm(weight, reps, formula)?;
            println!("Estimated 1RM ({formula}): {one_rm:.1} kg");
            let mut table = styled_table(&["% of 1RM", "Reps", "Weight (kg)"], header_color);
            for row in table_rows {
                table.add_row(vec![
                    Cell::new(format!("{}%", row.percent)),
                    Cell::new(row.rep_range),
                    Cell::new(format!("{:.1}", row.weight)),
                ]);
            }
            println!("{table}");
        }
        // --- Cardio ---
        cli::Commands::AddCardio {
            kind,
            duration,
            distance,
            calories,
            date,
            notes,
        } => {
            let log = service.log_cardio(LogCardioParams {
                date,
                kind,
                duration_minutes: duration,
                distance_km: distance,
                calories,
                notes,
            })?;
            println!(
                "Logged {} for {} min, {:.0} kcal. ID: {}",
                log.exercise_type, log.duration, log.calories, log.id
            );
        }
        cli::Commands::ListCardio { date } => {
            let logs = service.store.get_cardio_logs_by_date(date);
            if logs.is_empty() {
                println!("No cardio logged on {date}.");
            } else if export_csv {
                print_cardio_csv(&logs, units)?;
            } else {
                print_cardio_table(&logs, header_color, units);
            }
        }
        cli::Commands::DeleteCardio { id } => {
            report_delete("cardio log", &id, service.store.delete_cardio_log(&id)?);
        }
        // --- Nutrition ---
        cli::Commands::AddMeal {
            food,
            calories,
            protein,
            carbs,
            fat,
            meal,
            date,
        } => {
            let log = service.log_meal(LogMealParams {
                date,
                meal_type: meal,
                food_name: food,
                calories,
                protein,
                carbs,
                fat,
            })?;
            println!(
                "Logged {} ({:.0} kcal) as {} on {}. ID: {}",
                log.food_name, log.calories, log.meal_type, log.date, log.id
            );
        }
        cli::Commands::ListMeals { date } => {
            let logs = service.store.get_calorie_logs_by_date(date);
            if logs.is_empty() {
                println!("No meals logged on {date}.");
            } else if export_csv {
                print_meal_csv(&logs)?;
            } else {
                print_meal_table(&logs, header_color);
            }
        }
        cli::Commands::DeleteMeal { id } => {
            report_delete("meal", &id, service.store.delete_calorie_log(&id)?);
        }
        cli::Commands::LookupFood {
            barcode,
            log,
            meal,
            user_id,
            db,
        } => {
            let conn = match user_id {
                Some(_) => Some(open_remote_db(db.as_deref(), &service)?),
                None => None,
            };
            let dictionary = conn
                .as_ref()
                .zip(user_id)
                .map(|(conn, user_id)| DictionarySource::new(conn, user_id));
            let facts = service.lookup_food(
                &barcode,
                dictionary.as_ref().map(|d| d as &dyn NutritionSource),
            )?;
            println!(
                "{} (per 100 g): {:.0} kcal, P {:.1} g, F {:.1} g, C {:.1} g",
                facts.name, facts.calories, facts.protein, facts.fat, facts.carbs
            );
            if log {
                let now = Local::now();
                let meal_type = meal.unwrap_or_else(|| food_lookup::meal_type_for_hour(now.hour()));
                let entry = facts.into_calorie_log(today, meal_type, Utc::now());
                service.store.save_calorie_log(&entry)?;
                println!("Logged as {} on {}. ID: {}", entry.meal_type, entry.date, entry.id);
            }
        }
        // --- Body & settings ---
        cli::Commands::AddBody {
            height,
            weight,
            body_fat,
            age,
            gender,
            activity,
            date,
        } => {
            let record = service.record_body_metrics(BodyMetricsParams {
                date,
                height,
                weight,
                body_fat_percentage: body_fat,
                age,
                gender,
                activity_level: activity,
            })?;
            println!("Recorded {:.1} kg on {}. ID: {}", record.weight, record.date, record.id);
        }
        cli::Commands::ListBody { days } => {
            let (start, end) = calendar::trailing_range(today, days);
            let records = service.store.get_body_records_by_date_range(start, end);
            if records.is_empty() {
                println!("No body records in the last {days} days.");
            } else {
                print_body_table(&records, header_color, units);
            }
        }
        cli::Commands::Settings {
            age,
            gender,
            height,
            weight,
            activity,
            goal,
            pfc,
            interval,
            protein,
            fat,
            carbs,
            body_fat,
        } => {
            let manual_macros = match (protein, fat, carbs) {
                (Some(protein), Some(fat), Some(carbs)) => Some(MacroTargets {
                    protein,
                    fat,
                    carbs,
                }),
                _ => None,
            };
            let settings = service.update_user_settings(UserSettingsParams {
                date: today,
                age,
                gender,
                height,
                weight,
                activity_level: activity,
                goal,
                pfc_mode: pfc,
                interval_timer_duration: interval,
                manual_macros,
                body_fat_percentage: body_fat,
            })?;
            println!("Settings saved.");
            print_settings(&settings);
        }
        cli::Commands::ShowSettings => match service.store.get_user_settings() {
            Some(settings) => print_settings(&settings),
            None => println!("No settings saved yet. Use 'settings' to create them."),
        },
        // --- Custom exercises ---
        cli::Commands::AddCustomExercise {
            name,
            body_part,
            equipment,
        } => {
            let exercise = service.add_custom_exercise(&name, &body_part, equipment)?;
            println!("Added custom exercise '{}'. ID: {}", exercise.name, exercise.id);
        }
        cli::Commands::ListCustomExercises { body_part } => {
            let exercises = match body_part {
                Some(part) => service.store.get_custom_exercises_by_body_part(&part),
                None => service.store.get_custom_exercises(),
            };
            if exercises.is_empty() {
                println!("No custom exercises.");
            } else {
                let mut table = styled_table(&["ID", "Name", "Body part", "Equipment"], header_color);
                for ex in exercises {
                    table.add_row(vec![
                        Cell::new(ex.id),
                        Cell::new(ex.name),
                        Cell::new(ex.body_part),
                        Cell::new(ex.equipment_type),
                    ]);
                }
                println!("{table}");
            }
        }
        cli::Commands::EditCustomExercise {
            id,
            name,
            body_part,
            equipment,
        } => {
            let updated = service.store.update_custom_exercise(
                &id,
                CustomExerciseUpdate {
                    name,
                    body_part,
                    equipment_type: equipment,
                },
            )?;
            report_update("custom exercise", &id, updated);
        }
        cli::Commands::DeleteCustomExercise { id } => {
            report_delete("custom exercise", &id, service.store.delete_custom_exercise(&id)?);
        }
        cli::Commands::ListExercises { part, user_id, db } => {
            let conn = open_remote_db(db.as_deref(), &service)?;
            let exercises = match part {
                Some(part) => db::get_exercises_by_part(&conn, part, user_id)?,
                None => db::get_all_exercises(&conn, user_id)?,
            };
            if exercises.is_empty() {
                println!("No exercises found. Run 'seed-exercises' first.");
            } else {
                let mut table = styled_table(
                    &["ID", "Name", "Part", "Equipment", "Preset"],
                    header_color,
                );
                for ex in exercises {
                    table.add_row(vec![
                        Cell::new(ex.id),
                        Cell::new(ex.name),
                        Cell::new(ex.part),
                        Cell::new(ex.equipment_type),
                        Cell::new(if ex.is_preset { "yes" } else { "no" }),
                    ]);
                }
                println!("{table}");
            }
        }
        // --- Timer ---
        cli::Commands::Timer { seconds } => match seconds {
            Some(s) => {
                service.set_timer_duration(s)?;
                println!("Default rest interval set to {s} s.");
            }
            None => println!(
                "Default rest interval: {} s",
                service.store.get_timer_settings().default_duration
            ),
        },
        cli::Commands::Rest { seconds } => {
            let duration = seconds.unwrap_or(service.store.get_timer_settings().default_duration);
            run_rest_timer(duration)?;
        }
        // --- Gym ---
        cli::Commands::SetGym {
            name,
            lat,
            lon,
            radius,
        } => {
            service.set_gym_location(GymLocation {
                name,
                latitude: lat,
                longitude: lon,
                radius,
            })?;
            println!("Gym location saved.");
        }
        cli::Commands::ShowGym => match service.store.get_gym_location() {
            Some(gym) => println!(
                "{} at ({:.6}, {:.6}), radius {:.0} m",
                gym.name, gym.latitude, gym.longitude, gym.radius
            ),
            None => println!("No gym location configured."),
        },
        cli::Commands::ClearGym => {
            service.store.clear_gym_location()?;
            println!("Gym location cleared.");
        }
        cli::Commands::Geofence { event } => {
            let event = match event {
                cli::GeofenceEventCli::Enter => GeofenceEvent::Enter,
                cli::GeofenceEventCli::Exit => GeofenceEvent::Exit,
            };
            match service.handle_geofence_event(event, Utc::now())? {
                Some(record) => println!(
                    "Recorded {} at {} ({}).",
                    record.kind,
                    record.gym_name,
                    record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                ),
                None => println!("No gym location configured; event ignored."),
            }
        }
        cli::Commands::CheckPosition {
            lat,
            lon,
            was_inside,
        } => {
            let Some(gym) = service.store.get_gym_location() else {
                bail!("No gym location configured. Use 'set-gym' first.");
            };
            let distance = geofence::haversine_distance(gym.latitude, gym.longitude, lat, lon);
            println!(
                "{:.0} m from {} ({}).",
                distance,
                gym.name,
                if gym.contains(lat, lon) { "inside" } else { "outside" }
            );
            if let Some(event) = geofence::classify_position(&gym, lat, lon, was_inside) {
                if let Some(record) = service.handle_geofence_event(event, Utc::now())? {
                    println!("Recorded {}.", record.kind);
                }
            }
        }
        cli::Commands::Checkins { limit } => {
            let history = service.store.get_check_in_history(Some(limit));
            if history.is_empty() {
                println!("No check-ins recorded.");
            } else {
                let mut table = styled_table(&["Time", "Type", "Gym"], header_color);
                for record in history {
                    table.add_row(vec![
                        Cell::new(
                            record
                                .timestamp
                                .with_timezone(&Local)
                                .format("%Y-%m-%d %H:%M"),
                        ),
                        Cell::new(record.kind),
                        Cell::new(record.gym_name),
                    ]);
                }
                println!("{table}");
            }
        }
        // --- Summaries ---
        cli::Commands::Summary { date } => {
            let summary = service.daily_summary(date);
            if export_csv {
                let mut writer = csv::Writer::from_writer(io::stdout());
                writer.serialize(&summary)?;
                writer.flush()?;
            } else {
                println!("Summary for {}", summary.date);
                println!("  Intake:  {:.0} kcal", summary.intake);
                println!("  Burned:  {:.0} kcal", summary.burned);
                println!("  Balance: {:+.0} kcal", summary.balance);
                if let Some(target) = summary.target_calories {
                    println!("  Target:  {target:.0} kcal");
                }
                println!(
                    "  {} workout(s), {:.0} min cardio",
                    summary.workouts, summary.cardio_minutes
                );
            }
        }
        cli::Commands::Calendar { year, month } => {
            let year = year.unwrap_or_else(|| today.year());
            let month = month.unwrap_or_else(|| today.month());
            print_calendar(&service, year, month, today, header_color)?;
        }
        // --- Maintenance ---
        cli::Commands::SeedExercises { db } => {
            let conn = open_remote_db(db.as_deref(), &service)?;
            let inserted =
                seed::seed_preset_exercises(&conn).context("Failed to seed preset exercises")?;
            println!(
                "Seeded {inserted} preset exercise(s) ({} in the built-in list).",
                seed::PRESET_EXERCISES.len()
            );
        }
        cli::Commands::ClearAll { yes } => {
            if !yes && !confirm("Delete ALL locally stored records? This cannot be undone.")? {
                println!("Aborted.");
                return Ok(());
            }
            service.store.clear_all()?;
            println!("All local records deleted.");
        }
        cli::Commands::StoreInfo => {
            let mut table = styled_table(&["Key", "Version"], header_color);
            for (key, version) in service.store.stored_versions()? {
                table.add_row(vec![
                    Cell::new(key),
                    Cell::new(version.map_or("-".to_string(), |v| v.to_string())),
                ]);
            }
            println!("{table}");
        }
        cli::Commands::DataPath => {
            println!("Record store is located at: {:?}", service.get_data_path());
        }
        cli::Commands::SetUnits { units } => {
            let units = match units {
                cli::UnitsCli::Metric => Units::Metric,
                cli::UnitsCli::Imperial => Units::Imperial,
            };
            service.set_units(units)?;
            println!("Units set to {units:?}.");
        }
    }

    Ok(())
}

// --- Helpers ---

fn open_remote_db(path: Option<&Path>, service: &AppService) -> Result<rusqlite::Connection> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => db::get_db_path(service.config.data_dir.as_deref())
            .context("Failed to determine database path")?,
    };
    let conn = db::open_db(&path).with_context(|| format!("Failed to open database at {path:?}"))?;
    db::init_db(&conn).context("Failed to initialize database schema")?;
    Ok(conn)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N]: ");
    stdout().flush()?;
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn report_delete(what: &str, id: &str, deleted: bool) {
    if deleted {
        println!("Deleted {what} {id}.");
    } else {
        println!("No {what} with ID {id}.");
    }
}

fn report_update(what: &str, id: &str, updated: bool) {
    if updated {
        println!("Updated {what} {id}.");
    } else {
        println!("No {what} with ID {id}.");
    }
}

fn run_rest_timer(seconds: u32) -> Result<()> {
    let mut timer = RestTimer::new(Duration::from_secs(u64::from(seconds)));
    timer.start();
    while !timer.is_finished() {
        let remaining = timer.remaining().as_secs();
        print!("\rRest: {:02}:{:02} ", remaining / 60, remaining % 60);
        stdout().flush()?;
        thread::sleep(Duration::from_secs(1));
        timer.tick(Duration::from_secs(1));
    }
    println!("\rRest over. Next set!   \x07");
    Ok(())
}

const fn weight_unit(units: Units) -> &'static str {
    match units {
        Units::Metric => "kg",
        Units::Imperial => "lbs",
    }
}

const fn distance_unit(units: Units) -> &'static str {
    match units {
        Units::Metric => "km",
        Units::Imperial => "miles",
    }
}

fn styled_table(headers: &[&str], header_color: Color) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(header_color))
                .collect::<Vec<_>>(),
        );
    table
}

// --- Table Printing Functions ---

fn print_workout_table(logs: &[WorkoutLog], header_color: Color, units: Units) {
    let w = weight_unit(units);
    let mut table = styled_table(
        &[
            "ID",
            "Date",
            "Exercise",
            "Sets",
            &format!("Volume ({w})"),
            &format!("Est. 1RM ({w})"),
            "Notes",
        ],
        header_color,
    );
    for log in logs {
        let sets = log
            .sets
            .iter()
            .map(|s| {
                let mark = if s.completed { "" } else { "~" };
                format!("{mark}{:.1}x{}", display_weight(s.weight, units), s.reps)
            })
            .collect::<Vec<_>>()
            .join(" ");
        table.add_row(vec![
            Cell::new(&log.id),
            Cell::new(log.date),
            Cell::new(&log.exercise_name),
            Cell::new(sets),
            Cell::new(format!("{:.1}", display_weight(log.total_volume, units))),
            Cell::new(format!("{:.0}", display_weight(log.estimated_1rm, units))),
            Cell::new(log.notes.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_workout_csv(logs: &[WorkoutLog], units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    let w = weight_unit(units);
    writer.write_record(&[
        "ID".to_string(),
        "Date".to_string(),
        "Exercise_ID".to_string(),
        "Exercise".to_string(),
        "Sets".to_string(),
        format!("Volume_{w}"),
        format!("Estimated_1RM_{w}"),
        "Notes".to_string(),
    ])?;
    for log in logs {
        writer.write_record(&[
            log.id.clone(),
            log.date.to_string(),
            log.exercise_id.to_string(),
            log.exercise_name.clone(),
            log.sets.len().to_string(),
            format!("{:.2}", display_weight(log.total_volume, units)),
            format!("{:.2}", display_weight(log.estimated_1rm, units)),
            log.notes.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_pr_table(records: &[PersonalRecord], header_color: Color, units: Units) {
    let w = weight_unit(units);
    let mut table = styled_table(
        &["Exercise", &format!("Best 1RM ({w})"), "Set", "Date"],
        header_color,
    );
    for record in records {
        table.add_row(vec![
            Cell::new(&record.exercise_name).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.1}", display_weight(record.best_1rm, units))),
            Cell::new(format!(
                "{:.1} x {}",
                display_weight(record.weight, units),
                record.reps
            )),
            Cell::new(record.date),
        ]);
    }
    println!("{table}");
}

fn print_pr_csv(records: &[PersonalRecord], units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    let w = weight_unit(units);
    writer.write_record(&[
        "Exercise_ID".to_string(),
        "Exercise".to_string(),
        format!("Best_1RM_{w}"),
        format!("Weight_{w}"),
        "Reps".to_string(),
        "Date".to_string(),
    ])?;
    for record in records {
        writer.write_record(&[
            record.exercise_id.to_string(),
            record.exercise_name.clone(),
            format!("{:.2}", display_weight(record.best_1rm, units)),
            format!("{:.2}", display_weight(record.weight, units)),
            record.reps.to_string(),
            record.date.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_cardio_table(logs: &[CardioLog], header_color: Color, units: Units) {
    let d = distance_unit(units);
    let mut table = styled_table(
        &["ID", "Activity", "Duration (min)", &format!("Distance ({d})"), "kcal", "Notes"],
        header_color,
    );
    for log in logs {
        table.add_row(vec![
            Cell::new(&log.id),
            Cell::new(&log.exercise_type),
            Cell::new(format!("{:.0}", log.duration)),
            Cell::new(format!("{:.2}", display_distance(log.distance, units))),
            Cell::new(format!("{:.0}", log.calories)),
            Cell::new(log.notes.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_cardio_csv(logs: &[CardioLog], units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(&[
        "ID".to_string(),
        "Date".to_string(),
        "Activity".to_string(),
        "Duration_min".to_string(),
        format!("Distance_{}", distance_unit(units)),
        "Calories".to_string(),
        "Notes".to_string(),
    ])?;
    for log in logs {
        writer.write_record(&[
            log.id.clone(),
            log.date.to_string(),
            log.exercise_type.clone(),
            format!("{:.1}", log.duration),
            format!("{:.2}", display_distance(log.distance, units)),
            format!("{:.0}", log.calories),
            log.notes.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_meal_table(logs: &[CalorieLog], header_color: Color) {
    let mut table = styled_table(
        &["ID", "Meal", "Food", "kcal", "P (g)", "F (g)", "C (g)"],
        header_color,
    );
    let fmt = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{v:.1}"));
    for log in logs {
        table.add_row(vec![
            Cell::new(&log.id),
            Cell::new(log.meal_type),
            Cell::new(&log.food_name),
            Cell::new(format!("{:.0}", log.calories)),
            Cell::new(fmt(log.protein)),
            Cell::new(fmt(log.fat)),
            Cell::new(fmt(log.carbs)),
        ]);
    }
    let total: f64 = logs.iter().map(|l| l.calories).sum();
    table.add_row(vec![
        Cell::new(""),
        Cell::new(""),
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(format!("{total:.0}")).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

fn print_meal_csv(logs: &[CalorieLog]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "ID", "Date", "Meal", "Food", "Calories", "Protein_g", "Fat_g", "Carbs_g",
    ])?;
    let fmt = |v: Option<f64>| v.map_or(String::new(), |v| format!("{v:.1}"));
    for log in logs {
        writer.write_record(&[
            log.id.clone(),
            log.date.to_string(),
            log.meal_type.to_string(),
            log.food_name.clone(),
            format!("{:.0}", log.calories),
            fmt(log.protein),
            fmt(log.fat),
            fmt(log.carbs),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_body_table(records: &[BodyRecord], header_color: Color, units: Units) {
    let mut table = styled_table(
        &[
            "Date",
            &format!("Weight ({})", weight_unit(units)),
            "Height (cm)",
            "Body fat (%)",
            "BMR (kcal)",
        ],
        header_color,
    );
    for record in records {
        let bmr = metrics::bmr(record.weight, record.height, record.age, record.gender)
            .map_or("-".to_string(), |v| format!("{v:.0}"));
        table.add_row(vec![
            Cell::new(record.date),
            Cell::new(format!("{:.1}", display_weight(record.weight, units))),
            Cell::new(format!("{:.1}", record.height)),
            Cell::new(format!("{:.1}", record.body_fat_percentage)),
            Cell::new(bmr),
        ]);
    }
    println!("{table}");
}

fn print_settings(settings: &omnitrack_lib::UserSettings) {
    println!(
        "  Profile: {} y, {}, {:.1} cm, {:.1} kg, {} activity",
        settings.age, settings.gender, settings.height, settings.weight, settings.activity_level
    );
    println!("  Goal:    {} ({})", settings.goal, settings.pfc_mode);
    println!("  BMR:     {:.0} kcal", settings.bmr);
    println!("  TDEE:    {:.0} kcal", settings.tdee);
    println!("  Target:  {:.0} kcal", settings.target_calories);
    println!(
        "  Macros:  P {:.0} g / F {:.0} g / C {:.0} g",
        settings.target_protein, settings.target_fat, settings.target_carbs
    );
    println!("  Rest:    {} s", settings.interval_timer_duration);
}

fn print_calendar(
    service: &AppService,
    year: i32,
    month: u32,
    today: NaiveDate,
    header_color: Color,
) -> Result<()> {
    let Some((first, last)) = calendar::month_bounds(year, month) else {
        bail!("Invalid month {year}-{month}.");
    };
    let marked = calendar::dates_with_records(
        service
            .store
            .get_workout_logs_by_date_range(first, last)
            .into_iter()
            .map(|log| log.date)
            .chain(
                service
                    .store
                    .get_cardio_logs_by_date_range(first, last)
                    .into_iter()
                    .map(|log| log.date),
            ),
    );

    println!("{}", first.format("%B %Y"));
    let mut table = styled_table(&["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"], header_color);
    for week in calendar::month_grid(year, month).chunks(7) {
        table.add_row(
            week.iter()
                .map(|cell| match cell {
                    Some(date) => {
                        let mut text = date.day().to_string();
                        if marked.contains(date) {
                            text.push('*');
                        }
                        let cell = Cell::new(text);
                        if *date == today {
                            cell.add_attribute(Attribute::Bold)
                        } else {
                            cell
                        }
                    }
                    None => Cell::new(""),
                })
                .collect::<Vec<_>>(),
        );
    }
    println!("{table}");
    println!("* = training day ({} this month)", marked.len());
    Ok(())
}
