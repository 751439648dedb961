use anyhow::Result;
use chrono::{NaiveDate, Utc};
use omnitrack_lib::calendar::{
    dates_with_records, month_bounds, month_grid, shift_month, trailing_range, week_range,
    GRID_CELLS,
};
use omnitrack_lib::geofence::{
    classify_position, handle_geofence_event, haversine_distance, GeofenceEvent,
};
use omnitrack_lib::timer::{RestTimer, TimerState};
use omnitrack_lib::{CheckInType, GymLocation, MemoryStore, RecordStore, TimerSettings};
use std::sync::Arc;
use std::time::Duration;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn gym() -> GymLocation {
    GymLocation {
        name: "Riverside Gym".to_string(),
        latitude: 48.8566,
        longitude: 2.3522,
        radius: 100.0,
    }
}

// --- Calendar ---

#[test]
fn test_month_grid_five_weeks() {
    // February 2026 starts on a Sunday and has 28 days
    let grid = month_grid(2026, 2);
    assert_eq!(grid.len(), GRID_CELLS);
    assert_eq!(grid[0], Some(date(2026, 2, 1)));
    assert_eq!(grid[27], Some(date(2026, 2, 28)));
    assert!(grid[28..].iter().all(Option::is_none));

    // June 2024 starts on a Saturday: 6 leading blanks, 30 days
    let june = month_grid(2024, 6);
    assert_eq!(june.len(), 42);
    assert!(june[..6].iter().all(Option::is_none));
    assert_eq!(june[6], Some(date(2024, 6, 1)));
    assert_eq!(june[35], Some(date(2024, 6, 30)));
}

#[test]
fn test_month_grid_padding() {
    // May 2024 starts on a Wednesday
    let grid = month_grid(2024, 5);
    assert_eq!(grid.len(), 35);
    assert_eq!(grid.iter().take_while(|c| c.is_none()).count(), 3);
    assert_eq!(grid.iter().flatten().count(), 31);
    assert!(month_grid(2024, 13).is_empty());
}

#[test]
fn test_ranges_and_month_navigation() {
    assert_eq!(
        month_bounds(2024, 2),
        Some((date(2024, 2, 1), date(2024, 2, 29)))
    );
    assert_eq!(
        month_bounds(2023, 12),
        Some((date(2023, 12, 1), date(2023, 12, 31)))
    );
    assert_eq!(month_bounds(2024, 0), None);

    // 2024-05-15 is a Wednesday
    assert_eq!(
        week_range(date(2024, 5, 15)),
        (date(2024, 5, 12), date(2024, 5, 18))
    );
    assert_eq!(
        week_range(date(2024, 5, 12)),
        (date(2024, 5, 12), date(2024, 5, 18))
    );
    assert_eq!(
        trailing_range(date(2024, 3, 2), 7),
        (date(2024, 2, 25), date(2024, 3, 2))
    );
    assert_eq!(
        trailing_range(date(2024, 3, 2), 0),
        (date(2024, 3, 2), date(2024, 3, 2))
    );

    assert_eq!(shift_month(2024, 1, -1), (2023, 12));
    assert_eq!(shift_month(2024, 12, 1), (2025, 1));
    assert_eq!(shift_month(2024, 5, -17), (2022, 12));
    assert_eq!(shift_month(2024, 5, 0), (2024, 5));
}

#[test]
fn test_ranges_clamp_at_calendar_limits() {
    let end = date(2024, 3, 1);
    assert_eq!(trailing_range(end, u32::MAX), (NaiveDate::MIN, end));
    assert_eq!(trailing_range(NaiveDate::MIN, 30), (NaiveDate::MIN, NaiveDate::MIN));

    let (start, last) = week_range(NaiveDate::MAX);
    assert_eq!(last, NaiveDate::MAX);
    assert!(start <= last);
    let (first, end) = week_range(NaiveDate::MIN);
    assert_eq!(first, NaiveDate::MIN);
    assert!(end >= first);
}

#[test]
fn test_dates_with_records_dedupes() {
    let marked = dates_with_records(vec![
        date(2024, 5, 3),
        date(2024, 5, 1),
        date(2024, 5, 3),
    ]);
    assert_eq!(marked.len(), 2);
    assert_eq!(marked.iter().next(), Some(&date(2024, 5, 1)));
}

// --- Rest timer ---

#[test]
fn test_timer_counts_down_to_finish() {
    let mut timer = RestTimer::from_settings(TimerSettings::default());
    assert_eq!(timer.state(), TimerState::Idle);
    assert_eq!(timer.remaining(), Duration::from_secs(90));

    // Idle timers ignore ticks
    assert!(!timer.tick(Duration::from_secs(10)));
    assert_eq!(timer.remaining(), Duration::from_secs(90));

    timer.start();
    assert!(!timer.tick(Duration::from_secs(60)));
    assert_eq!(timer.remaining(), Duration::from_secs(30));
    assert!(timer.tick(Duration::from_secs(45)));
    assert!(timer.is_finished());
    assert_eq!(timer.remaining(), Duration::ZERO);
    // Only the finishing tick reports completion
    assert!(!timer.tick(Duration::from_secs(1)));
}

#[test]
fn test_timer_pause_resume_adjust_reset() {
    let mut timer = RestTimer::new(Duration::from_secs(60));
    timer.start();
    timer.tick(Duration::from_secs(20));
    timer.pause();
    assert_eq!(timer.state(), TimerState::Paused);
    timer.tick(Duration::from_secs(20));
    assert_eq!(timer.remaining(), Duration::from_secs(40));

    timer.resume();
    timer.add_seconds(15);
    assert_eq!(timer.remaining(), Duration::from_secs(55));
    timer.add_seconds(-100);
    assert!(timer.is_finished());

    timer.add_seconds(10);
    assert_eq!(timer.state(), TimerState::Running);

    timer.reset();
    assert_eq!(timer.state(), TimerState::Idle);
    assert_eq!(timer.remaining(), Duration::from_secs(60));

    let mut empty = RestTimer::new(Duration::ZERO);
    empty.start();
    assert!(empty.is_finished());
}

// --- Geofence ---

#[test]
fn test_haversine_distance() {
    assert_eq!(haversine_distance(10.0, 20.0, 10.0, 20.0), 0.0);
    // One degree of latitude is about 111.2 km
    let degree = haversine_distance(0.0, 0.0, 1.0, 0.0);
    assert!((degree - 111_195.0).abs() < 10.0, "got {degree}");
    // Paris to London, roughly 344 km
    let paris_london = haversine_distance(48.8566, 2.3522, 51.5074, -0.1278);
    assert!((paris_london - 343_500.0).abs() < 1_500.0, "got {paris_london}");
}

#[test]
fn test_region_contains_and_validation() {
    let gym = gym();
    assert!(gym.contains(48.8566, 2.3522));
    // About 55 m north
    assert!(gym.contains(48.8571, 2.3522));
    // About 220 m north
    assert!(!gym.contains(48.8586, 2.3522));

    assert!(gym.is_valid());
    assert!(!GymLocation {
        radius: 0.0,
        ..gym.clone()
    }
    .is_valid());
    assert!(!GymLocation {
        longitude: 181.0,
        ..gym.clone()
    }
    .is_valid());
    assert!(!GymLocation {
        name: " ".to_string(),
        ..gym
    }
    .is_valid());
}

#[test]
fn test_classify_position_transitions() {
    let gym = gym();
    let (inside_lat, inside_lon) = (48.8566, 2.3522);
    let (outside_lat, outside_lon) = (48.8700, 2.3522);

    assert_eq!(
        classify_position(&gym, inside_lat, inside_lon, false),
        Some(GeofenceEvent::Enter)
    );
    assert_eq!(
        classify_position(&gym, outside_lat, outside_lon, true),
        Some(GeofenceEvent::Exit)
    );
    assert_eq!(classify_position(&gym, inside_lat, inside_lon, true), None);
    assert_eq!(
        classify_position(&gym, outside_lat, outside_lon, false),
        None
    );
}

#[test]
fn test_geofence_events_write_check_ins() -> Result<()> {
    let store = RecordStore::new(Arc::new(MemoryStore::new()));
    let now = Utc::now();
    assert!(handle_geofence_event(&store, GeofenceEvent::Enter, now)?.is_none());
    assert!(store.get_check_in_history(None).is_empty());

    store.save_gym_location(&gym())?;
    let record = handle_geofence_event(&store, GeofenceEvent::Enter, now)?
        .expect("gym is configured");
    assert_eq!(record.kind, CheckInType::CheckIn);
    assert_eq!(record.gym_name, "Riverside Gym");
    assert_eq!(record.timestamp, now);

    let history = store.get_check_in_history(None);
    assert_eq!(history, vec![record]);
    Ok(())
}
