// src/geofence.rs
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::records::{new_record_id, CheckInRecord, CheckInType, GymLocation};
use crate::store::{RecordStore, StoreError};

const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const DEFAULT_RADIUS_M: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeofenceEvent {
    Enter,
    Exit,
}

impl From<GeofenceEvent> for CheckInType {
    fn from(event: GeofenceEvent) -> Self {
        match event {
            GeofenceEvent::Enter => Self::CheckIn,
            GeofenceEvent::Exit => Self::CheckOut,
        }
    }
}

/// Great-circle distance in metres between two WGS84 points.
#[must_use]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

impl GymLocation {
    /// Whether a point lies inside the gym's circular region (boundary included).
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        haversine_distance(self.latitude, self.longitude, latitude, longitude) <= self.radius
    }

    /// Coordinates and radius are usable for a region.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.radius.is_finite()
            && self.radius > 0.0
            && !self.name.trim().is_empty()
    }
}

/// Event produced when a position update crosses the region boundary.
#[must_use]
pub fn classify_position(
    gym: &GymLocation,
    latitude: f64,
    longitude: f64,
    was_inside: bool,
) -> Option<GeofenceEvent> {
    match (was_inside, gym.contains(latitude, longitude)) {
        (false, true) => Some(GeofenceEvent::Enter),
        (true, false) => Some(GeofenceEvent::Exit),
        _ => None,
    }
}

/// Records a check-in/out for the configured gym. Runs from the background
/// geofence callback; goes through the store's collection lock like any
/// foreground write. Returns `None` when no gym is configured.
/// # Errors
/// Returns `StoreError` if the check-in history cannot be updated.
pub fn handle_geofence_event(
    store: &RecordStore,
    event: GeofenceEvent,
    now: DateTime<Utc>,
) -> Result<Option<CheckInRecord>, StoreError> {
    let Some(gym) = store.get_gym_location() else {
        debug!(?event, "geofence event without a configured gym, ignoring");
        return Ok(None);
    };
    let record = CheckInRecord {
        id: new_record_id(),
        kind: event.into(),
        timestamp: now,
        gym_name: gym.name,
    };
    store.save_check_in(&record)?;
    info!(kind = %record.kind, gym = %record.gym_name, "geofence check-in recorded");
    Ok(Some(record))
}
