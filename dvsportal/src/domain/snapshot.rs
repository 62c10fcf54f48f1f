//! The account state captured by one `update()`.

use std::collections::HashMap;

use serde::Serialize;

use super::reservation::{HistoricReservation, Reservation};

/// Everything derived from the last successful account fetch.
///
/// Replaced wholesale on every update; never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub balance: Option<f64>,
    pub unit_price: Option<f64>,
    /// Active reservations keyed by license plate value.
    pub active_reservations: HashMap<String, Reservation>,
    /// Past reservations keyed by license plate value.
    pub historic_reservations: HashMap<String, HistoricReservation>,
    /// License plate value to display name (empty when unnamed).
    pub known_license_plates: HashMap<String, String>,
}

/// Merge the three license plate sources into one map.
///
/// Later sources win: plates seen in history, then plates with an active
/// reservation, then plates stored with a name.
pub fn merge_known_plates<H, A, N>(history: H, active: A, named: N) -> HashMap<String, String>
where
    H: IntoIterator<Item = String>,
    A: IntoIterator<Item = String>,
    N: IntoIterator<Item = (String, String)>,
{
    let mut plates = HashMap::new();
    for plate in history.into_iter().chain(active) {
        plates.insert(plate, String::new());
    }
    plates.extend(named);
    plates
}
