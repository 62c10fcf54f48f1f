//! Normalized reservation types.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Start and end of a reservation, as reported by the portal.
///
/// The portal sends local timestamps without an offset, sometimes only a
/// date. The raw strings are kept; [`ValidityWindow::parse_from`] and
/// [`ValidityWindow::parse_until`] interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidityWindow {
    pub from: String,
    pub until: String,
}

impl ValidityWindow {
    pub fn new(from: impl Into<String>, until: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            until: until.into(),
        }
    }

    pub fn parse_from(&self) -> Option<NaiveDateTime> {
        parse_portal_timestamp(&self.from)
    }

    pub fn parse_until(&self) -> Option<NaiveDateTime> {
        parse_portal_timestamp(&self.until)
    }
}

/// Parse a portal timestamp: `YYYY-MM-DDTHH:MM:SS[.fff]` or a bare date
/// (midnight).
pub fn parse_portal_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Render a timestamp the way the portal expects it (ISO 8601, no offset).
pub fn format_portal_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Input for creating a reservation.
///
/// A missing start means "now"; a missing end is left for the portal to
/// decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub license_plate_value: String,
    pub license_plate_name: Option<String>,
    pub date_from: Option<NaiveDateTime>,
    pub date_until: Option<NaiveDateTime>,
}

impl NewReservation {
    pub fn new(license_plate_value: impl Into<String>) -> Self {
        Self {
            license_plate_value: license_plate_value.into(),
            license_plate_name: None,
            date_from: None,
            date_until: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.license_plate_name = Some(name.into());
        self
    }

    pub fn starting(mut self, from: NaiveDateTime) -> Self {
        self.date_from = Some(from);
        self
    }

    pub fn until(mut self, until: NaiveDateTime) -> Self {
        self.date_until = Some(until);
        self
    }
}

/// An active reservation on the account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub reservation_id: String,
    pub validity: ValidityWindow,
    pub license_plate: String,
    pub units: u32,
    /// `units × unit_price`; `None` when the unit price was unknown at mapping time.
    pub cost: Option<f64>,
}

/// A past reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricReservation {
    pub reservation_id: String,
    pub validity: ValidityWindow,
    pub units: u32,
}
