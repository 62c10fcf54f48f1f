//! Domain types for the portal account.
//!
//! These are the flattened, validated forms of the portal's nested JSON.
//! They carry no transport concerns.

mod error;
mod permit;
mod reservation;
mod snapshot;

pub use error::DomainError;
pub use permit::{PermitContext, PermitDefaults, PermitSelector};
pub use reservation::{
    HistoricReservation, NewReservation, Reservation, ValidityWindow, format_portal_timestamp,
    parse_portal_timestamp,
};
pub use snapshot::{AccountSnapshot, merge_known_plates};
