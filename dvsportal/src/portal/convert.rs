//! Conversion from portal DTOs to domain types.
//!
//! Validates the single-permit invariant and flattens the nested
//! `login/getbase` payload into an [`AccountSnapshot`].

use std::collections::HashMap;

use crate::domain::{
    AccountSnapshot, HistoricReservation, PermitDefaults, Reservation, ValidityWindow,
    merge_known_plates,
};

use super::error::PortalError;
use super::types::{BaseResponse, Permit, PermitMedia, UpstreamReservation};

/// Result of converting an account payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedAccount {
    /// Permit-media identity to use as the command default.
    pub defaults: PermitDefaults,
    pub snapshot: AccountSnapshot,
}

/// Pick the one permit and its first permit-media.
///
/// Accounts with zero or several permits are rejected.
pub fn select_permit_media(base: &BaseResponse) -> Result<(&Permit, &PermitMedia), PortalError> {
    let permit = match base.permits.as_slice() {
        [] => return Err(PortalError::api_message("No zonal code found")),
        [permit] => permit,
        _ => return Err(PortalError::api_message("More than one zonal code found")),
    };

    let media = permit
        .permit_medias
        .first()
        .ok_or_else(|| PortalError::api_message("No permit media found"))?;

    Ok((permit, media))
}

/// Convert a `login/getbase` response into defaults plus a fresh snapshot.
pub fn convert_account(base: &BaseResponse) -> Result<ConvertedAccount, PortalError> {
    let (permit, media) = select_permit_media(base)?;
    let unit_price = permit.unit_price;

    let active_reservations = media
        .active_reservations
        .iter()
        .map(|r| (r.license_plate.value.clone(), convert_reservation(r, unit_price)))
        .collect();

    let visible_history = || {
        media
            .history
            .reservations
            .items
            .iter()
            .filter(|item| !item.license_plate.is_masked())
    };

    let historic_reservations: HashMap<String, HistoricReservation> = visible_history()
        .map(|item| {
            (
                item.license_plate.value.clone(),
                convert_historic(item),
            )
        })
        .collect();

    let known_license_plates = merge_known_plates(
        visible_history().map(|item| item.license_plate.display().to_string()),
        media
            .active_reservations
            .iter()
            .map(|r| r.license_plate.value.clone()),
        media
            .license_plates
            .iter()
            .map(|p| (p.value.clone(), p.name.clone().unwrap_or_default())),
    );

    Ok(ConvertedAccount {
        defaults: PermitDefaults {
            type_id: Some(media.type_id),
            code: Some(media.code.clone()),
        },
        snapshot: AccountSnapshot {
            balance: Some(media.balance),
            unit_price,
            active_reservations,
            historic_reservations,
            known_license_plates,
        },
    })
}

/// Convert an active reservation; cost is only known with a nonzero unit price.
pub fn convert_reservation(r: &UpstreamReservation, unit_price: Option<f64>) -> Reservation {
    let cost = unit_price
        .filter(|price| *price != 0.0)
        .map(|price| f64::from(r.units) * price);

    Reservation {
        reservation_id: r.reservation_id.clone(),
        validity: ValidityWindow::new(&r.valid_from, &r.valid_until),
        license_plate: r.license_plate.value.clone(),
        units: r.units,
        cost,
    }
}

fn convert_historic(r: &UpstreamReservation) -> HistoricReservation {
    HistoricReservation {
        reservation_id: r.reservation_id.clone(),
        validity: ValidityWindow::new(&r.valid_from, &r.valid_until),
        units: r.units,
    }
}
