//! DVSPortal API DTOs.
//!
//! Response types map directly to the portal's JSON. The portal omits
//! empty collections or sends `null` rather than `[]`, so lists default
//! to empty.
//! Request payloads mirror the portal's mixed key casing exactly.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Response from `GET login`: metadata needed before logging in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginInfo {
    pub permit_media_types: Vec<PermitMediaType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermitMediaType {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

/// Response from `POST login`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginResponse {
    /// `2` means the credentials were rejected. Sent as a number, but
    /// tolerated as a string.
    #[serde(default)]
    pub login_status: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub token: Option<Value>,
}

/// Sentinel `LoginStatus` for rejected credentials.
pub const LOGIN_STATUS_FAILED: i64 = 2;

impl LoginResponse {
    pub fn is_rejected(&self) -> bool {
        match &self.login_status {
            Some(Value::Number(n)) => n.as_i64() == Some(LOGIN_STATUS_FAILED),
            Some(Value::String(s)) => s.trim() == LOGIN_STATUS_FAILED.to_string(),
            _ => false,
        }
    }

    /// Token in string form. Non-string tokens use their JSON rendering.
    pub fn token_string(&self) -> Option<String> {
        match self.token.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Response from `login/getbase`: the account snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permits: Vec<Permit>,
}

/// An account-level parking authorization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Permit {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permit_medias: Vec<PermitMedia>,
    #[serde(default)]
    pub unit_price: Option<f64>,
}

/// A code/type pair under a permit; holds balance, reservations and plates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermitMedia {
    #[serde(rename = "TypeID")]
    pub type_id: i64,
    pub code: String,
    pub balance: f64,
    #[serde(default)]
    pub remaining_upgrades: Option<i64>,
    #[serde(default)]
    pub remaining_downgrades: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub active_reservations: Vec<UpstreamReservation>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub license_plates: Vec<UpstreamLicensePlate>,
    #[serde(default)]
    pub history: History,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct History {
    #[serde(default)]
    pub reservations: HistoryReservations,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryReservations {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<UpstreamReservation>,
}

/// A reservation as the portal reports it, both active and historic.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpstreamReservation {
    #[serde(rename = "ReservationID", deserialize_with = "string_or_number")]
    pub reservation_id: String,
    pub valid_from: String,
    pub valid_until: String,
    pub license_plate: UpstreamLicensePlate,
    pub units: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpstreamLicensePlate {
    pub value: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Shown instead of `value`; masked as [`MASKED_PLATE`] for hidden plates.
    #[serde(default)]
    pub display_value: Option<String>,
}

/// Placeholder the portal shows for plates the account may not see.
pub const MASKED_PLATE: &str = "********";

impl UpstreamLicensePlate {
    pub fn display(&self) -> &str {
        self.display_value.as_deref().unwrap_or(&self.value)
    }

    pub fn is_masked(&self) -> bool {
        self.display() == MASKED_PLATE
    }
}

/// The portal sends `null` for empty collections as often as it omits them.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Body of `POST login`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub identifier: &'a str,
    pub login_method: &'a str,
    pub password: &'a str,
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: i64,
}

/// Login method tag for identifier/password accounts.
pub const LOGIN_METHOD: &str = "Pas";

/// License plate as sent to the portal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LicensePlatePayload<'a> {
    pub value: &'a str,
    pub name: Option<&'a str>,
}

/// Body of `reservation/end`.
#[derive(Debug, Serialize)]
pub struct EndReservationRequest<'a> {
    #[serde(rename = "ReservationID")]
    pub reservation_id: &'a str,
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: i64,
    #[serde(rename = "permitMediaCode")]
    pub permit_media_code: &'a str,
}

/// Body of `reservation/create`.
#[derive(Debug, Serialize)]
pub struct CreateReservationRequest<'a> {
    #[serde(rename = "DateFrom")]
    pub date_from: String,
    #[serde(rename = "DateUntil", skip_serializing_if = "Option::is_none")]
    pub date_until: Option<String>,
    #[serde(rename = "LicensePlate")]
    pub license_plate: LicensePlatePayload<'a>,
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: i64,
    #[serde(rename = "permitMediaCode")]
    pub permit_media_code: &'a str,
}

/// Body of `permitmedialicenseplate/upsert`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLicensePlateRequest<'a> {
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: i64,
    pub permit_media_code: &'a str,
    pub license_plate: LicensePlatePayload<'a>,
    /// Always sent as `null`.
    pub update_license_plate: Option<LicensePlatePayload<'a>>,
}

/// Body of `permitmedialicenseplate/remove`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLicensePlateRequest<'a> {
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: i64,
    pub permit_media_code: &'a str,
    pub license_plate: &'a str,
    pub name: &'a str,
}
