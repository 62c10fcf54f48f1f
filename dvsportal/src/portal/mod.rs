//! DVSPortal API client.
//!
//! This module provides an async HTTP client for the DVSPortal parking
//! permit API, used by municipalities to manage visitor parking.
//!
//! Key characteristics of the portal:
//! - One login per client; the token is opaque and never refreshed
//! - Accounts are expected to hold exactly one permit
//! - Errors may arrive with a 2xx status, flagged by an `ErrorMessage` key

mod client;
mod config;
mod convert;
mod error;
mod types;

pub use client::{PortalClient, classify_response};
pub use config::{API_BASE_PATH, ConfigError, DEFAULT_TIMEOUT_SECS, PortalConfig, default_user_agent};
pub use convert::{ConvertedAccount, convert_account, select_permit_media};
pub use error::PortalError;
pub use types::{
    BaseResponse, LoginInfo, LoginResponse, MASKED_PLATE, Permit, PermitMedia, PermitMediaType,
    UpstreamLicensePlate, UpstreamReservation,
};
