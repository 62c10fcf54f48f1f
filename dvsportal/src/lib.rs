//! Async client for the DVSPortal parking-permit API.
//!
//! Logs in, fetches the account's permit state (balance, reservations,
//! license plates) and issues reservation and license plate commands.

pub mod domain;
pub mod portal;
