//! Appliance API Type Definitions
//!
//! Request and response bodies for the aXAPI v3 calls this crate makes.
//!
//! # API Endpoints Covered
//!
//! - `POST /auth` → [`AuthRequest`] / [`AuthResponse`]
//! - `GET /ddos/dst/zone/` → [`ZoneListResponse`]
//! - `POST /logoff` → no body of interest
//!
//! Zone entries carry many more fields than the two deserialized into
//! [`Zone`]; serde ignores the rest.

use crate::zones::Zone;
use serde::{Deserialize, Serialize};

/// Body of `POST /auth`
#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub credentials: AuthCredentials<'a>,
}

#[derive(Debug, Serialize)]
pub struct AuthCredentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful `POST /auth` response
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub authresponse: AuthResponseBody,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponseBody {
    pub signature: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// `GET /ddos/dst/zone/` response
#[derive(Debug, Deserialize, Default)]
pub struct ZoneListResponse {
    #[serde(rename = "zone-list", default)]
    pub zone_list: Option<Vec<Zone>>,
}

impl ZoneListResponse {
    /// Zones in response order; a missing or null collection is empty.
    pub fn into_zones(self) -> Vec<Zone> {
        self.zone_list.unwrap_or_default()
    }
}
