use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Thought;

// -- Auth --

/// Fields are optional so a missing one is reported as a 400 with a
/// readable message instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Returned by both `/register` and `/login`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub email: String,
    pub access_token: String,
}

// -- Thoughts --

#[derive(Debug, Default, Deserialize)]
pub struct ThoughtRequest {
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtPage {
    pub thoughts: Vec<Thought>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

// -- Index --

#[derive(Debug, Serialize)]
pub struct Endpoint {
    pub path: &'static str,
    pub methods: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [Endpoint],
}
