use garde::Validate;
use serde::{Deserialize, Serialize};

/// A registered user. Only stored and returned; nothing in the job flow
/// depends on it beyond the optional `user_id` on a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub organization: Option<String>,
    pub created_at: i64,
    pub is_active: bool,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[serde(default)]
    #[garde(length(min = 1, max = 64))]
    pub id: String,

    #[serde(default)]
    #[garde(email)]
    pub email: String,

    #[serde(default)]
    #[garde(length(max = 200))]
    pub name: Option<String>,

    #[serde(default)]
    #[garde(length(max = 200))]
    pub organization: Option<String>,

    #[serde(default, deserialize_with = "super::flag::deserialize")]
    #[garde(skip)]
    pub is_active: Option<bool>,
}
