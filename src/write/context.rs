//! Acting context
//!
//! Identity of whoever is performing writes, recorded in activity log
//! entries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingContext {
    pub user_id: String,
    pub role_id: String,
}

impl ActingContext {
    pub fn new(user_id: impl Into<String>, role_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role_id: role_id.into(),
        }
    }
}
