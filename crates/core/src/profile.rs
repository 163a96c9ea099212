//! The user profile agents build their prompts from.
//!
//! Profile storage and editing belong to the surrounding application; the
//! core only reads it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name
    #[serde(default)]
    pub name: String,

    /// The user's current or most recent role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_role: Option<String>,

    /// The role the user is working towards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role: Option<String>,

    #[serde(default)]
    pub experience_years: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub industries: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Free-text resume summary, if the user uploaded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_summary: Option<String>,
}

impl UserProfile {
    /// Target role, falling back to the current role, then a generic label.
    pub fn goal_role(&self) -> &str {
        self.target_role
            .as_deref()
            .or(self.current_role.as_deref())
            .unwrap_or("a new role")
    }
}
