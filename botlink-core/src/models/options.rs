//! Dropdown options shown by the workflow node UI

use serde::{Deserialize, Serialize};

/// Value used by placeholder options that must not be selectable.
pub const PLACEHOLDER_VALUE: &str = "false";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub name: String,
    pub value: String,
}

impl DropdownOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A single non-selectable entry carrying an explanation.
    pub fn placeholder(message: impl Into<String>) -> Self {
        Self::new(message, PLACEHOLDER_VALUE)
    }

    pub fn is_placeholder(&self) -> bool {
        self.value == PLACEHOLDER_VALUE
    }
}

/// Role as listed by the bot (`{name, id}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleEntry {
    pub name: String,
    pub id: String,
}

impl From<RoleEntry> for DropdownOption {
    fn from(role: RoleEntry) -> Self {
        DropdownOption::new(role.name, role.id)
    }
}
