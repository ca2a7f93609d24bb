//! Domain primitives: Address, TaskName.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Wallet address, normalized to lowercase `0x`-prefixed hex.
///
/// Deserialization validates and normalizes through `FromStr`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Address(pub String);

impl Address {
    /// Create an Address from a string without validation.
    pub fn new(addr: String) -> Self {
        Address(addr)
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address: {0}")]
pub struct AddressParseError(pub String);

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError(s.to_string()));
        }

        Ok(Address(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

/// The two kinds of campaign task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskName {
    #[serde(rename = "OnboardingTask")]
    Onboarding,
    #[serde(rename = "SharePoolTask")]
    SharePool,
}

impl TaskName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::Onboarding => "OnboardingTask",
            TaskName::SharePool => "SharePoolTask",
        }
    }
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task name: {0}")]
pub struct TaskNameParseError(pub String);

impl FromStr for TaskName {
    type Err = TaskNameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OnboardingTask" => Ok(TaskName::Onboarding),
            "SharePoolTask" => Ok(TaskName::SharePool),
            other => Err(TaskNameParseError(other.to_string())),
        }
    }
}
