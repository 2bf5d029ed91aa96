#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Checking state of a solution during the scoring lifecycle.
///
/// Transitions are one-directional and driven exclusively by the async
/// answer-check consumer: `PendingCheck -> Checking -> CheckDone`.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in
/// SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum CheckState {
    /// Recorded, waiting to be picked up by the check consumer.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PendingCheck"))]
    PendingCheck,
    /// Currently being compared against the canonical answer.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Checking"))]
    Checking,
    /// Comparison finished, score is final.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CheckDone"))]
    CheckDone,
}

impl CheckState {
    /// Returns true once the score has been finalized.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::CheckDone)
    }

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingCheck => "PendingCheck",
            Self::Checking => "Checking",
            Self::CheckDone => "CheckDone",
        }
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for CheckState {
    fn default() -> Self {
        Self::PendingCheck
    }
}

/// Error when parsing an invalid state string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid check state: {invalid}")]
pub struct ParseCheckStateError {
    invalid: String,
}

impl FromStr for CheckState {
    type Err = ParseCheckStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingCheck" => Ok(Self::PendingCheck),
            "Checking" => Ok(Self::Checking),
            "CheckDone" => Ok(Self::CheckDone),
            other => Err(ParseCheckStateError {
                invalid: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for state in [
            CheckState::PendingCheck,
            CheckState::Checking,
            CheckState::CheckDone,
        ] {
            assert_eq!(state.as_str().parse::<CheckState>().unwrap(), state);
        }
    }

    #[test]
    fn rejects_unknown_state() {
        assert!("Judging".parse::<CheckState>().is_err());
    }

    #[test]
    fn only_check_done_is_terminal() {
        assert!(!CheckState::PendingCheck.is_done());
        assert!(!CheckState::Checking.is_done());
        assert!(CheckState::CheckDone.is_done());
    }

    #[test]
    fn defaults_to_pending() {
        assert_eq!(CheckState::default(), CheckState::PendingCheck);
    }
}
