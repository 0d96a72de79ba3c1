//! Status enums for sold inventory.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a sold unit.
///
/// Units leave checkout as `Active` and become `Activated` once an operator
/// runs the activation flow for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Active,
    Activated,
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Activated => write!(f, "activated"),
        }
    }
}

impl std::str::FromStr for UnitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "activated" => Ok(Self::Activated),
            _ => Err(format!("invalid unit status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_from_str_roundtrip() {
        for status in [UnitStatus::Active, UnitStatus::Activated] {
            let parsed: UnitStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&UnitStatus::Activated).unwrap(),
            "\"activated\""
        );
        let parsed: UnitStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(parsed, UnitStatus::Active);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("retired".parse::<UnitStatus>().is_err());
    }
}
