//! Ledger categories.
//!
//! The set is closed. `Rent` and `Security Deposit` count as income, the rest
//! as expenses; the partition is a fixed domain rule.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Rent,
    Maintenance,
    #[serde(rename = "Security Deposit")]
    SecurityDeposit,
    Utilities,
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 5] = [
        Self::Rent,
        Self::Maintenance,
        Self::SecurityDeposit,
        Self::Utilities,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rent => "Rent",
            Self::Maintenance => "Maintenance",
            Self::SecurityDeposit => "Security Deposit",
            Self::Utilities => "Utilities",
            Self::Other => "Other",
        }
    }

    pub fn is_income(self) -> bool {
        matches!(self, Self::Rent | Self::SecurityDeposit)
    }

    pub fn is_expense(self) -> bool {
        !self.is_income()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Category {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| EngineError::InvalidInput(format!("invalid category: {value}")))
    }
}
