//! Closed role enumeration with a total-order rank.
//!
//! This is a coarse hierarchy, not a capability graph: librarian and
//! accountant share a rank below teacher and satisfy each other's requirement
//! at that rank only. Unknown role strings are rejected at the boundary
//! instead of silently defaulting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Teacher,
    Librarian,
    Accountant,
    Parent,
    Student,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl Role {
    const fn rank(self) -> u8 {
        match self {
            Self::SuperAdmin => 6,
            Self::Admin => 5,
            Self::Teacher => 4,
            Self::Librarian | Self::Accountant => 3,
            Self::Parent => 2,
            Self::Student => 1,
        }
    }

    /// Whether this role satisfies a requirement of `required`.
    ///
    /// Rank comparison only; it must not be used to tell same-rank roles
    /// apart.
    #[must_use]
    pub fn has_permission(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super-admin",
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Librarian => "librarian",
            Self::Accountant => "accountant",
            Self::Parent => "parent",
            Self::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "super-admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "teacher" => Ok(Self::Teacher),
            "librarian" => Ok(Self::Librarian),
            "accountant" => Ok(Self::Accountant),
            "parent" => Ok(Self::Parent),
            "student" => Ok(Self::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
