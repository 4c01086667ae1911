use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bitflow_core::DomainError;

/// Platform role of an authenticated actor.
///
/// The set is closed: every role the platform issues tokens for is listed here,
/// so policy code can match exhaustively.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    BitflowOwner,
    PublisherAdmin,
    CollegeAdmin,
    CollegeDean,
    CollegeHod,
    Faculty,
    Student,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::BitflowOwner,
        Role::PublisherAdmin,
        Role::CollegeAdmin,
        Role::CollegeDean,
        Role::CollegeHod,
        Role::Faculty,
        Role::Student,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::BitflowOwner => "BITFLOW_OWNER",
            Role::PublisherAdmin => "PUBLISHER_ADMIN",
            Role::CollegeAdmin => "COLLEGE_ADMIN",
            Role::CollegeDean => "COLLEGE_DEAN",
            Role::CollegeHod => "COLLEGE_HOD",
            Role::Faculty => "FACULTY",
            Role::Student => "STUDENT",
        }
    }

    /// Platform-wide oversight role; may address any college.
    pub fn is_platform_owner(&self) -> bool {
        matches!(self, Role::BitflowOwner)
    }

    /// Roles whose data access is bounded by a single college.
    pub fn is_college_scoped(&self) -> bool {
        matches!(
            self,
            Role::CollegeAdmin | Role::CollegeDean | Role::CollegeHod | Role::Faculty | Role::Student
        )
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::unknown_variant("role", s))
    }
}
