use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::org::{CargoId, SectorId};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VacancyId(pub String);

impl fmt::Display for VacancyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VacancyStatus {
    Open,
    Filled,
    Closed,
}

impl VacancyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Filled => "filled",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "filled" => Some(Self::Filled),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// An opening that personnel requisitions are raised against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacancy {
    pub id: VacancyId,
    pub title: String,
    pub cargo: CargoId,
    pub sector: SectorId,
    pub status: VacancyStatus,
}

impl Vacancy {
    pub fn is_open(&self) -> bool {
        self.status == VacancyStatus::Open
    }
}
