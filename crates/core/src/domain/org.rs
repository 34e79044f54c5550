use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectorId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CargoId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CargoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Management tier carried by a cargo. A lower rank means more authority,
/// so the derived ordering sorts directors first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagementLevel {
    Director = 1,
    Manager = 2,
    Coordinator = 3,
    Supervisor = 4,
    Analyst = 5,
}

impl ManagementLevel {
    pub const ALL: [ManagementLevel; 5] =
        [Self::Director, Self::Manager, Self::Coordinator, Self::Supervisor, Self::Analyst];

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(Self::Director),
            2 => Some(Self::Manager),
            3 => Some(Self::Coordinator),
            4 => Some(Self::Supervisor),
            5 => Some(Self::Analyst),
            _ => None,
        }
    }

    pub fn outranks(self, other: ManagementLevel) -> bool {
        self.rank() < other.rank()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Director => "Diretor",
            Self::Manager => "Gestor",
            Self::Coordinator => "Coordenador",
            Self::Supervisor => "Supervisor",
            Self::Analyst => "ADM/Analista",
        }
    }
}

/// Functional identity of a sector for routing purposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorRole {
    #[default]
    General,
    HumanResources,
    PersonnelDepartment,
}

impl SectorRole {
    pub const HR_ROLES: [SectorRole; 2] = [Self::HumanResources, Self::PersonnelDepartment];

    /// Derives the role of a legacy sector from its registered name.
    pub fn classify(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "RECURSOS HUMANOS" => Self::HumanResources,
            "DEPARTAMENTO DE PESSOAL" => Self::PersonnelDepartment,
            _ => Self::General,
        }
    }

    pub fn is_hr(self) -> bool {
        matches!(self, Self::HumanResources | Self::PersonnelDepartment)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::HumanResources => "human_resources",
            Self::PersonnelDepartment => "personnel_department",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "general" => Some(Self::General),
            "human_resources" => Some(Self::HumanResources),
            "personnel_department" => Some(Self::PersonnelDepartment),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub name: String,
    pub description: Option<String>,
    pub role: SectorRole,
}

impl Sector {
    /// Builds a sector whose role is inferred from its name.
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let role = SectorRole::classify(&name);
        Self { id: SectorId(id.into()), name, description: None, role }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cargo {
    pub id: CargoId,
    pub name: String,
    pub level: ManagementLevel,
    pub description: Option<String>,
}

impl Cargo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, level: ManagementLevel) -> Self {
        Self { id: CargoId(id.into()), name: name.into(), level, description: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub active: bool,
    pub cargo: Option<CargoId>,
    /// Mirrors the level of `cargo`; the directory keeps both in sync.
    pub level: Option<ManagementLevel>,
    pub primary_sector: Option<SectorId>,
    pub responsible_sectors: BTreeSet<SectorId>,
    pub login: Option<String>,
    pub admission_date: Option<NaiveDate>,
}

impl Employee {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: EmployeeId(id.into()),
            name: name.into(),
            active: true,
            cargo: None,
            level: None,
            primary_sector: None,
            responsible_sectors: BTreeSet::new(),
            login: None,
            admission_date: None,
        }
    }

    pub fn with_cargo(mut self, cargo: &Cargo) -> Self {
        self.cargo = Some(cargo.id.clone());
        self.level = Some(cargo.level);
        self
    }

    pub fn in_sector(mut self, sector: &SectorId) -> Self {
        self.primary_sector = Some(sector.clone());
        self
    }

    pub fn responsible_for(mut self, sector: &SectorId) -> Self {
        self.responsible_sectors.insert(sector.clone());
        self
    }

    pub fn admitted(mut self, date: NaiveDate) -> Self {
        self.admission_date = Some(date);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// True when `sector` is the primary sector or one delegated to this employee.
    pub fn covers_sector(&self, sector: &SectorId) -> bool {
        self.primary_sector.as_ref() == Some(sector) || self.responsible_sectors.contains(sector)
    }

    pub fn is_director(&self) -> bool {
        self.level == Some(ManagementLevel::Director)
    }
}
