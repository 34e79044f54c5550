use async_trait::async_trait;
use thiserror::Error;

use rhflow_core::audit::AuditEvent;
use rhflow_core::domain::org::{Cargo, Employee, EmployeeId, Sector};
use rhflow_core::domain::request::{RequestFilter, RequestId, RequestRecord, SideEffect};
use rhflow_core::domain::vacancy::Vacancy;
use rhflow_core::org::OrgSnapshot;

pub mod memory;
pub mod org;
pub mod request;

pub use memory::InMemoryWorkflowStore;
pub use org::SqlOrgRepository;
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("request {request} is no longer at version {expected_version}")]
    Conflict { request: RequestId, expected_version: i64 },
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} name `{name}` is already taken")]
    Duplicate { entity: &'static str, name: String },
}

impl RepositoryError {
    pub(crate) fn decode(error: impl std::fmt::Display) -> Self {
        Self::Decode(error.to_string())
    }

    /// Turns a unique-constraint violation into `Duplicate`.
    pub(crate) fn unique_name(entity: &'static str, name: &str, error: sqlx::Error) -> Self {
        let taken =
            error.as_database_error().is_some_and(|database| database.is_unique_violation());
        if taken {
            Self::Duplicate { entity, name: name.to_owned() }
        } else {
            Self::Database(error)
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Everything written atomically when a transition is accepted.
#[derive(Clone, Debug)]
pub struct TransitionCommit {
    pub record: RequestRecord,
    /// Version the record was loaded at; the write fails if storage moved on.
    pub expected_version: i64,
    pub effects: Vec<SideEffect>,
    pub audit: Vec<AuditEvent>,
}

#[async_trait]
pub trait OrgRepository: Send + Sync {
    async fn load_snapshot(&self) -> Result<OrgSnapshot, RepositoryError>;
    async fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    async fn save_sector(&self, sector: Sector) -> Result<(), RepositoryError>;
    async fn save_cargo(&self, cargo: Cargo) -> Result<(), RepositoryError>;
    async fn save_employee(&self, employee: Employee) -> Result<(), RepositoryError>;
    async fn save_vacancy(&self, vacancy: Vacancy) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_request(&self, id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError>;

    /// Matching records, oldest first.
    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<RequestRecord>, RepositoryError>;

    async fn insert_request(
        &self,
        record: RequestRecord,
        audit: Vec<AuditEvent>,
    ) -> Result<(), RepositoryError>;

    /// Persists the record, its side effects and audit events, or nothing.
    async fn commit_transition(&self, commit: TransitionCommit) -> Result<(), RepositoryError>;

    async fn append_audit(&self, event: AuditEvent) -> Result<(), RepositoryError>;

    async fn list_audit_events(
        &self,
        request: &RequestId,
    ) -> Result<Vec<AuditEvent>, RepositoryError>;
}
