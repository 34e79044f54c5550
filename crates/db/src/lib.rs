pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod service;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{DemoOrganization, SeedResult, VerificationResult};
pub use repositories::{
    InMemoryWorkflowStore, OrgRepository, RepositoryError, RequestRepository, SqlOrgRepository,
    SqlRequestRepository, TransitionCommit,
};
pub use service::RequestService;
