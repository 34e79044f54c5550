pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod org;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::org::{
    Cargo, CargoId, Employee, EmployeeId, ManagementLevel, Sector, SectorId, SectorRole,
};
pub use domain::request::{RequestFilter, RequestId, RequestKind, RequestRecord, SideEffect};
pub use domain::requisition::{Requisition, RequisitionDetails, RequisitionStatus};
pub use domain::termination::{Termination, TerminationDetails, TerminationStatus};
pub use domain::transfer::{GestorSlot, Transfer, TransferDetails, TransferStatus};
pub use domain::vacancy::{Vacancy, VacancyId, VacancyStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{ApprovalFlow, FlowAction, FlowEngine, FlowError, TransitionOutcome};
pub use org::{ApproverLocator, OrgDirectory, OrgGraph, OrgSnapshot, RoutingError, RoutingPolicy};
