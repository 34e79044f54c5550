use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::org::EmployeeId;
use crate::domain::request::RequestId;
use crate::flows::FlowError;
use crate::org::locator::RoutingError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("employee {actor} may not view request {request}")]
    AccessDenied { actor: EmployeeId, request: RequestId },
}

impl From<RoutingError> for DomainError {
    fn from(value: RoutingError) -> Self {
        Self::Flow(FlowError::Routing(value))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("request {request} changed concurrently; gave up after {attempts} attempts")]
    Conflict { request: RequestId, attempts: u32 },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl From<FlowError> for ApplicationError {
    fn from(value: FlowError) -> Self {
        Self::Domain(DomainError::Flow(value))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }

    /// Stable machine-readable class used in CLI and log output.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::Flow(FlowError::Routing(_))) => "no_eligible_approver",
            Self::Domain(DomainError::Flow(FlowError::NotCurrentApprover { .. }))
            | Self::Domain(DomainError::AccessDenied { .. }) => "forbidden",
            Self::Domain(DomainError::Flow(FlowError::InvalidTransition { .. })) => {
                "invalid_transition"
            }
            Self::Domain(DomainError::Flow(FlowError::InvariantViolation { .. })) => {
                "invariant_violation"
            }
            Self::Domain(DomainError::Flow(FlowError::UnknownEntity { .. })) | Self::NotFound { .. } => {
                "not_found"
            }
            Self::Domain(DomainError::Flow(_)) => "validation",
            Self::Conflict { .. } => "conflict",
            Self::Persistence(_) => "persistence",
            Self::Configuration(_) => "config_validation",
        }
    }
}

const UNASSIGNED: &str = "unassigned";

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::Flow(FlowError::Routing(routing))) => {
                Self::Internal { message: routing.to_string(), correlation_id: UNASSIGNED.to_owned() }
            }
            ApplicationError::Domain(DomainError::Flow(FlowError::InvariantViolation {
                request,
                detail,
            })) => Self::Internal {
                message: format!("request {request} is inconsistent: {detail}"),
                correlation_id: UNASSIGNED.to_owned(),
            },
            ApplicationError::Domain(domain) => {
                Self::BadRequest { message: domain.to_string(), correlation_id: UNASSIGNED.to_owned() }
            }
            error @ ApplicationError::NotFound { .. } => {
                Self::BadRequest { message: error.to_string(), correlation_id: UNASSIGNED.to_owned() }
            }
            error @ (ApplicationError::Conflict { .. } | ApplicationError::Persistence(_)) => {
                Self::ServiceUnavailable {
                    message: error.to_string(),
                    correlation_id: UNASSIGNED.to_owned(),
                }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: UNASSIGNED.to_owned() }
            }
        }
    }
}
