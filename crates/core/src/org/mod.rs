pub mod access;
pub mod directory;
pub mod graph;
pub mod locator;

pub use access::{can_open_requests, can_view, history_scope, is_hr_member, HistoryScope};
pub use directory::{EmployeeOrder, EmployeeQuery, OrgDirectory, OrgSnapshot};
pub use graph::OrgGraph;
pub use locator::{ApproverLocator, ApproverQuery, RoutePlan, RouteStage, RoutingError, RoutingPolicy};
