use serde::{Deserialize, Serialize};

use crate::domain::org::{Employee, ManagementLevel};
use crate::domain::request::RequestRecord;
use crate::org::directory::OrgDirectory;

/// Which finished requests an employee may browse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryScope {
    All,
    /// Requests the employee approved, rejected or returned.
    Participated,
    Requested,
    None,
}

pub fn is_hr_member(employee: &Employee, directory: &dyn OrgDirectory) -> bool {
    employee
        .primary_sector
        .as_ref()
        .and_then(|id| directory.sector(id))
        .is_some_and(|sector| sector.role.is_hr())
}

pub fn can_open_requests(employee: &Employee) -> bool {
    employee.active && employee.level.is_some()
}

pub fn can_view(actor: &Employee, record: &RequestRecord, directory: &dyn OrgDirectory) -> bool {
    if !actor.active {
        return false;
    }
    if actor.is_director() || is_hr_member(actor, directory) {
        return true;
    }
    if record.requester() == &actor.id || record.subject() == Some(&actor.id) {
        return true;
    }
    if record.pending_approvers().contains(&actor.id) || record.participants().contains(&actor.id)
    {
        return true;
    }

    match record {
        RequestRecord::Requisition(requisition) => {
            let requester_level =
                directory.employee(&requisition.requester).and_then(|requester| requester.level);
            matches!(
                (actor.level, requester_level),
                (Some(actor_level), Some(requester_level)) if actor_level.outranks(requester_level)
            )
        }
        _ => false,
    }
}

pub fn history_scope(actor: &Employee, directory: &dyn OrgDirectory) -> HistoryScope {
    if !actor.active {
        return HistoryScope::None;
    }
    if actor.is_director() || is_hr_member(actor, directory) {
        return HistoryScope::All;
    }
    match actor.level {
        Some(ManagementLevel::Manager | ManagementLevel::Coordinator) => HistoryScope::Participated,
        Some(_) => HistoryScope::Requested,
        None => HistoryScope::None,
    }
}
