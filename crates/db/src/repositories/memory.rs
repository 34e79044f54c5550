use std::collections::HashMap;

use tokio::sync::RwLock;

use rhflow_core::audit::AuditEvent;
use rhflow_core::domain::org::{Cargo, Employee, EmployeeId, Sector};
use rhflow_core::domain::request::{RequestFilter, RequestId, RequestRecord};
use rhflow_core::domain::vacancy::Vacancy;
use rhflow_core::org::{OrgDirectory, OrgSnapshot};

use super::{OrgRepository, RepositoryError, RequestRepository, TransitionCommit};

#[derive(Default)]
struct WorkflowState {
    org: OrgSnapshot,
    requests: HashMap<RequestId, RequestRecord>,
    audit: Vec<AuditEvent>,
}

/// Organization and request storage kept in process memory.
///
/// All state sits behind one lock so a transition, its side effects and its
/// audit events become visible together.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    state: RwLock<WorkflowState>,
}

impl InMemoryWorkflowStore {
    pub fn with_snapshot(org: OrgSnapshot) -> Self {
        Self { state: RwLock::new(WorkflowState { org, ..WorkflowState::default() }) }
    }
}

#[async_trait::async_trait]
impl OrgRepository for InMemoryWorkflowStore {
    async fn load_snapshot(&self) -> Result<OrgSnapshot, RepositoryError> {
        Ok(self.state.read().await.org.clone())
    }

    async fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.state.read().await.org.employee(id).cloned())
    }

    async fn save_sector(&self, sector: Sector) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.org.sectors().any(|other| other.name == sector.name && other.id != sector.id) {
            return Err(RepositoryError::Duplicate { entity: "sector", name: sector.name });
        }
        state.org.insert_sector(sector);
        Ok(())
    }

    async fn save_cargo(&self, cargo: Cargo) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.org.cargos().any(|other| other.name == cargo.name && other.id != cargo.id) {
            return Err(RepositoryError::Duplicate { entity: "cargo", name: cargo.name });
        }
        state.org.insert_cargo(cargo);
        Ok(())
    }

    async fn save_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        self.state.write().await.org.insert_employee(employee);
        Ok(())
    }

    async fn save_vacancy(&self, vacancy: Vacancy) -> Result<(), RepositoryError> {
        self.state.write().await.org.insert_vacancy(vacancy);
        Ok(())
    }
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryWorkflowStore {
    async fn find_request(&self, id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError> {
        Ok(self.state.read().await.requests.get(id).cloned())
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<RequestRecord>, RepositoryError> {
        let state = self.state.read().await;
        let mut found: Vec<RequestRecord> =
            state.requests.values().filter(|record| filter.matches(record)).cloned().collect();
        found.sort_by(|left, right| {
            left.created_at().cmp(&right.created_at()).then_with(|| left.id().cmp(right.id()))
        });
        Ok(found)
    }

    async fn insert_request(
        &self,
        record: RequestRecord,
        audit: Vec<AuditEvent>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.requests.insert(record.id().clone(), record);
        state.audit.extend(audit);
        Ok(())
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let id = commit.record.id().clone();

        let stored_version = state
            .requests
            .get(&id)
            .map(RequestRecord::version)
            .ok_or_else(|| RepositoryError::NotFound { entity: "request", id: id.to_string() })?;
        if stored_version != commit.expected_version {
            return Err(RepositoryError::Conflict {
                request: id,
                expected_version: commit.expected_version,
            });
        }
        if let Some(missing) =
            commit.effects.iter().find(|effect| state.org.employee(effect.employee()).is_none())
        {
            return Err(RepositoryError::NotFound {
                entity: "employee",
                id: missing.employee().to_string(),
            });
        }

        for effect in &commit.effects {
            state.org.apply_effect(effect);
        }
        state.requests.insert(id, commit.record);
        state.audit.extend(commit.audit);
        Ok(())
    }

    async fn append_audit(&self, event: AuditEvent) -> Result<(), RepositoryError> {
        self.state.write().await.audit.push(event);
        Ok(())
    }

    async fn list_audit_events(
        &self,
        request: &RequestId,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .audit
            .iter()
            .filter(|event| event.request_id.as_ref() == Some(request))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use rhflow_core::domain::org::{Cargo, EmployeeId, ManagementLevel, Sector};
    use rhflow_core::domain::request::{RequestFilter, RequestRecord, SideEffect};
    use rhflow_core::flows::{FlowAction, FlowEngine};
    use rhflow_core::org::RoutingPolicy;

    use super::InMemoryWorkflowStore;
    use crate::fixtures::DemoOrganization;
    use crate::repositories::{OrgRepository, RepositoryError, RequestRepository, TransitionCommit};

    fn id(value: &str) -> EmployeeId {
        EmployeeId(value.to_owned())
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected_like_the_database() {
        let store = InMemoryWorkflowStore::default();
        store.save_sector(Sector::named("s-1", "LOGISTICA")).await.expect("first sector");
        let sector = store.save_sector(Sector::named("s-2", "LOGISTICA")).await;
        assert!(matches!(sector, Err(RepositoryError::Duplicate { entity: "sector", .. })));

        store
            .save_cargo(Cargo::new("c-1", "Gerente", ManagementLevel::Manager))
            .await
            .expect("first cargo");
        let cargo = store.save_cargo(Cargo::new("c-2", "Gerente", ManagementLevel::Manager)).await;
        assert!(matches!(cargo, Err(RepositoryError::Duplicate { entity: "cargo", .. })));
        store
            .save_cargo(Cargo::new("c-1", "Gerente", ManagementLevel::Coordinator))
            .await
            .expect("same id may be updated");

        let snapshot = store.load_snapshot().await.expect("snapshot");
        assert_eq!(snapshot.sectors().count(), 1);
        assert_eq!(snapshot.cargos().count(), 1);
    }

    #[tokio::test]
    async fn transition_applies_effects_and_checks_version() {
        let store = InMemoryWorkflowStore::default();
        DemoOrganization::standard().load(&store).await.expect("seed");
        let snapshot = store.load_snapshot().await.expect("snapshot");
        let policy = RoutingPolicy::default();
        let engine = FlowEngine::new(&snapshot, &policy);

        let mut record = RequestRecord::from(
            engine
                .open_termination(&id("ger-log"), DemoOrganization::termination("ana-log"), Utc::now())
                .expect("open"),
        );
        store.insert_request(record.clone(), Vec::new()).await.expect("insert");

        for actor in ["coo-log", "rh-coo"] {
            let expected_version = record.version();
            let outcome = engine
                .apply_record(&mut record, &FlowAction::Approve, &id(actor), Utc::now())
                .expect("approve");
            let commit = TransitionCommit {
                record: record.clone(),
                expected_version,
                effects: outcome.effects,
                audit: Vec::new(),
            };
            store.commit_transition(commit.clone()).await.expect("commit");
            assert!(store.commit_transition(commit).await.expect_err("replay").is_conflict());
        }

        let subject = store.find_employee(&id("ana-log")).await.expect("find").expect("present");
        assert!(!subject.active);
        assert_eq!(store.list_requests(&RequestFilter::finished()).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn effect_on_unknown_employee_leaves_state_untouched() {
        let store = InMemoryWorkflowStore::default();
        DemoOrganization::standard().load(&store).await.expect("seed");
        let snapshot = store.load_snapshot().await.expect("snapshot");
        let policy = RoutingPolicy::default();
        let engine = FlowEngine::new(&snapshot, &policy);

        let mut record = RequestRecord::from(
            engine
                .open_termination(&id("ger-log"), DemoOrganization::termination("ana-log"), Utc::now())
                .expect("open"),
        );
        store.insert_request(record.clone(), Vec::new()).await.expect("insert");
        engine
            .apply_record(&mut record, &FlowAction::Approve, &id("coo-log"), Utc::now())
            .expect("approve");

        let error = store
            .commit_transition(TransitionCommit {
                record: record.clone(),
                expected_version: 1,
                effects: vec![SideEffect::DeactivateEmployee { employee: id("ghost") }],
                audit: Vec::new(),
            })
            .await
            .expect_err("unknown employee");
        assert!(!error.is_conflict());

        let stored = store.find_request(record.id()).await.expect("find").expect("present");
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.status_str(), "pending_manager");
    }
}
