use rhflow_core::domain::org::EmployeeId;
use rhflow_core::domain::request::RequestRecord;
use rhflow_db::RequestService;
use serde::Serialize;

use crate::commands::{load_config, open_database, runtime, CommandResult, Setup};

/// One line of an approver's inbox.
#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub id: String,
    pub kind: &'static str,
    pub status: &'static str,
    pub requester: String,
    pub subject: Option<String>,
    pub pending_approvers: Vec<String>,
    pub version: i64,
    pub opened_at: String,
}

impl From<&RequestRecord> for PendingItem {
    fn from(record: &RequestRecord) -> Self {
        Self {
            id: record.id().0.clone(),
            kind: record.kind().as_str(),
            status: record.status_str(),
            requester: record.requester().0.clone(),
            subject: record.subject().map(|subject| subject.0.clone()),
            pending_approvers: record
                .pending_approvers()
                .into_iter()
                .map(|approver| approver.0)
                .collect(),
            version: record.version(),
            opened_at: record.created_at().to_rfc3339(),
        }
    }
}

pub fn run(approver: &str) -> CommandResult {
    let config = match load_config("pending") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(setup) => return CommandResult::from_setup("pending", setup),
    };

    let approver = EmployeeId(approver.to_owned());
    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let service = RequestService::sqlite(pool.clone(), &config.workflow);
        let listed = service.pending_for(&approver).await;
        pool.close().await;
        Ok::<_, Setup>(listed)
    });

    match result {
        Ok(Ok(records)) => {
            let items: Vec<PendingItem> = records.iter().map(PendingItem::from).collect();
            CommandResult::success_with(
                "pending",
                format!("{} request(s) waiting on {approver}", items.len()),
                serde_json::to_value(items).ok(),
            )
        }
        Ok(Err(error)) => CommandResult::from_application("pending", error),
        Err(setup) => CommandResult::from_setup("pending", setup),
    }
}
