use rhflow_core::domain::org::EmployeeId;
use rhflow_core::domain::request::RequestId;
use rhflow_db::RequestService;

use crate::commands::{load_config, open_database, runtime, CommandResult, Setup};

/// Approval action requested from the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Approve,
    Reject { reason: String },
    Return { justification: String },
    Cancel,
}

impl Action {
    pub fn command(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject { .. } => "reject",
            Self::Return { .. } => "return",
            Self::Cancel => "cancel",
        }
    }
}

pub fn run(action: Action, request: &str, actor: &str) -> CommandResult {
    let command = action.command();
    let config = match load_config(command) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(setup) => return CommandResult::from_setup(command, setup),
    };

    let request = RequestId(request.to_owned());
    let actor = EmployeeId(actor.to_owned());
    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let service = RequestService::sqlite(pool.clone(), &config.workflow);
        let outcome = match action {
            Action::Approve => service.approve(&request, &actor).await,
            Action::Reject { reason } => service.reject(&request, &actor, reason).await,
            Action::Return { justification } => {
                service.return_to_manager(&request, &actor, justification).await
            }
            Action::Cancel => service.cancel(&request, &actor).await,
        };
        pool.close().await;
        Ok::<_, Setup>(outcome)
    });

    match result {
        Ok(Ok(outcome)) => {
            let message = format!(
                "{} request {} moved from {} to {}",
                outcome.kind, outcome.request, outcome.from, outcome.to
            );
            CommandResult::success_with(command, message, serde_json::to_value(&outcome).ok())
        }
        Ok(Err(error)) => CommandResult::from_application(command, error),
        Err(setup) => CommandResult::from_setup(command, setup),
    }
}
