use chrono::NaiveDate;
use clap::Args;
use rhflow_core::domain::org::{CargoId, EmployeeId, SectorId};
use rhflow_core::domain::requisition::RequisitionDetails;
use rhflow_core::domain::termination::TerminationDetails;
use rhflow_core::domain::transfer::TransferDetails;
use rhflow_core::domain::vacancy::VacancyId;
use rhflow_db::RequestService;
use rust_decimal::Decimal;

use crate::commands::pending::PendingItem;
use crate::commands::{load_config, open_database, runtime, CommandResult, Setup};

#[derive(Debug, Args)]
pub struct RequisitionArgs {
    #[arg(long)]
    pub requester: String,
    #[arg(long)]
    pub vacancy: String,
    #[arg(long, default_value = "aumento_quadro")]
    pub vacancy_type: String,
    #[arg(long)]
    pub replaced_employee: Option<String>,
    #[arg(long)]
    pub replacement_reason: Option<String>,
    #[arg(long)]
    pub workplace: Option<String>,
    #[arg(long, help = "Expected start date (YYYY-MM-DD)")]
    pub expected_start: Option<NaiveDate>,
    #[arg(long, help = "Hiring deadline (YYYY-MM-DD)")]
    pub hiring_deadline: Option<NaiveDate>,
    #[arg(long)]
    pub working_hours: Option<String>,
    #[arg(long)]
    pub justification: String,
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    #[arg(long)]
    pub requester: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long = "cargo")]
    pub proposed_cargo: String,
    #[arg(long = "sector")]
    pub proposed_sector: String,
    #[arg(long = "salary")]
    pub proposed_salary: Option<Decimal>,
    #[arg(long, help = "Effective date (YYYY-MM-DD)")]
    pub effective_date: Option<NaiveDate>,
    #[arg(long)]
    pub justification: String,
}

#[derive(Debug, Args)]
pub struct TerminationArgs {
    #[arg(long)]
    pub requester: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long, default_value = "sem_justa_causa")]
    pub termination_type: String,
    #[arg(long)]
    pub reason: String,
    #[arg(long, help = "Expected termination date (YYYY-MM-DD)")]
    pub expected_date: Option<NaiveDate>,
    #[arg(long)]
    pub notice_type: Option<String>,
    #[arg(long)]
    pub replacement_planned: bool,
    #[arg(long)]
    pub justification: String,
}

/// A request to open, with the employee opening it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opening {
    Requisition { requester: String, details: RequisitionDetails },
    Transfer { requester: String, details: TransferDetails },
    Termination { requester: String, details: TerminationDetails },
}

impl Opening {
    pub fn command(&self) -> &'static str {
        match self {
            Self::Requisition { .. } => "open-requisition",
            Self::Transfer { .. } => "open-transfer",
            Self::Termination { .. } => "open-termination",
        }
    }

    fn requester(&self) -> EmployeeId {
        match self {
            Self::Requisition { requester, .. }
            | Self::Transfer { requester, .. }
            | Self::Termination { requester, .. } => EmployeeId(requester.clone()),
        }
    }
}

impl From<RequisitionArgs> for Opening {
    fn from(args: RequisitionArgs) -> Self {
        Self::Requisition {
            requester: args.requester,
            details: RequisitionDetails {
                vacancy: VacancyId(args.vacancy),
                vacancy_type: args.vacancy_type,
                replaced_employee: args.replaced_employee,
                replacement_reason: args.replacement_reason,
                workplace: args.workplace,
                expected_start: args.expected_start,
                hiring_deadline: args.hiring_deadline,
                working_hours: args.working_hours,
                justification: args.justification,
            },
        }
    }
}

impl From<TransferArgs> for Opening {
    fn from(args: TransferArgs) -> Self {
        Self::Transfer {
            requester: args.requester,
            details: TransferDetails {
                subject: EmployeeId(args.subject),
                proposed_cargo: CargoId(args.proposed_cargo),
                proposed_sector: SectorId(args.proposed_sector),
                proposed_salary: args.proposed_salary,
                effective_date: args.effective_date,
                justification: args.justification,
            },
        }
    }
}

impl From<TerminationArgs> for Opening {
    fn from(args: TerminationArgs) -> Self {
        Self::Termination {
            requester: args.requester,
            details: TerminationDetails {
                subject: EmployeeId(args.subject),
                termination_type: args.termination_type,
                reason: args.reason,
                expected_date: args.expected_date,
                notice_type: args.notice_type,
                replacement_planned: args.replacement_planned,
                justification: args.justification,
            },
        }
    }
}

pub fn run(opening: Opening) -> CommandResult {
    let command = opening.command();
    let config = match load_config(command) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(setup) => return CommandResult::from_setup(command, setup),
    };

    let requester = opening.requester();
    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let service = RequestService::sqlite(pool.clone(), &config.workflow);
        let opened = match opening {
            Opening::Requisition { details, .. } => service.open_requisition(&requester, details).await,
            Opening::Transfer { details, .. } => service.open_transfer(&requester, details).await,
            Opening::Termination { details, .. } => {
                service.open_termination(&requester, details).await
            }
        };
        pool.close().await;
        Ok::<_, Setup>(opened)
    });

    match result {
        Ok(Ok(record)) => {
            let item = PendingItem::from(&record);
            let message = format!(
                "{} request {} opened as {}, waiting on {}",
                item.kind,
                item.id,
                item.status,
                item.pending_approvers.join(", ")
            );
            CommandResult::success_with(command, message, serde_json::to_value(item).ok())
        }
        Ok(Err(error)) => CommandResult::from_application(command, error),
        Err(setup) => CommandResult::from_setup(command, setup),
    }
}
