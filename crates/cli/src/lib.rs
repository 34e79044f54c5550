pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rhflow_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use tracing::Level;

use commands::actions::Action;
use commands::open::{RequisitionArgs, TerminationArgs, TransferArgs};

#[derive(Debug, Parser)]
#[command(
    name = "rhflow",
    about = "HR approval routing operator CLI",
    long_about = "Operate the rhflow approval workspace: schema, demo data, readiness checks, \
                  hierarchy inspection and approval actions.",
    after_help = "Examples:\n  rhflow doctor --json\n  rhflow hierarchy --employee ana-log\n  \
                  rhflow open-termination --requester ger-log --subject ana-log --reason restructuring \
                  --justification \"position eliminated\"\n  \
                  rhflow approve --request <id> --actor ger-log"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo organization and verify routing resolves")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, database, schema and approver availability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show superiors, subordinates and resolved approvers for an employee")]
    Hierarchy {
        #[arg(long)]
        employee: String,
    },
    #[command(about = "Open a hiring requisition for an open vacancy")]
    OpenRequisition(RequisitionArgs),
    #[command(about = "Open a transfer of an employee to a new cargo and sector")]
    OpenTransfer(TransferArgs),
    #[command(about = "Open a termination for an employee")]
    OpenTermination(TerminationArgs),
    #[command(about = "List open requests waiting on an approver")]
    Pending {
        #[arg(long)]
        approver: String,
    },
    #[command(about = "Approve the stage a request is waiting on")]
    Approve {
        #[arg(long)]
        request: String,
        #[arg(long)]
        actor: String,
    },
    #[command(about = "Reject a request with a mandatory reason")]
    Reject {
        #[arg(long)]
        request: String,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        reason: String,
    },
    #[command(about = "Send a requisition under HR review back to its manager")]
    Return {
        #[arg(long)]
        request: String,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        justification: String,
    },
    #[command(about = "Cancel an open requisition as its requester")]
    Cancel {
        #[arg(long)]
        request: String,
        #[arg(long)]
        actor: String,
    },
}

/// Installs the global subscriber, writing to stderr so stdout stays machine-readable.
pub fn init_logging(logging: &LoggingConfig) -> Result<(), String> {
    let level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);

    let installed = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| error.to_string())
}

/// Logging settings from the effective config, or defaults when it does not load.
pub fn logging_config() -> LoggingConfig {
    AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging)
}

pub fn execute(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Hierarchy { employee } => commands::hierarchy::run(&employee),
        Command::OpenRequisition(args) => commands::open::run(args.into()),
        Command::OpenTransfer(args) => commands::open::run(args.into()),
        Command::OpenTermination(args) => commands::open::run(args.into()),
        Command::Pending { approver } => commands::pending::run(&approver),
        Command::Approve { request, actor } => {
            commands::actions::run(Action::Approve, &request, &actor)
        }
        Command::Reject { request, actor, reason } => {
            commands::actions::run(Action::Reject { reason }, &request, &actor)
        }
        Command::Return { request, actor, justification } => {
            commands::actions::run(Action::Return { justification }, &request, &actor)
        }
        Command::Cancel { request, actor } => {
            commands::actions::run(Action::Cancel, &request, &actor)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn reject_requires_a_reason_flag() {
        let parsed = Cli::try_parse_from(["rhflow", "reject", "--request", "r-1", "--actor", "ger-log"]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from([
            "rhflow", "reject", "--request", "r-1", "--actor", "ger-log", "--reason", "budget",
        ])
        .expect("parse");
        assert!(matches!(cli.command, Command::Reject { ref reason, .. } if reason == "budget"));
    }

    #[test]
    fn open_termination_defaults_its_type() {
        let cli = Cli::try_parse_from([
            "rhflow",
            "open-termination",
            "--requester",
            "ger-log",
            "--subject",
            "ana-log",
            "--reason",
            "restructuring",
            "--justification",
            "position eliminated",
        ])
        .expect("parse");
        let Command::OpenTermination(args) = cli.command else {
            panic!("expected open-termination");
        };
        assert_eq!(args.termination_type, "sem_justa_causa");
        assert!(!args.replacement_planned);

        let missing_vacancy = Cli::try_parse_from([
            "rhflow",
            "open-requisition",
            "--requester",
            "ana-log",
            "--justification",
            "seasonal volume",
        ]);
        assert!(missing_vacancy.is_err());
    }
}
