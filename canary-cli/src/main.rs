//! Canary CLI tool

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "canary")]
#[command(author, version, about = "Canary test-execution platform CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Organization ID
    #[arg(long, env = "CANARY_ORG_ID")]
    org_id: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,

    /// Trigger a test case or suite
    Trigger {
        /// Project the execution belongs to
        #[arg(long)]
        project_id: Uuid,

        /// Test case to run
        #[arg(long, conflicts_with = "test_suite_id")]
        test_case_id: Option<Uuid>,

        /// Stored suite to fan out
        #[arg(long)]
        test_suite_id: Option<Uuid>,

        /// Who triggered the run (recorded in metadata)
        #[arg(long, default_value = "cli")]
        triggered_by: String,
    },

    /// Check execution status
    Status {
        /// Execution ID to check
        execution_id: Uuid,

        /// Wait for the execution to reach a terminal status
        #[arg(long)]
        wait: bool,

        /// Timeout in seconds when using --wait
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Poll interval in seconds when using --wait
        #[arg(long, default_value = "2")]
        poll_interval: u64,
    },

    /// Derived status of a suite execution
    Suite {
        /// Suite execution ID
        suite_execution_id: Uuid,
    },

    /// Query execution history
    History {
        #[arg(long)]
        project_id: Option<Uuid>,

        #[arg(long)]
        test_case_id: Option<Uuid>,

        #[arg(long)]
        test_suite_id: Option<Uuid>,

        #[arg(long)]
        suite_execution_id: Option<Uuid>,

        /// Maximum number of records
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let database_url = || {
        cli.database_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL not set"))
    };
    let org_id = || {
        cli.org_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("CANARY_ORG_ID not set"))
    };

    match cli.command {
        Commands::Migrate => {
            commands::migrate::execute(&database_url()?).await?;
        }
        Commands::Trigger {
            project_id,
            test_case_id,
            test_suite_id,
            triggered_by,
        } => {
            commands::trigger::execute(
                project_id,
                test_case_id,
                test_suite_id,
                &triggered_by,
                &org_id()?,
                &database_url()?,
            )
            .await?;
        }
        Commands::Status {
            execution_id,
            wait,
            timeout,
            poll_interval,
        } => {
            let terminal_ok = commands::status::execute(
                execution_id,
                wait,
                timeout,
                poll_interval,
                &org_id()?,
                &database_url()?,
            )
            .await?;
            if !terminal_ok {
                std::process::exit(1);
            }
        }
        Commands::Suite { suite_execution_id } => {
            commands::suite::execute(suite_execution_id, &org_id()?, &database_url()?).await?;
        }
        Commands::History {
            project_id,
            test_case_id,
            test_suite_id,
            suite_execution_id,
            limit,
        } => {
            commands::history::execute(
                project_id,
                test_case_id,
                test_suite_id,
                suite_execution_id,
                limit,
                &org_id()?,
                &database_url()?,
            )
            .await?;
        }
    }

    Ok(())
}
