//! Command-line interface definition

use clap::{Args, Parser, Subcommand, ValueEnum};
use tailtrade_core::api::{SelectRequest, Strategy};

#[derive(Parser)]
#[command(
    name = "tailtrade",
    version,
    about = "Client for the Tail Trading stock-selection service"
)]
pub struct Cli {
    /// API root, e.g. http://localhost:8000/api
    #[arg(
        long,
        env = "TAILTRADE_BASE_URL",
        default_value = "http://localhost:8000/api"
    )]
    pub base_url: String,

    #[arg(long, env = "TAILTRADE_USERNAME")]
    pub username: String,

    #[arg(long, env = "TAILTRADE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Progress-stream timeout in seconds.
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Refresh the backend stock data, following the progress stream.
    Update {
        /// How many top concepts to refresh.
        #[arg(long, default_value_t = 10)]
        top_n: u32,

        /// Run all three selection strategies once the refresh succeeds.
        #[arg(long)]
        run_strategies: bool,
    },

    /// Run one selection strategy and print the resulting table.
    Select {
        #[arg(long, value_enum, default_value_t = StrategyArg::Smart)]
        strategy: StrategyArg,

        #[command(flatten)]
        params: SelectParams,
    },

    /// Fetch the current top-N concept ranking.
    Concepts {
        #[arg(long, default_value_t = 20)]
        top_n: u32,
    },

    /// Print stored results for every strategy.
    Results,

    /// Inspect or toggle the backend scheduler.
    Scheduler {
        #[command(subcommand)]
        action: SchedulerAction,
    },

    /// Drop the server-side data cache.
    ClearCache,
}

#[derive(Args)]
pub struct SelectParams {
    /// Risk preset passed to the selection scripts.
    #[arg(long, default_value = "balanced")]
    pub preset: String,

    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Ask the backend for verbose logs.
    #[arg(long)]
    pub verbose: bool,
}

impl SelectParams {
    pub fn into_request(self) -> SelectRequest {
        SelectRequest {
            preset: self.preset,
            limit: self.limit,
            verbose: self.verbose,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Smart,
    Enhanced,
    Traditional,
}

impl std::fmt::Display for StrategyArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StrategyArg::Smart => "smart",
            StrategyArg::Enhanced => "enhanced",
            StrategyArg::Traditional => "traditional",
        };
        f.write_str(name)
    }
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Smart => Strategy::Smart,
            StrategyArg::Enhanced => Strategy::Enhanced,
            StrategyArg::Traditional => Strategy::Traditional,
        }
    }
}

#[derive(Subcommand)]
pub enum SchedulerAction {
    Status,
    Start {
        /// Cron expression overriding the server default.
        #[arg(long)]
        cron: Option<String>,
    },
    Stop,
    Logs {
        #[arg(long, default_value_t = 50)]
        lines: u32,
    },
}
