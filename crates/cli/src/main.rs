mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use libswap_migrate::FailurePolicy;
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// What to do when a usage cannot be migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum PolicyArg {
    /// Stop at the first failure
    AllOrNothing,
    /// Skip failed usages and report them
    BestEffort,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::AllOrNothing => FailurePolicy::AllOrNothing,
            PolicyArg::BestEffort => FailurePolicy::BestEffort,
        }
    }
}

/// Migrate programs between libraries with equivalent APIs.
#[derive(Parser)]
#[command(
    name = "libswap",
    version,
    about = "Migrate programs between libraries with equivalent APIs"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log search and replay details to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate a project to another library, writing a migrated copy
    Migrate {
        /// Project directory containing *.unit.json sources
        project: PathBuf,
        /// Library the project uses (built-in name or .json declaration)
        #[arg(long)]
        from: String,
        /// Library to migrate to (built-in name or .json declaration)
        #[arg(long)]
        to: String,
        /// Failure policy (overrides libswap.toml)
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
        /// Where to write the migrated copy (overrides libswap.toml)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Shell command that builds and tests the migrated copy
        #[arg(long)]
        verify: Option<String>,
        /// Search budget per usage (overrides libswap.toml)
        #[arg(long)]
        max_expansions: Option<usize>,
    },

    /// Find a route performing the given actions in one library
    Route {
        /// Library (built-in name or .json declaration)
        library: String,
        /// Action the route must perform; repeat for several
        #[arg(long = "require")]
        required: Vec<String>,
        /// State the route must end in, as Role.State
        #[arg(long)]
        goal: Option<String>,
        /// Starting state of a role, as Role.State; other roles start at Init
        #[arg(long = "start")]
        starts: Vec<String>,
        /// Search budget
        #[arg(long)]
        max_expansions: Option<usize>,
    },

    /// Print a library's roles, states and transitions
    Describe {
        /// Library (built-in name or .json declaration)
        library: String,
    },

    /// List the built-in libraries
    Libraries,
}

fn init_logging(debug: bool, quiet: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.quiet);

    match cli.command {
        Commands::Migrate {
            project,
            from,
            to,
            policy,
            out,
            verify,
            max_expansions,
        } => {
            commands::migrate::cmd_migrate(commands::migrate::MigrateOptions {
                project: &project,
                from: &from,
                to: &to,
                policy: policy.map(FailurePolicy::from),
                out: out.as_deref(),
                verify: verify.as_deref(),
                max_expansions,
                output: cli.output,
                quiet: cli.quiet,
            });
        }
        Commands::Route {
            library,
            required,
            goal,
            starts,
            max_expansions,
        } => {
            commands::route::cmd_route(
                &library,
                &required,
                goal.as_deref(),
                &starts,
                max_expansions,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Describe { library } => {
            commands::describe::cmd_describe(&library, cli.output, cli.quiet);
        }
        Commands::Libraries => {
            commands::describe::cmd_libraries(cli.output);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            let json = serde_json::json!({ "error": msg });
            eprintln!("{}", json);
        }
    }
}
