use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod notifier;
mod texts;

#[derive(Parser)]
#[command(name = "calmstep", version, about = "Daily practice tracker with morning reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Progress(commands::progress::ProgressAction),
    /// List the reminder schedule (UTC fire hour per user)
    Jobs {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run reminders and read `<user> <message>` lines from stdin
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CALMSTEP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Progress(action) => commands::progress::run(action),
        Commands::Jobs { json } => commands::jobs::run(json),
        Commands::Config { action } => commands::config::run(action),
        Commands::Serve => commands::serve::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
