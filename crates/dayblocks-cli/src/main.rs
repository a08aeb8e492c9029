use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "dayblocks", version, about = "Plan your day in time blocks")]
struct Cli {
    /// Act as this owner instead of `planner.owner_id`
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a day
    Day {
        #[command(subcommand)]
        action: commands::day::DayAction,
    },
    /// Time block management
    Block {
        #[command(subcommand)]
        action: commands::block::BlockAction,
    },
    /// Sub-items inside a block
    Item {
        #[command(subcommand)]
        action: commands::item::ItemAction,
    },
    /// Backlog of pending work
    Backlog {
        #[command(subcommand)]
        action: commands::backlog::BacklogAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}

/// Log to stderr so JSON on stdout stays parseable.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("DAYBLOCKS_LOG").unwrap_or_else(|_| EnvFilter::new("dayblocks=warn"));
    let format = std::env::var("DAYBLOCKS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let owner = cli.owner;
    let result = match cli.command {
        Commands::Day { action } => commands::day::run(action, owner),
        Commands::Block { action } => commands::block::run(action, owner),
        Commands::Item { action } => commands::item::run(action, owner),
        Commands::Backlog { action } => commands::backlog::run(action, owner),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions(args) => commands::completions::run(args.shell, &mut Cli::command()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
