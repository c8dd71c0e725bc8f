pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "sommelier",
    about = "Sommelier beverage assistant CLI",
    long_about = "Prepare the catalog database, inspect configuration, and talk to the beverage assistant.",
    after_help = "Examples:\n  sommelier migrate\n  sommelier seed\n  sommelier ask \"vinho tinto até 30 dólares\"\n  sommelier chat --session loja-1"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo catalog, or a JSON catalog file, into the database")]
    Seed {
        #[arg(long, help = "JSON array of products to load instead of the demo catalog")]
        file: Option<PathBuf>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Send one message to the assistant and print the reply as JSON")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "Customer message")]
        message: Vec<String>,
        #[arg(long, help = "Session to continue; a new one is created when omitted")]
        session: Option<String>,
    },
    #[command(about = "Talk to the assistant interactively; type `sair` to leave")]
    Chat {
        #[arg(long, help = "Session to continue; a new one is created when omitted")]
        session: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { file } => commands::seed::run(file.as_deref()),
        Command::Config => commands::config::run(),
        Command::Ask { message, session } => commands::ask::run(&message.join(" "), session),
        Command::Chat { session } => commands::chat::run(session),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
