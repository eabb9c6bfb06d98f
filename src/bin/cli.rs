//! menukv CLI Client
//!
//! Command-line interface for interacting with a menukv server.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use menukv::network::Client;

/// menukv CLI
#[derive(Parser, Debug)]
#[command(name = "menukv-cli")]
#[command(about = "CLI for the menukv weekly menu service")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    server: String,

    /// Request timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a weekly menu
    Create {
        /// Name of the menu
        name: String,
    },

    /// Get a weekly menu by id
    Get {
        /// The menu id
        id: u64,
    },

    /// List the ids of all menus
    List,

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> menukv::Result<ExitCode> {
    let mut client = Client::connect(&args.server)?;
    client.set_timeout(Some(Duration::from_millis(args.timeout_ms)))?;

    match args.command {
        Commands::Create { name } => {
            let menu = client.create_menu(&name)?;
            println!("{}\t{}", menu.id, menu.name);
        }
        Commands::Get { id } => match client.get_menu(id)? {
            Some(menu) => println!("{}\t{}", menu.id, menu.name),
            None => {
                eprintln!("menu {} not found", id);
                return Ok(ExitCode::from(2));
            }
        },
        Commands::List => {
            for id in client.list_menus()? {
                println!("{}", id);
            }
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    Ok(ExitCode::SUCCESS)
}
