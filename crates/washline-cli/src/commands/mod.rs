//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod listen;
pub mod notify;
pub mod serve;

/// Washline - real-time customer notifications for the car wash
#[derive(Parser)]
#[command(name = "washline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the notification server
    Serve(serve::ServeArgs),

    /// Connect as a customer and print live notifications
    Listen(listen::ListenArgs),

    /// Publish a notification through a running server
    Notify(notify::NotifyArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::execute(args).await,
            Commands::Listen(args) => listen::execute(args).await,
            Commands::Notify(args) => notify::execute(args).await,
        }
    }
}
