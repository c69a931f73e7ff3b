//! Live listener command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use washline_client::{AgentConfig, AgentEvent, HttpStoreClient, NotificationAgent};
use washline_core::Category;

#[derive(Args)]
pub struct ListenArgs {
    /// Customer whose notifications to follow
    #[arg(long)]
    pub user_id: String,

    /// Server base URL
    #[arg(long, env = "WASHLINE_WEB_URL", default_value = "http://127.0.0.1:3030")]
    pub server: String,

    /// Number of recent notifications kept locally
    #[arg(long, default_value = "20")]
    pub history: usize,
}

/// `http(s)://host` becomes `ws(s)://host/ws`.
fn ws_url(server: &str) -> String {
    let base = server.trim_end_matches('/');
    let base = match base.strip_prefix("http") {
        Some(rest) => format!("ws{}", rest),
        None => base.to_string(),
    };
    format!("{}/ws", base)
}

pub async fn execute(args: ListenArgs) -> Result<()> {
    let config = AgentConfig::new(ws_url(&args.server)).with_history_limit(args.history);
    let store = Arc::new(HttpStoreClient::new(&args.server));
    let mut agent = NotificationAgent::start(config, args.user_id.clone(), store)?;

    println!(
        "  {} {} {}",
        "Listening".cyan().bold(),
        "as".dimmed(),
        args.user_id.bold()
    );
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    loop {
        let event = tokio::select! {
            event = agent.next_event() => event,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(event) = event else { break };

        match event {
            AgentEvent::Connected { count } => {
                println!("  {} unread: {}", "●".green(), count);
            }
            AgentEvent::Reconciled { unread } => {
                for n in agent.notifications().await {
                    let marker = if n.read { " " } else { "*" };
                    println!("  {} {} {}", marker, n.title.bold(), n.message.dimmed());
                }
                println!("  {} {}", "Unread".dimmed(), unread);
            }
            AgentEvent::Alert {
                title,
                message,
                category,
            } => {
                let tag = match category {
                    Category::Info => "info".blue(),
                    Category::Success => "success".green(),
                    Category::Warning => "warning".yellow(),
                    Category::Error => "error".red(),
                };
                println!("  [{}] {} {}", tag, title.bold(), message);
            }
            AgentEvent::CountChanged(count) => {
                println!("  {} {}", "Unread".dimmed(), count);
            }
            AgentEvent::Disconnected => {
                println!("  {} connection lost", "○".red());
            }
            AgentEvent::Reconnecting { attempt, delay } => {
                println!(
                    "  {}",
                    format!("reconnecting in {:?} (attempt {})", delay, attempt).dimmed()
                );
            }
        }
    }

    agent.logout().await;
    Ok(())
}
