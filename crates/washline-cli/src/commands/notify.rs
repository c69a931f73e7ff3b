//! One-shot publish command.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use washline_core::notifier::WebNotifier;
use washline_core::{Category, NewNotification};

#[derive(Args)]
pub struct NotifyArgs {
    /// Recipient
    #[arg(long)]
    pub user_id: String,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub message: String,

    /// info, success, warning or error
    #[arg(long, default_value = "info")]
    pub category: String,

    /// Deep link into the app
    #[arg(long)]
    pub link: Option<String>,

    /// Server base URL
    #[arg(long, env = "WASHLINE_WEB_URL", default_value = "http://127.0.0.1:3030")]
    pub server: String,
}

pub async fn execute(args: NotifyArgs) -> Result<()> {
    let Some(category) = Category::parse(&args.category) else {
        bail!("Unknown category '{}'", args.category);
    };

    let mut new = NewNotification::new(args.user_id, args.title, args.message, category);
    if let Some(link) = args.link {
        new = new.with_link(link);
    }
    new.validate()?;

    let notifier = WebNotifier::with_url(&args.server);
    match notifier.notify(&new).await {
        Some(created) => {
            println!("  {} {}", "Sent".green().bold(), created.id.dimmed());
            Ok(())
        }
        None => bail!("Server at {} did not accept the notification", notifier.base_url()),
    }
}
