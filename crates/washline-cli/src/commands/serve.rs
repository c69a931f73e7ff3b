//! Notification server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use washline_core::{MemoryNotificationStore, NotificationStore};
use washline_redis::{RedisNotificationStore, DEFAULT_REDIS_URL};
use washline_web::ServerConfig;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "WASHLINE_PORT", default_value = "3030")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, env = "WASHLINE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Redis URL for the notification store
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Keep notifications in memory instead of Redis
    #[arg(long)]
    pub memory: bool,

    /// Deadline in seconds for a single write to one connection
    #[arg(long, env = "WASHLINE_WRITE_TIMEOUT_SECS", default_value = "10")]
    pub write_timeout_secs: u64,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file used with --log
    #[arg(long, default_value = "washline-serve.log")]
    pub log_file: PathBuf,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let (store, store_label): (Arc<dyn NotificationStore>, String) = if args.memory {
        (Arc::new(MemoryNotificationStore::new()), "memory".to_string())
    } else {
        let url = args
            .redis_url
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        let pool = washline_redis::init_pool(&url).await?;
        (Arc::new(RedisNotificationStore::new(pool)), url)
    };

    let config = ServerConfig {
        host: args.host.clone(),
        port: args.port,
        write_timeout: Duration::from_secs(args.write_timeout_secs.max(1)),
        ..ServerConfig::default()
    };

    println!();
    println!("  {} {}", "Washline".cyan().bold(), "Notification Server".bold());
    println!();
    println!("  {}        http://{}:{}/api", "API".green(), args.host, args.port);
    println!("  {}  ws://{}:{}/ws?userId=<id>", "WebSocket".green(), args.host, args.port);
    println!("  {}      {}", "Store".green(), store_label);
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    washline_web::run_server(store, config).await
}
