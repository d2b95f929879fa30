use std::sync::Arc;

use clap::{Parser, Subcommand};

use vizallas::app::VERSION;
use vizallas::prelude::*;
use vizallas::{AppBuilder, Config};
use vizallas_subscription_adapter_sqlite::SubscriptionAdapterSqlite;

/// Configuration is read from the environment, see README.md
#[derive(Debug, Parser)]
#[command(name = "vizallas")]
#[command(version = VERSION)]
#[command(about = "Web Push alert service for water level, drought and weather warnings")]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
	/// Start the push service (default)
	Serve,
	/// Print a fresh VAPID key pair as environment variables
	Keygen,
}

#[tokio::main]
async fn main() -> ClResult<()> {
	let cli = Cli::parse();

	match cli.command.unwrap_or(Commands::Serve) {
		Commands::Keygen => {
			let (public_key, private_key) = vizallas::push::generate_keypair();
			println!("VAPID_PUBLIC_KEY={}", public_key);
			println!("VAPID_PRIVATE_KEY={}", private_key);
			Ok(())
		}
		Commands::Serve => serve().await,
	}
}

async fn serve() -> ClResult<()> {
	let config = Config::from_env()?;
	let mut builder = AppBuilder::new();

	let subscription_adapter = Arc::new(SubscriptionAdapterSqlite::new(config.db_path()).await?);
	builder.opts(config.opts).subscription_adapter(subscription_adapter);

	builder.run().await
}


// vim: ts=4
