// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden identity server binary.

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_server::{create_app_state, create_router, ServerConfig};
use warden_server_audit::{actions, AuditCategory, AuditEntry};
use warden_server_config::{load_config, load_config_with_file, LogFormat};
use warden_server_db::{create_pool, run_migrations};

/// Warden - identity, credential and impersonation server.
#[derive(Parser, Debug)]
#[command(name = "warden-server", about = "Warden identity server", version)]
struct Args {
	/// Path to a TOML config file. Defaults to /etc/warden/server.toml.
	#[arg(long, env = "WARDEN_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the HTTP server (default)
	Serve,
	/// Show version information
	Version,
	/// Read a password from stdin and print its Argon2id hash
	HashPassword,
	/// Apply database migrations and exit
	Migrate,
}

fn init_tracing(config: &ServerConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());

	match config.logging.format {
		LogFormat::Json => tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
		LogFormat::Text => tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer())
			.init(),
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	match args.command {
		Some(Command::Version) => {
			println!("warden-server {}", env!("CARGO_PKG_VERSION"));
			return Ok(());
		}
		Some(Command::HashPassword) => {
			let mut input = String::new();
			std::io::stdin().read_to_string(&mut input)?;
			let password = input.trim_end_matches(['\r', '\n']);
			if password.is_empty() {
				return Err("empty password on stdin".into());
			}
			println!("{}", warden_server_auth::hash_password(password)?);
			return Ok(());
		}
		_ => {}
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => load_config_with_file(path)?,
		None => load_config()?,
	};
	init_tracing(&config);

	let pool = create_pool(&config.database.url).await?;
	run_migrations(&pool).await?;

	if let Some(Command::Migrate) = args.command {
		tracing::info!(database = %config.database.url, "migrations applied");
		return Ok(());
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting warden-server"
	);

	let state = create_app_state(&config, pool).await?;
	let audit = state.audit_service.clone();
	audit.record(
		AuditEntry::builder(AuditCategory::System, actions::SERVER_STARTED)
			.description("server started")
			.meta("version", env!("CARGO_PKG_VERSION"))
			.build(),
	);

	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	audit.flush().await;
	tracing::info!("server shutdown complete");
	Ok(())
}
