use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};

mod app;
mod auth;
mod config;
mod db;
mod errors;
mod state;
#[cfg(test)]
mod test_support;
mod users;
mod validation;

use crate::{config::AppConfig, state::AppState, users::repo::PgUserRepository};

#[derive(Parser)]
#[command(name = "userhub", about = "User accounts service with JWT auth", long_about = None)]
struct Cli {
    /// Env file loaded before reading configuration
    #[arg(long, env = "ENV_FILE", default_value = ".env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply migrations and start the HTTP server
    Serve,
    /// Apply pending migrations
    Migrate,
    /// Revert all applied migrations
    Rollback,
    /// Create an active superuser
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userhub=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_loaded = dotenvy::from_path(&cli.env_file).is_ok();

    init_tracing();
    if !env_loaded {
        tracing::debug!(path = %cli.env_file.display(), "env file not loaded; using process environment");
    }

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            db::migrate(&pool).await?;
            let addr = config.bind_addr();
            let app = app::build_app(AppState::new(pool, config));
            app::serve(app, &addr).await?;
        }
        Command::Migrate => db::migrate(&pool).await?,
        Command::Rollback => db::rollback(&pool).await?,
        Command::CreateSuperuser {
            email,
            username,
            password,
        } => {
            let repo = PgUserRepository::new(pool);
            let user = users::services::create_superuser(&repo, &email, &username, &password)
                .await
                .map_err(|e| anyhow::anyhow!("create superuser: {e}"))?;
            tracing::info!(user_id = %user.id, username = %user.username, "superuser created");
        }
    }

    Ok(())
}
