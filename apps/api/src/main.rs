mod auth;
mod config;
mod db;
mod divider;
mod errors;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::password::CredentialManager;
use crate::auth::registry::{NewAccount, UserRegistry};
use crate::auth::session::{InMemorySessionStore, RedisSessionStore, SessionStore};
use crate::auth::store::{InMemoryUserStore, PgUserStore, UserStore};
use crate::auth::validation::RegistrationForm;
use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::divider::divide_text;
use crate::routes::build_router;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "portal", version, about = "Resume review portal: account service and resume divider")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Keep accounts in process memory instead of PostgreSQL
        #[arg(long)]
        in_memory: bool,
    },
    /// Create the users table and the demo account
    InitDb,
    /// Create the admin account
    CreateAdmin,
    /// Create an account non-interactively
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_NEW_USER_PASSWORD")]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// List all accounts
    ListUsers,
    /// Split resumes across reviewers
    Divide {
        resumes: String,
        reviewers: String,
        /// Print how many resumes each group of reviewers takes
        #[arg(long)]
        breakdown: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Command::Serve { in_memory: false }) {
        Command::Serve { in_memory } => serve(config, in_memory).await,
        Command::InitDb => {
            let registry = postgres_registry(&config, true).await?;
            let (user, created) = registry
                .ensure_account(demo_account("demo", "demo123", "Demo"))
                .await?;
            if created {
                println!("Demo user created: {} / demo123", user.username);
            } else {
                println!("Demo user already exists");
            }
            println!("Database initialized");
            Ok(())
        }
        Command::CreateAdmin => {
            let registry = postgres_registry(&config, false).await?;
            let (user, created) = registry
                .ensure_account(demo_account("admin", "admin123", "Admin"))
                .await?;
            if created {
                println!("Admin user created: {} / admin123", user.username);
            } else {
                println!("Admin user already exists");
            }
            Ok(())
        }
        Command::CreateUser {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let form = RegistrationForm {
                first_name,
                last_name,
                username,
                email,
                password_confirm: password.clone(),
                password,
            };
            let violations = form.validate();
            if !violations.is_empty() {
                for v in &violations {
                    eprintln!("{}: {}", v.field, v.message);
                }
                bail!("{} invalid field(s)", violations.len());
            }
            let registry = postgres_registry(&config, false).await?;
            let user = registry
                .register(NewAccount {
                    username: form.username,
                    email: form.email,
                    password: form.password,
                    first_name: form.first_name,
                    last_name: form.last_name,
                })
                .await?;
            println!("Created {} ({}) id={}", user.username, user.email, user.id);
            Ok(())
        }
        Command::ListUsers => {
            let registry = postgres_registry(&config, false).await?;
            let users = registry.list_users().await?;
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            println!("Found {} users:", users.len());
            for user in users {
                let status = if user.is_active { "active" } else { "inactive" };
                println!(
                    "- {:<15} {:<25} {:<20} {:<8} created {}",
                    user.username,
                    user.email,
                    user.full_name(),
                    status,
                    user.created_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        Command::Divide {
            resumes,
            reviewers,
            breakdown,
        } => {
            let result = divide_text(&resumes, &reviewers)?;
            println!("{}", result.message());
            if breakdown {
                for line in result.breakdown() {
                    println!("{line}");
                }
            }
            Ok(())
        }
    }
}

fn demo_account(username: &str, password: &str, first_name: &str) -> NewAccount {
    NewAccount {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: password.to_string(),
        first_name: first_name.to_string(),
        last_name: "User".to_string(),
    }
}

async fn postgres_registry(config: &Config, create_schema: bool) -> Result<UserRegistry> {
    let pool = create_pool(config.require_database_url()?).await?;
    if create_schema {
        init_schema(&pool).await?;
    }
    Ok(UserRegistry::new(
        Arc::new(PgUserStore::new(pool)),
        CredentialManager::new(config.password_max_length),
    ))
}

async fn serve(config: Config, in_memory: bool) -> Result<()> {
    info!("Starting portal v{}", env!("CARGO_PKG_VERSION"));

    // Initialize user storage
    let users: Arc<dyn UserStore> = if in_memory {
        warn!("Using in-memory user storage; accounts are lost on restart");
        Arc::new(InMemoryUserStore::new())
    } else {
        let pool = create_pool(config.require_database_url()?).await?;
        init_schema(&pool).await?;
        Arc::new(PgUserStore::new(pool))
    };
    let registry = UserRegistry::new(
        users,
        CredentialManager::new(config.password_max_length),
    );
    if in_memory {
        registry
            .ensure_account(demo_account("demo", "demo123", "Demo"))
            .await?;
        info!("Demo account available: demo / demo123");
    }

    // Initialize sessions
    let sessions: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let store = RedisSessionStore::connect(&client)
                .await
                .context("Failed to connect to Redis")?;
            info!("Redis session store initialized");
            Arc::new(store)
        }
        None => {
            warn!("REDIS_URL not set; sessions are kept in process memory");
            Arc::new(InMemorySessionStore::new())
        }
    };

    // Build app state
    let state = AppState {
        registry,
        sessions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
