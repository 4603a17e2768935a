use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use assetrack::auth::{
    MIN_PASSWORD_LENGTH, PasswordManager, TokenIssuer, generate_password, generate_secret,
};
use assetrack::config::ServerConfig;
use assetrack::server::{AppState, create_router};
use assetrack::store::{DEFAULT_ASSET_TYPES, SqliteStore, Store};
use assetrack::types::{NewUser, Role};

const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_EMAIL: &str = "admin@assetrack.local";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

fn write_secret_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    #[cfg(unix)]
    set_restrictive_permissions(path);
    Ok(())
}

#[derive(Parser)]
#[command(name = "assetrack")]
#[command(about = "A self-hostable IT asset tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to [default: 127.0.0.1]
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to [default: 8080]
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory holding the database and secrets
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Token signing secret. Defaults to the one written by `admin init`.
        #[arg(long, env = "ASSETRACK_JWT_SECRET", hide_env_values = true)]
        jwt_secret: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, signing secret and admin user)
    Init {
        /// Data directory holding the database and secrets
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Skip interactive prompts and generate the admin password
        #[arg(long)]
        non_interactive: bool,
    },
}

fn seed_asset_types(store: &SqliteStore) -> anyhow::Result<()> {
    for (name, description) in DEFAULT_ASSET_TYPES {
        if store.get_asset_type_by_name(name)?.is_none() {
            store.create_asset_type(name, Some(description))?;
        }
    }
    Ok(())
}

fn prompt_admin() -> anyhow::Result<(String, String)> {
    let username = inquire::Text::new("Admin username:")
        .with_default(DEFAULT_ADMIN_USERNAME)
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Err("Username cannot be empty".into())
            } else if input.contains(char::is_whitespace) {
                Err("Username cannot contain whitespace".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let password = inquire::Password::new("Admin password:")
        .with_validator(|input: &str| {
            if input.chars().count() < MIN_PASSWORD_LENGTH {
                Err(format!("Password must be at least {MIN_PASSWORD_LENGTH} characters").into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    Ok((username.trim().to_string(), password))
}

fn run_init(data_dir: PathBuf, non_interactive: bool) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)?;
    let config = ServerConfig::load(&data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    if store.has_admin_user()? {
        bail!(
            "Server already initialized. Database exists at: {}",
            config.db_path().display()
        );
    }

    seed_asset_types(&store)?;

    let secret_path = config.secret_path();
    if !secret_path.exists() {
        write_secret_file(&secret_path, &generate_secret())?;
    }

    let (username, password, generated) = if non_interactive {
        (DEFAULT_ADMIN_USERNAME.to_string(), generate_password(), true)
    } else {
        let (username, password) = prompt_admin()?;
        (username, password, false)
    };

    let passwords = PasswordManager::new();
    store.create_user(
        &NewUser {
            username: username.clone(),
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password_hash: passwords.hash(&password)?,
            role: Role::Admin,
            employee_id: None,
            is_active: true,
        },
        &[],
    )?;

    println!();
    println!("========================================");
    println!("Created admin user '{username}'.");
    if generated {
        let password_path = config.admin_password_path();
        write_secret_file(&password_path, &password)?;
        println!();
        println!("Generated password (save this, it won't be shown again):");
        println!();
        println!("  {password}");
        println!();
        println!("Password also written to: {}", password_path.display());
    }
    println!("========================================");
    println!();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");
}

async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    data_dir: PathBuf,
    jwt_secret: Option<String>,
) -> anyhow::Result<()> {
    let mut config = ServerConfig::load(&data_dir)?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if jwt_secret.is_some() {
        config.jwt_secret = jwt_secret;
    }

    const NOT_INITIALIZED: &str =
        "Server not initialized. Run 'assetrack admin init' first to create the database and admin user.";

    if !config.db_path().exists() {
        bail!(NOT_INITIALIZED);
    }
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_user()? {
        bail!(NOT_INITIALIZED);
    }

    let secret = config.signing_secret()?;
    let state = Arc::new(
        AppState::new(
            Arc::new(store),
            TokenIssuer::new(&secret, config.token_ttl_hours),
        )
        .with_trusted_proxy(config.trust_proxy_headers),
    );

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("assetrack=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => run_init(data_dir, non_interactive)?,
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            jwt_secret,
        } => run_serve(host, port, data_dir, jwt_secret).await?,
    }

    Ok(())
}
