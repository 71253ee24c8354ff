use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use sprints_auth::auth::{
    AuthProps, AuthSession, AuthType, BiometricAuthCoordinator, CeremonyOutcome, SupportedMethod,
};
use sprints_auth::backend::{AuthBackend, HttpAuthBackend};
use sprints_auth::capability::{detect_capabilities, ProbeStatus};
use sprints_auth::config::AppConfig;
use sprints_auth::paths::AppPaths;
use sprints_auth::platform::Platform;
use sprints_auth::token_store::TokenStore;
use sprints_auth::validation::validate_bearer_token;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sprints-auth", version, about = "Biometric sign-in for Sprints Bank")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override backend.base_url
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show which biometric methods this device supports
    Probe,
    /// List the methods enrolled with the backend
    Enrolled,
    /// Run one authentication ceremony
    Auth {
        /// webauthn, face or voice
        #[arg(long)]
        method: SupportedMethod,
        /// login, enroll or step-up (defaults to ceremony.auth_type)
        #[arg(long)]
        auth_type: Option<AuthType>,
    },
    /// Manage the stored bearer token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    Set { token: String },
    Clear,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::new()?;
    paths.ensure_directories()?;

    let config_path = cli.config.unwrap_or_else(|| paths.config_file());
    let mut config = AppConfig::load_or_create(&config_path)?;
    if let Some(base_url) = cli.base_url {
        config.backend.base_url = base_url;
        config.validate()?;
    }

    let tokens = TokenStore::open(&paths.session_dir())?;

    match cli.command {
        Command::Probe => probe().await,
        Command::Enrolled => enrolled(&config, &tokens).await,
        Command::Auth { method, auth_type } => {
            let auth_type = auth_type.unwrap_or(config.ceremony.auth_type);
            authenticate(&config, &tokens, method, auth_type).await
        }
        Command::Token { action } => token(&tokens, action),
    }
}

fn connect(config: &AppConfig, tokens: &TokenStore) -> Result<Arc<HttpAuthBackend>> {
    let token = tokens.load()?.map(|token| token.as_str().to_string());
    if token.is_none() {
        log::warn!("No session token stored; requests will be unauthenticated");
    }
    let backend =
        HttpAuthBackend::new(&config.backend, token).context("Failed to create HTTP client")?;
    Ok(Arc::new(backend))
}

async fn probe() -> Result<()> {
    let report = detect_capabilities(&Platform::console()).await;
    for item in &report.items {
        let status = match item.status {
            ProbeStatus::Supported => "supported",
            ProbeStatus::Unsupported => "unsupported",
        };
        println!("{:<10} {:<12} {}", item.method, status, item.message);
    }
    Ok(())
}

async fn enrolled(config: &AppConfig, tokens: &TokenStore) -> Result<()> {
    let backend = connect(config, tokens)?;
    let methods = backend
        .enrolled_methods()
        .await
        .context("Failed to fetch enrolled methods")?;

    if methods.is_empty() {
        println!("No biometric methods enrolled");
    }
    for method in methods {
        match method.parse::<SupportedMethod>() {
            Ok(known) => println!("{:<10} {}", known, known.label()),
            Err(_) => println!("{:<10} (unknown method)", method),
        }
    }
    Ok(())
}

async fn authenticate(
    config: &AppConfig,
    tokens: &TokenStore,
    method: SupportedMethod,
    auth_type: AuthType,
) -> Result<()> {
    let backend = connect(config, tokens)?;
    let props = AuthProps::new(|payload| match serde_json::to_string_pretty(&payload.into_inner()) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("Failed to print verification payload: {}", e),
    })
    .with_auth_type(auth_type);

    let coordinator = BiometricAuthCoordinator::new(backend, Platform::console(), props)
        .with_config(config.ceremony.clone())
        .with_retry_policy(config.policy.clone());
    let mut updates = coordinator.subscribe();
    let mut last_message = String::new();

    // Enrollment is display-only; start as soon as the probes are in
    let mount = coordinator.mount();
    tokio::pin!(mount);
    let mut mounted = false;
    while coordinator.capability_report().is_none() {
        if mounted {
            bail!("Capability detection did not complete");
        }
        tokio::select! {
            _ = &mut mount, if !mounted => mounted = true,
            Ok(()) = updates.changed() => {}
            _ = tokio::signal::ctrl_c() => {
                coordinator.unmount();
                bail!("Authentication cancelled");
            }
        }
    }

    let Some(offered) = coordinator
        .offered_methods()
        .into_iter()
        .find(|offered| offered.method() == method)
    else {
        bail!("{} is not supported on this device", method.label());
    };

    let ceremony = coordinator.authenticate(offered);
    tokio::pin!(ceremony);

    let outcome = loop {
        tokio::select! {
            outcome = &mut ceremony => break outcome,
            _ = &mut mount, if !mounted => mounted = true,
            Ok(()) = updates.changed() => {
                print_status(&updates.borrow_and_update(), &mut last_message);
            }
            _ = tokio::signal::ctrl_c() => {
                coordinator.unmount();
                break CeremonyOutcome::Cancelled;
            }
        }
    };
    print_status(&coordinator.session(), &mut last_message);

    match outcome {
        CeremonyOutcome::Succeeded(_) => Ok(()),
        CeremonyOutcome::Failed(kind) => Err(anyhow!("Authentication failed ({:?})", kind)),
        CeremonyOutcome::LockedOut => Err(anyhow!("Biometric sign-in is locked")),
        CeremonyOutcome::Ignored => Err(anyhow!("Another ceremony is already running")),
        CeremonyOutcome::Cancelled => Err(anyhow!("Authentication cancelled")),
    }
}

fn print_status(session: &AuthSession, last_message: &mut String) {
    if !session.status_message.is_empty() && session.status_message != *last_message {
        println!("{}", session.status_message);
        *last_message = session.status_message.clone();
    }
}

fn token(tokens: &TokenStore, action: TokenAction) -> Result<()> {
    match action {
        TokenAction::Set { token } => {
            let token = validate_bearer_token(&token).context("Invalid token")?;
            tokens.save(&token)?;
            println!("Token saved");
        }
        TokenAction::Clear => {
            if tokens.clear()? {
                println!("Token cleared");
            } else {
                println!("No token stored");
            }
        }
    }
    Ok(())
}
