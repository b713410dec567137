//! Media Manager - upload and delete files in a media directory over HTTP.
//!
//! This binary starts the HTTP server and configures all components.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_manager::{
    config::{CheckConfig, Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat},
    controller::{Action, MediaController, IGNORED_FOLDER_ENTRIES, MEGABYTE},
    media::{
        AuditListener, EventDispatcher, LocalMediaStore, MediaStore, PermissionRegistry,
        ProtectedNames, MEDIA_COMPONENT,
    },
    server::{auth::RequestTokens, create_router, RouterConfig, ACTOR_HEADER, TOKEN_HEADER},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let grants = match config.grant_table() {
        Ok(grants) => grants,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let staging_dir = config.staging_dir();
    for dir in [&config.base_dir, &staging_dir] {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            error!("Unable to create {}: {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let limits = config.limits();
    info!("Configuration:");
    info!("  Media root: {}", config.base_dir.display());
    info!("  Staging: {}", staging_dir.display());
    info!("  Grants: {} actor(s)", grants.actor_count());
    info!(
        "  Max upload: {}",
        match limits.upload_maxsize {
            0 => "unlimited".to_string(),
            n => format!("{}MB", n / MEGABYTE),
        }
    );
    if grants.actor_count() == 0 {
        warn!("  No grants configured - every upload and delete will be refused");
    }

    let mut events = EventDispatcher::new().with_listener(AuditListener);
    if !config.protected_names.is_empty() {
        info!("  Protected names: {}", config.protected_names.join(", "));
        events = events.with_listener(ProtectedNames::new(&config.protected_names));
    }

    let mut store = LocalMediaStore::new();
    if let Some(mode) = config.file_mode {
        store = store.with_file_mode(mode);
    }

    let controller = MediaController::new(&config.base_dir, store, Arc::new(grants))
        .with_events(events)
        .with_filter(Arc::new(config.extension_policy()))
        .with_limits(limits);

    let router = create_router(controller, build_router_config(&config, staging_dir));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    media-manager token <actor>    # request token for uploads");
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "media_manager=debug,tower_http=debug"
    } else {
        "media_manager=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig, staging_dir: impl AsRef<Path>) -> RouterConfig {
    let limits = config.limits();
    let mut router_config = RouterConfig::new(config.token_secret_or_empty(), staging_dir.as_ref())
        .with_redirect_base(&config.redirect_base)
        .with_body_limit(limits.post_max)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let token = RequestTokens::new(&config.secret).issue(&config.actor);

    match config.format {
        TokenOutputFormat::Token => println!("{}", token),
        TokenOutputFormat::Headers => {
            println!("{}: {}", ACTOR_HEADER, config.actor);
            println!("{}: {}", TOKEN_HEADER, token);
        }
        TokenOutputFormat::Json => {
            let json = serde_json::json!({
                "actor": config.actor,
                "token": token,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(out) => println!("{}", out),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Media Manager Configuration Check");
    println!("═════════════════════════════════");
    println!();

    let store = LocalMediaStore::new();

    if let Err(e) = check_writable_dir(&store, "Media root", &config.base_dir).await {
        println!("✗ {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = check_writable_dir(&store, "Staging", &config.staging_dir()).await {
        println!("✗ {}", e);
        return ExitCode::FAILURE;
    }

    let grants = match config.grant_table() {
        Ok(grants) => {
            println!("✓ Grants: {} actor(s)", grants.actor_count());
            grants
        }
        Err(e) => {
            println!("✗ Grants: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref actor) = config.actor {
        println!();
        println!("Actor '{}':", actor);
        for action in [Action::Create, Action::Delete] {
            let allowed = grants.authorize(actor, &action.capability(), MEDIA_COMPONENT);
            println!("  {} {}", if allowed { "✓" } else { "✗" }, action);
        }
    }

    if config.count_files {
        println!();
        match store
            .list_files_recursive(&config.base_dir, IGNORED_FOLDER_ENTRIES)
            .await
        {
            Ok(files) => println!("Files under media root: {}", files.len()),
            Err(e) => println!("  Error listing files: {}", e),
        }
    }

    println!();
    println!("═════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}

/// Check that `dir` exists, is a directory and accepts new files.
async fn check_writable_dir(store: &LocalMediaStore, label: &str, dir: &Path) -> Result<(), String> {
    if !store.is_dir(dir).await {
        return Err(format!("{}: {} is not a directory", label, dir.display()));
    }

    let probe = tempfile::Builder::new()
        .prefix(".media-check-")
        .tempfile_in(dir)
        .map_err(|e| format!("{}: {} is not writable ({})", label, dir.display(), e))?;
    drop(probe);

    println!("✓ {}: {}", label, dir.display());
    Ok(())
}
