//! Aufait Relay - store-and-forward relay daemon for offline message delivery.

use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aufait_relay::auth::{NonceCache, RateLimiter, RequestAuthenticator};
use aufait_relay::config::Settings;
use aufait_relay::relay::RelayService;
use aufait_relay::server::{build_router, AppState};
use aufait_relay::store::EventQueueStore;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

const DEFAULT_CONFIG_PATH: &str = "/etc/aufait/relay.toml";

fn main() -> ExitCode {
    // Parse command line arguments (simple std::env approach)
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let config_path = get_config_path(&args);

    // Load configuration; without an explicit or present config file the
    // built-in defaults apply (secret still comes from the environment)
    let settings = match load_settings(config_path.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting {} v{}", NAME, VERSION);
    info!("Listen address: {}", settings.server.listen_addr);
    info!(
        "Request authentication: {}",
        if settings.security.shared_secret.is_empty() {
            "disabled (no shared secret configured)"
        } else {
            "enabled"
        }
    );

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    match runtime.block_on(async_main(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Relay daemon failed");
            ExitCode::FAILURE
        }
    }
}

/// Async main function.
async fn async_main(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let nonce_cache = Arc::new(NonceCache::new(settings.security.nonce_ttl_ms));
    let authenticator = Arc::new(RequestAuthenticator::new(
        &settings.security.shared_secret,
        Arc::clone(&nonce_cache),
        settings.security.max_clock_skew_ms,
    ));
    let rate_limiter = Arc::new(RateLimiter::new(
        settings.security.rate_limit_max_requests,
        settings.security.rate_limit_window_ms,
    ));
    // Keep idle-client windows from accumulating
    rate_limiter.start_cleanup_task(std::time::Duration::from_secs(60));
    let store = Arc::new(EventQueueStore::new(
        settings.limits.max_queue_per_dest,
        settings.limits.max_total_events,
    ));
    let relay = Arc::new(RelayService::new(
        Arc::clone(&store),
        settings.limits.max_pull_batch,
    ));

    let state = AppState {
        relay,
        authenticator,
        rate_limiter,
        max_push_body_bytes: settings.limits.max_push_body_bytes,
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server.listen_addr).await?;
    info!(
        addr = %listener.local_addr()?,
        max_queue_per_dest = settings.limits.max_queue_per_dest,
        max_total_events = settings.limits.max_total_events,
        "Relay listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Relay stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping listener");
}

/// Resolve settings from the config file, the default path, or defaults.
fn load_settings(config_path: Option<&str>) -> Result<Settings, aufait_relay::error::RelayError> {
    match config_path {
        Some(path) => Settings::load(path),
        None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Settings::load(DEFAULT_CONFIG_PATH)
        }
        None => {
            let mut settings = Settings::default();
            settings.apply_env();
            settings.validate()?;
            Ok(settings)
        }
    }
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Store-and-forward relay daemon for offline message delivery.

USAGE:
    {} [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: {}]
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT:
    AUFAIT_RELAY_SHARED_SECRET    Shared HMAC secret; overrides the config
                                  file. Empty disables authentication.
"#,
        NAME, VERSION, NAME, DEFAULT_CONFIG_PATH
    );
}

/// Get configuration file path from command line arguments.
fn get_config_path(args: &[String]) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if (arg == "--config" || arg == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

/// Initialize logging based on settings.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Default to pretty format
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
