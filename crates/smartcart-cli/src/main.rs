//! smartcart - interactive shell for the smart-cart checkout backend.
//!
//! Login, cart pairing, barcode scanning, weight validation, checkout, and
//! recipe recommendations, all backed by the core API client. The kiosk
//! hardware renders its own UI; this binary is the operator/debug surface
//! over the same core.

mod app;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smartcart_core::api::{ApiClient, Gateway};
use smartcart_core::auth::SessionStore;
use smartcart_core::config::Config;

use app::App;

/// Initialize tracing into a daily-rolled log file. The terminal stays clean
/// for the shell itself; use RUST_LOG to control the level.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "smartcart.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let cache_dir = config.cache_dir()?;
    let _log_guard = init_tracing(&cache_dir.join("logs"));
    info!("smartcart shell starting");

    let tokens = Arc::new(SessionStore::open(cache_dir));
    let gateway = Arc::new(Gateway::new(config.api_base_url(), tokens.clone())?);

    // A terminal refresh failure flips this flag; the shell prompts re-login.
    let session_expired = Arc::new(AtomicBool::new(false));
    {
        let flag = session_expired.clone();
        gateway.on_session_expired(move || flag.store(true, Ordering::SeqCst));
    }

    let client = ApiClient::new(gateway);
    let mut app = App::new(client, config, tokens, session_expired);
    app.run().await
}
