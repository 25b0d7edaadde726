// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, path::Path};

use tracing_subscriber::EnvFilter;

use postback_gateway::api::router;
use postback_gateway::config::{PostbackConfig, DATA_DIR_ENV, DEFAULT_DATA_DIR, LEDGER_DB_FILE};
use postback_gateway::money;
use postback_gateway::state::AppState;
use postback_gateway::storage::{LedgerAccount, LedgerDb};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = PostbackConfig::from_env();
    config.log_startup_report();

    // Open the embedded ledger database (created on first start)
    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let db_path = Path::new(&data_dir).join(LEDGER_DB_FILE);
    let ledger = LedgerDb::open(&db_path).expect("Failed to open ledger database");

    seed_dev_account(&ledger);

    let state = AppState::new(ledger, config);
    let app = router(state);

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!(
        addr = %addr,
        db = %db_path.display(),
        "postback gateway listening (docs at /docs)"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("HTTP server failed");
}

/// Initialize tracing per `LOG_FORMAT` (`json` or `pretty`) and `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Create the `SEED_USER_ID` ledger account if it does not exist yet.
/// Development convenience; postback processing never creates accounts.
fn seed_dev_account(ledger: &LedgerDb) {
    let Ok(user_id) = env::var("SEED_USER_ID") else {
        return;
    };
    let user_id = user_id.trim().to_string();
    if user_id.is_empty() {
        return;
    }

    match ledger.get_account(&user_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            let balance_cents = env::var("SEED_USER_BALANCE")
                .ok()
                .and_then(|raw| money::normalize(&raw, 0).ok())
                .unwrap_or(0);
            let account = LedgerAccount::new(user_id.clone(), balance_cents);
            if let Err(e) = ledger.upsert_account(&account) {
                tracing::warn!(user_id = %user_id, error = %e, "failed to seed ledger account");
            } else {
                tracing::info!(
                    user_id = %user_id,
                    balance = %money::format_cents(balance_cents),
                    "seeded ledger account"
                );
            }
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "failed to check for seed account");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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

    tracing::info!("shutdown signal received, draining in-flight postbacks");
}
