// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the ledger database | `/data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `CPX_SECURE_HASH_SECRET` | CPX md5 postback secret | Unset (fail-open) |
//! | `CPX_ALLOWED_IPS` | Comma-separated CPX source addresses | Empty (skipped) |
//! | `BITLABS_SECRET` | BitLabs shared postback secret | Unset (fail-open) |
//! | `TIMEWALL_SECRET_KEY` | TimeWall sha256 postback secret | Unset (fail-open) |
//! | `TIMEWALL_ALLOWED_IPS` | Comma-separated TimeWall source addresses | Empty (skipped, warned) |
//! | `MIN_POSTBACK_AMOUNT` | Minimum USD amount accepted | `0.01` |
//! | `USER_PAYOUT_RATIO` | Share of gross credited to the user | `0.70` |
//! | `BONUS_MULTIPLIER` | Multiplier for bonus-flagged postbacks | `1.00` |
//! | `TIMEWALL_CURRENCY_RATE` | TimeWall coin units per USD | `1.0` |
//! | `REPLAY_CACHE_CAPACITY` | Max journal ids in the replay cache | `4096` |
//! | `REPLAY_CACHE_TTL_SECS` | Replay cache entry lifetime | `600` |
//! | `SEED_USER_ID` | Create this ledger account at startup (dev) | Unset |
//! | `SEED_USER_BALANCE` | Starting balance for the seeded account | `0.00` |
//!
//! Unset or empty secrets leave that provider's authenticity check disabled.
//! That fail-open state is deliberate (a deployment may front the service
//! with network-level controls instead) but is reported loudly at startup by
//! [`PostbackConfig::log_startup_report`].

use std::net::IpAddr;
use std::time::Duration;

use tracing::{info, warn};

use crate::money;

/// Environment variable name for the ledger data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory when `DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// File name of the embedded ledger database inside the data directory.
pub const LEDGER_DB_FILE: &str = "ledger.redb";

/// Authenticity configuration for one provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderAuthConfig {
    /// Secret used for the provider's secret/hash scheme. `None` disables
    /// the check (fail-open).
    pub secret: Option<String>,
    /// Source addresses postbacks may originate from. Empty disables the
    /// IP check.
    pub allowed_ips: Vec<IpAddr>,
}

impl ProviderAuthConfig {
    /// Whether any secret-based verification is active.
    pub fn is_protected(&self) -> bool {
        self.secret.is_some()
    }
}

/// Full postback subsystem configuration.
#[derive(Debug, Clone)]
pub struct PostbackConfig {
    pub cpx: ProviderAuthConfig,
    pub bitlabs: ProviderAuthConfig,
    pub timewall: ProviderAuthConfig,
    /// Minimum accepted postback amount, in cents.
    pub min_amount_cents: i64,
    /// Share of the gross amount credited to the user (e.g. 0.70).
    pub payout_ratio: f64,
    /// Net multiplier applied to bonus-flagged postbacks.
    pub bonus_multiplier: f64,
    /// TimeWall coin units per USD.
    pub timewall_currency_rate: f64,
    /// Replay cache capacity (journal ids).
    pub replay_cache_capacity: usize,
    /// Replay cache entry TTL.
    pub replay_cache_ttl: Duration,
}

impl Default for PostbackConfig {
    fn default() -> Self {
        Self {
            cpx: ProviderAuthConfig::default(),
            bitlabs: ProviderAuthConfig::default(),
            timewall: ProviderAuthConfig::default(),
            min_amount_cents: 1,
            payout_ratio: 0.70,
            bonus_multiplier: 1.00,
            timewall_currency_rate: 1.0,
            replay_cache_capacity: 4096,
            replay_cache_ttl: Duration::from_secs(600),
        }
    }
}

impl PostbackConfig {
    /// Load configuration from the environment, falling back to the
    /// documented defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cpx: ProviderAuthConfig {
                secret: env_optional("CPX_SECURE_HASH_SECRET"),
                allowed_ips: env_ip_list("CPX_ALLOWED_IPS"),
            },
            bitlabs: ProviderAuthConfig {
                secret: env_optional("BITLABS_SECRET"),
                allowed_ips: Vec::new(),
            },
            timewall: ProviderAuthConfig {
                secret: env_optional("TIMEWALL_SECRET_KEY"),
                allowed_ips: env_ip_list("TIMEWALL_ALLOWED_IPS"),
            },
            min_amount_cents: env_amount_cents("MIN_POSTBACK_AMOUNT", defaults.min_amount_cents),
            payout_ratio: env_f64("USER_PAYOUT_RATIO", defaults.payout_ratio),
            bonus_multiplier: env_f64("BONUS_MULTIPLIER", defaults.bonus_multiplier),
            timewall_currency_rate: env_f64(
                "TIMEWALL_CURRENCY_RATE",
                defaults.timewall_currency_rate,
            ),
            replay_cache_capacity: env_usize(
                "REPLAY_CACHE_CAPACITY",
                defaults.replay_cache_capacity,
            ),
            replay_cache_ttl: Duration::from_secs(env_u64("REPLAY_CACHE_TTL_SECS", 600)),
        }
    }

    /// Report the active authenticity mechanisms, warning loudly about any
    /// provider left fail-open.
    pub fn log_startup_report(&self) {
        report_provider("cpx", &self.cpx, "md5 field hash");
        report_provider("bitlabs", &self.bitlabs, "shared secret");
        report_provider("timewall", &self.timewall, "sha256 field hash");

        if self.timewall.is_protected() && self.timewall.allowed_ips.is_empty() {
            warn!(
                provider = "timewall",
                "no IP allowlist configured; TimeWall postbacks will be accepted from any source address"
            );
        }

        info!(
            payout_ratio = self.payout_ratio,
            bonus_multiplier = self.bonus_multiplier,
            min_amount = %money::format_cents(self.min_amount_cents),
            "postback reconciliation configured"
        );
    }
}

fn report_provider(name: &str, auth: &ProviderAuthConfig, scheme: &str) {
    if auth.is_protected() {
        info!(
            provider = name,
            scheme,
            allowed_ips = auth.allowed_ips.len(),
            "postback authenticity enabled"
        );
    } else {
        warn!(
            provider = name,
            "no postback secret configured; authenticity checking is DISABLED for this provider"
        );
    }
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

fn env_ip_list(name: &str) -> Vec<IpAddr> {
    let Some(raw) = env_optional(name) else {
        return Vec::new();
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                warn!(var = name, value = part, "ignoring unparseable allowlist address");
                None
            }
        })
        .collect()
}

fn env_f64(name: &str, default: f64) -> f64 {
    match env_optional(name).map(|v| v.parse::<f64>()) {
        Some(Ok(value)) if value.is_finite() && value > 0.0 => value,
        Some(_) => {
            warn!(var = name, default, "ignoring unparseable numeric setting");
            default
        }
        None => default,
    }
}

fn env_amount_cents(name: &str, default_cents: i64) -> i64 {
    match env_optional(name) {
        Some(raw) => match money::normalize(&raw, 0) {
            Ok(cents) => cents,
            Err(_) => {
                warn!(var = name, "ignoring unparseable amount setting");
                default_cents
            }
        },
        None => default_cents,
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    match env_optional(name).map(|v| v.parse::<usize>()) {
        Some(Ok(value)) if value > 0 => value,
        Some(_) => {
            warn!(var = name, default, "ignoring unparseable numeric setting");
            default
        }
        None => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match env_optional(name).map(|v| v.parse::<u64>()) {
        Some(Ok(value)) if value > 0 => value,
        Some(_) => {
            warn!(var = name, default, "ignoring unparseable numeric setting");
            default
        }
        None => default,
    }
}
