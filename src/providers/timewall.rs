// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TimeWall postback adapter.
//!
//! Vocabulary:
//! - user id: `userID`
//! - external transaction id: `transactionID`
//! - type: `credit` or `chargeback` (closed vocabulary)
//! - amount: `currencyAmount`, denominated in the platform's coin currency
//!   and converted to USD via the configured rate; chargebacks arrive with a
//!   negative sign, whose magnitude is used
//! - `revenue`: raw string that feeds the hash, not the credited amount
//! - authenticity: `hash` = sha256 of `<userID><revenue><secret_key>`, plus
//!   a source-IP allowlist that is enforced whenever one is configured

use tracing::warn;

use super::{first_param, PostbackDecision, PostbackEvent, ProviderKind, RawPostback};
use crate::config::PostbackConfig;
use crate::error::PostbackRejection;
use crate::money;
use crate::storage::JournalKind;
use crate::verify;

/// Map TimeWall's `type` parameter onto the internal event kinds.
fn map_type(raw_type: &str) -> Option<JournalKind> {
    match raw_type.trim().to_ascii_lowercase().as_str() {
        "credit" => Some(JournalKind::Credit),
        "chargeback" => Some(JournalKind::Reversal),
        _ => None,
    }
}

pub(super) fn evaluate(
    raw: &RawPostback<'_>,
    config: &PostbackConfig,
) -> Result<PostbackDecision, PostbackRejection> {
    let params = raw.params;

    let Some(user_id) = first_param(params, &["userID"]) else {
        return Err(PostbackRejection::MissingUserOrTx);
    };
    let Some(transaction_id) = first_param(params, &["transactionID"]) else {
        return Err(PostbackRejection::MissingUserOrTx);
    };

    if !verify::ip_allowed(raw.remote_ip, &config.timewall.allowed_ips) {
        warn!(
            provider = "timewall",
            remote_ip = %raw.remote_ip,
            "postback from address outside the allowlist"
        );
        return Err(PostbackRejection::ForbiddenIp);
    }

    if let Some(secret) = config.timewall.secret.as_deref() {
        let revenue = first_param(params, &["revenue"]).unwrap_or("");
        let expected = verify::sha256_hex(&format!("{user_id}{revenue}{secret}"));
        let provided = first_param(params, &["hash"]).unwrap_or("");
        if !verify::hash_matches(provided, &expected) {
            warn!(
                provider = "timewall",
                remote_ip = %raw.remote_ip,
                transaction_id,
                "postback hash mismatch"
            );
            return Err(PostbackRejection::InvalidHash);
        }
    }

    let Some(kind) = first_param(params, &["type"]).and_then(map_type) else {
        return Err(PostbackRejection::InvalidStatus);
    };

    let Some(raw_amount) = first_param(params, &["currencyAmount"]) else {
        return Err(PostbackRejection::InvalidAmount);
    };
    // Chargebacks are reported with a negative sign; the ledger works with
    // the magnitude and applies direction from the kind.
    let unsigned_amount = match kind {
        JournalKind::Reversal => raw_amount.strip_prefix('-').unwrap_or(raw_amount),
        JournalKind::Credit => raw_amount,
    };
    let gross_cents = money::normalize_with_rate(
        unsigned_amount,
        config.timewall_currency_rate,
        config.min_amount_cents,
    )
    .map_err(|_| PostbackRejection::InvalidAmount)?;

    Ok(PostbackDecision::Event(PostbackEvent {
        provider: ProviderKind::TimeWall,
        user_id: user_id.to_string(),
        external_id: transaction_id.to_string(),
        journal_id: ProviderKind::TimeWall.journal_id(transaction_id),
        kind,
        bonus: false,
        gross_cents,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::IpAddr;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn raw_from<'a>(params: &'a HashMap<String, String>, ip: &str) -> RawPostback<'a> {
        RawPostback {
            params,
            remote_ip: ip.parse::<IpAddr>().unwrap(),
        }
    }

    fn config_with_secret(secret: &str) -> PostbackConfig {
        let mut config = PostbackConfig::default();
        config.timewall.secret = Some(secret.to_string());
        config
    }

    fn signed_params(user_id: &str, revenue: &str, secret: &str) -> HashMap<String, String> {
        let mut map = params(&[
            ("userID", user_id),
            ("transactionID", "tw-1"),
            ("type", "credit"),
            ("revenue", revenue),
            ("currencyAmount", "10"),
        ]);
        map.insert(
            "hash".to_string(),
            verify::sha256_hex(&format!("{user_id}{revenue}{secret}")),
        );
        map
    }

    #[test]
    fn type_mapping_is_stable() {
        assert_eq!(map_type("credit"), Some(JournalKind::Credit));
        assert_eq!(map_type("Chargeback"), Some(JournalKind::Reversal));
        assert_eq!(map_type("click"), None);
    }

    #[test]
    fn valid_signed_credit_produces_event() {
        let map = signed_params("42", "0.50", "tw-secret");
        match evaluate(&raw_from(&map, "203.0.113.7"), &config_with_secret("tw-secret")).unwrap() {
            PostbackDecision::Event(event) => {
                assert_eq!(event.journal_id, "TIMEWALL_tw-1");
                assert_eq!(event.kind, JournalKind::Credit);
                assert_eq!(event.gross_cents, 1000);
            }
            PostbackDecision::Ignored => panic!("expected event"),
        }
    }

    #[test]
    fn forged_hash_is_rejected() {
        let mut map = signed_params("42", "0.50", "tw-secret");
        map.insert("hash".to_string(), verify::sha256_hex("not-the-fields"));
        let result = evaluate(&raw_from(&map, "203.0.113.7"), &config_with_secret("tw-secret"));
        assert_eq!(result.unwrap_err(), PostbackRejection::InvalidHash);
    }

    #[test]
    fn hash_covers_revenue_not_currency_amount() {
        let mut map = signed_params("42", "0.50", "tw-secret");
        // Tampering with currencyAmount alone leaves the hash valid;
        // tampering with revenue breaks it.
        map.insert("currencyAmount".to_string(), "99".to_string());
        assert!(matches!(
            evaluate(&raw_from(&map, "203.0.113.7"), &config_with_secret("tw-secret")).unwrap(),
            PostbackDecision::Event(_)
        ));

        map.insert("revenue".to_string(), "9.99".to_string());
        let result = evaluate(&raw_from(&map, "203.0.113.7"), &config_with_secret("tw-secret"));
        assert_eq!(result.unwrap_err(), PostbackRejection::InvalidHash);
    }

    #[test]
    fn allowlist_is_enforced_when_configured() {
        let map = signed_params("42", "0.50", "tw-secret");
        let mut config = config_with_secret("tw-secret");
        config.timewall.allowed_ips = vec!["198.51.100.1".parse().unwrap()];

        let blocked = evaluate(&raw_from(&map, "203.0.113.7"), &config);
        assert_eq!(blocked.unwrap_err(), PostbackRejection::ForbiddenIp);

        let allowed = evaluate(&raw_from(&map, "198.51.100.1"), &config);
        assert!(matches!(allowed.unwrap(), PostbackDecision::Event(_)));
    }

    #[test]
    fn chargeback_uses_magnitude_of_negative_amount() {
        let mut map = signed_params("42", "0.50", "tw-secret");
        map.insert("type".to_string(), "chargeback".to_string());
        map.insert("currencyAmount".to_string(), "-10".to_string());
        match evaluate(&raw_from(&map, "203.0.113.7"), &config_with_secret("tw-secret")).unwrap() {
            PostbackDecision::Event(event) => {
                assert_eq!(event.kind, JournalKind::Reversal);
                assert_eq!(event.gross_cents, 1000);
            }
            PostbackDecision::Ignored => panic!("expected event"),
        }
    }

    #[test]
    fn negative_amount_on_credit_is_invalid() {
        let mut map = signed_params("42", "0.50", "tw-secret");
        map.insert("currencyAmount".to_string(), "-10".to_string());
        let result = evaluate(&raw_from(&map, "203.0.113.7"), &config_with_secret("tw-secret"));
        assert_eq!(result.unwrap_err(), PostbackRejection::InvalidAmount);
    }

    #[test]
    fn currency_rate_converts_to_usd() {
        let map = signed_params("42", "0.50", "tw-secret");
        let mut config = config_with_secret("tw-secret");
        config.timewall_currency_rate = 1000.0;
        match evaluate(&raw_from(&map, "203.0.113.7"), &config).unwrap() {
            // 10 coins at 1000 coins/USD = $0.01
            PostbackDecision::Event(event) => assert_eq!(event.gross_cents, 1),
            PostbackDecision::Ignored => panic!("expected event"),
        }
    }

    #[test]
    fn unknown_type_is_invalid_status() {
        let mut map = signed_params("42", "0.50", "tw-secret");
        map.insert("type".to_string(), "click".to_string());
        let result = evaluate(&raw_from(&map, "203.0.113.7"), &config_with_secret("tw-secret"));
        assert_eq!(result.unwrap_err(), PostbackRejection::InvalidStatus);
    }

    #[test]
    fn missing_ids_are_rejected() {
        let map = params(&[("type", "credit"), ("currencyAmount", "10")]);
        let result = evaluate(&raw_from(&map, "203.0.113.7"), &config_with_secret("tw-secret"));
        assert_eq!(result.unwrap_err(), PostbackRejection::MissingUserOrTx);
    }
}
