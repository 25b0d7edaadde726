// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CPX Research postback adapter.
//!
//! Vocabulary:
//! - user id: `user_id` (falling back to `subid`)
//! - external transaction id: `trans_id`
//! - status: `1`/`completed` credit, `2`/`canceled`/`chargeback` reversal
//! - amount: `amount_usd`, falling back to `amount_local`
//! - `type=bonus` marks promotional bonus payouts (`out` is a plain earn)
//! - authenticity: `hash` (or `secure_hash`) = md5 of `<trans_id>-<secret>`,
//!   plus an optional source-IP allowlist

use tracing::warn;

use super::{first_param, PostbackDecision, PostbackEvent, ProviderKind, RawPostback};
use crate::config::PostbackConfig;
use crate::error::PostbackRejection;
use crate::money;
use crate::storage::JournalKind;
use crate::verify;

/// Map CPX's `status` parameter onto the internal event kinds.
///
/// The vocabulary is closed; anything else is a malformed request, not an
/// ignorable lifecycle event.
fn map_status(raw_status: &str) -> Option<JournalKind> {
    match raw_status.trim().to_ascii_lowercase().as_str() {
        "1" | "completed" => Some(JournalKind::Credit),
        "2" | "canceled" | "chargeback" => Some(JournalKind::Reversal),
        _ => None,
    }
}

pub(super) fn evaluate(
    raw: &RawPostback<'_>,
    config: &PostbackConfig,
) -> Result<PostbackDecision, PostbackRejection> {
    let params = raw.params;

    let Some(user_id) = first_param(params, &["user_id", "subid"]) else {
        return Err(PostbackRejection::MissingUserOrTx);
    };
    let Some(trans_id) = first_param(params, &["trans_id"]) else {
        return Err(PostbackRejection::MissingUserOrTx);
    };

    if !verify::ip_allowed(raw.remote_ip, &config.cpx.allowed_ips) {
        warn!(
            provider = "cpx",
            remote_ip = %raw.remote_ip,
            "postback from address outside the allowlist"
        );
        return Err(PostbackRejection::ForbiddenIp);
    }

    if let Some(secret) = config.cpx.secret.as_deref() {
        let expected = verify::md5_hex(&format!("{trans_id}-{secret}"));
        let provided = first_param(params, &["hash", "secure_hash"]).unwrap_or("");
        if !verify::hash_matches(provided, &expected) {
            warn!(
                provider = "cpx",
                remote_ip = %raw.remote_ip,
                trans_id,
                "postback hash mismatch"
            );
            return Err(PostbackRejection::InvalidHash);
        }
    }

    let Some(kind) = first_param(params, &["status"]).and_then(map_status) else {
        return Err(PostbackRejection::InvalidStatus);
    };

    let bonus = first_param(params, &["type"])
        .map(|t| t.eq_ignore_ascii_case("bonus"))
        .unwrap_or(false);

    let Some(raw_amount) = first_param(params, &["amount_usd", "amount_local"]) else {
        return Err(PostbackRejection::InvalidAmount);
    };
    let gross_cents = money::normalize(raw_amount, config.min_amount_cents)
        .map_err(|_| PostbackRejection::InvalidAmount)?;

    Ok(PostbackDecision::Event(PostbackEvent {
        provider: ProviderKind::Cpx,
        user_id: user_id.to_string(),
        external_id: trans_id.to_string(),
        journal_id: ProviderKind::Cpx.journal_id(trans_id),
        kind,
        bonus,
        gross_cents,
    }))
}
