// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BitLabs postback adapter.
//!
//! Vocabulary:
//! - user id: `user_id`
//! - external transaction id: `transaction_id`
//! - event: `completed`/`approved` credit, `reversed`/`chargeback` reversal;
//!   BitLabs also delivers lifecycle events (screenouts, starts, ...) the
//!   platform acknowledges without acting on
//! - amount: `value` (USD)
//! - authenticity: flat `secret` query parameter

use tracing::warn;

use super::{first_param, PostbackDecision, PostbackEvent, ProviderKind, RawPostback};
use crate::config::PostbackConfig;
use crate::error::PostbackRejection;
use crate::money;
use crate::storage::JournalKind;
use crate::verify;

/// Map BitLabs' `event` parameter onto the internal event kinds.
///
/// `None` means an unrecognized lifecycle event, which is acknowledged as
/// ignored rather than rejected - erroring here causes provider retry storms
/// over events the platform never acts on.
fn map_event(raw_event: &str) -> Option<JournalKind> {
    match raw_event.trim().to_ascii_lowercase().as_str() {
        "completed" | "approved" => Some(JournalKind::Credit),
        "reversed" | "chargeback" => Some(JournalKind::Reversal),
        _ => None,
    }
}

pub(super) fn evaluate(
    raw: &RawPostback<'_>,
    config: &PostbackConfig,
) -> Result<PostbackDecision, PostbackRejection> {
    let params = raw.params;

    let Some(user_id) = first_param(params, &["user_id"]) else {
        return Err(PostbackRejection::MissingUserOrTx);
    };
    let Some(transaction_id) = first_param(params, &["transaction_id"]) else {
        return Err(PostbackRejection::MissingUserOrTx);
    };

    if let Some(secret) = config.bitlabs.secret.as_deref() {
        let provided = first_param(params, &["secret"]).unwrap_or("");
        if !verify::constant_time_eq(provided, secret) {
            warn!(
                provider = "bitlabs",
                remote_ip = %raw.remote_ip,
                transaction_id,
                "postback secret mismatch"
            );
            return Err(PostbackRejection::InvalidSecret);
        }
    }

    let Some(kind) = first_param(params, &["event"]).and_then(map_event) else {
        return Ok(PostbackDecision::Ignored);
    };

    let Some(raw_amount) = first_param(params, &["value"]) else {
        return Err(PostbackRejection::InvalidAmount);
    };
    let gross_cents = money::normalize(raw_amount, config.min_amount_cents)
        .map_err(|_| PostbackRejection::InvalidAmount)?;

    Ok(PostbackDecision::Event(PostbackEvent {
        provider: ProviderKind::BitLabs,
        user_id: user_id.to_string(),
        external_id: transaction_id.to_string(),
        journal_id: ProviderKind::BitLabs.journal_id(transaction_id),
        kind,
        bonus: false,
        gross_cents,
    }))
}
