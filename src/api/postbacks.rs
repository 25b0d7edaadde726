// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Postback endpoints for the supported offer networks.
//!
//! Each handler runs the same pipeline: adapter (parse + authenticate +
//! validate) → replay fast path → reward calculation → atomic ledger apply →
//! literal plain-text acknowledgement. Networks retry on non-200 responses,
//! so persistence failures answer 500 and rely on retry + idempotency;
//! malformed or forged requests answer 4xx and are never retried into the
//! ledger.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Query, State},
    http::HeaderMap,
};
use tracing::{error, info, warn};

use crate::error::{PostbackAck, PostbackRejection};
use crate::money;
use crate::providers::{self, PostbackDecision, ProviderKind, RawPostback};
use crate::reward;
use crate::state::AppState;
use crate::storage::{ApplyOutcome, ApplyRequest, JournalKind};

/// CPX Research postback endpoint.
#[utoipa::path(
    get,
    path = "/postbacks/cpx",
    tag = "Postbacks",
    responses(
        (status = 200, description = "`OK`, `REVERSED`, `ALREADY_HANDLED`, or `IGNORED_EVENT`", body = String, content_type = "text/plain"),
        (status = 400, description = "`MISSING_USER_OR_TX`, `INVALID_AMOUNT`, or `INVALID_STATUS`", body = String, content_type = "text/plain"),
        (status = 403, description = "`INVALID_HASH` or `FORBIDDEN_IP`", body = String, content_type = "text/plain"),
        (status = 404, description = "`USER_NOT_FOUND`", body = String, content_type = "text/plain"),
        (status = 500, description = "`SERVER_ERROR`", body = String, content_type = "text/plain")
    )
)]
pub async fn cpx_postback(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<PostbackAck, PostbackRejection> {
    process(ProviderKind::Cpx, &state, peer, &headers, &params)
}

/// BitLabs postback endpoint.
#[utoipa::path(
    get,
    path = "/postbacks/bitlabs",
    tag = "Postbacks",
    responses(
        (status = 200, description = "`OK`, `REVERSED`, `ALREADY_HANDLED`, or `IGNORED_EVENT`", body = String, content_type = "text/plain"),
        (status = 400, description = "`MISSING_USER_OR_TX` or `INVALID_AMOUNT`", body = String, content_type = "text/plain"),
        (status = 403, description = "`INVALID_SECRET`", body = String, content_type = "text/plain"),
        (status = 404, description = "`USER_NOT_FOUND`", body = String, content_type = "text/plain"),
        (status = 500, description = "`SERVER_ERROR`", body = String, content_type = "text/plain")
    )
)]
pub async fn bitlabs_postback(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<PostbackAck, PostbackRejection> {
    process(ProviderKind::BitLabs, &state, peer, &headers, &params)
}

/// TimeWall postback endpoint.
#[utoipa::path(
    get,
    path = "/postbacks/timewall",
    tag = "Postbacks",
    responses(
        (status = 200, description = "`OK`, `REVERSED`, or `ALREADY_HANDLED`", body = String, content_type = "text/plain"),
        (status = 400, description = "`MISSING_USER_OR_TX`, `INVALID_AMOUNT`, or `INVALID_STATUS`", body = String, content_type = "text/plain"),
        (status = 403, description = "`INVALID_HASH` or `FORBIDDEN_IP`", body = String, content_type = "text/plain"),
        (status = 404, description = "`USER_NOT_FOUND`", body = String, content_type = "text/plain"),
        (status = 500, description = "`SERVER_ERROR`", body = String, content_type = "text/plain")
    )
)]
pub async fn timewall_postback(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<PostbackAck, PostbackRejection> {
    process(ProviderKind::TimeWall, &state, peer, &headers, &params)
}

/// Caller source address, honoring the first `X-Forwarded-For` hop when the
/// service sits behind a reverse proxy.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| peer.ip())
}

/// Shared pipeline behind all three endpoints.
fn process(
    provider: ProviderKind,
    state: &AppState,
    peer: SocketAddr,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Result<PostbackAck, PostbackRejection> {
    let remote_ip = client_ip(headers, peer);
    let raw = RawPostback { params, remote_ip };

    let event = match providers::evaluate(provider, &raw, &state.config)? {
        PostbackDecision::Ignored => {
            info!(provider = %provider, "acknowledging lifecycle event without action");
            return Ok(PostbackAck::IgnoredEvent);
        }
        PostbackDecision::Event(event) => event,
    };

    // Replay fast path; the authoritative duplicate check runs again inside
    // the apply transaction.
    if state.replay_cache.seen(&event.journal_id) {
        return Ok(PostbackAck::AlreadyHandled);
    }
    match state.ledger.journal_contains(&event.journal_id) {
        Ok(true) => {
            state.replay_cache.record(&event.journal_id);
            return Ok(PostbackAck::AlreadyHandled);
        }
        Ok(false) => {}
        Err(e) => {
            error!(provider = %provider, error = %e, "journal lookup failed");
            return Err(PostbackRejection::ServerError);
        }
    }

    let net_amount_cents = reward::net_amount_cents(
        event.gross_cents,
        state.config.payout_ratio,
        state.config.bonus_multiplier,
        event.bonus,
    );

    let request = ApplyRequest {
        user_id: event.user_id.clone(),
        journal_id: event.journal_id.clone(),
        provider,
        kind: event.kind,
        bonus: event.bonus,
        net_amount_cents,
        meta: serde_json::to_value(params).unwrap_or(serde_json::Value::Null),
    };

    match state.ledger.apply_event(request) {
        Ok(ApplyOutcome::Applied {
            entry,
            balance_cents,
        }) => {
            state.replay_cache.record(&event.journal_id);
            info!(
                provider = %provider,
                journal_id = %event.journal_id,
                user_id = %event.user_id,
                amount = %money::format_cents(entry.amount_cents),
                balance = %money::format_cents(balance_cents),
                "postback applied"
            );
            Ok(match event.kind {
                JournalKind::Credit => PostbackAck::Applied,
                JournalKind::Reversal => PostbackAck::Reversed,
            })
        }
        Ok(ApplyOutcome::Duplicate) => {
            state.replay_cache.record(&event.journal_id);
            Ok(PostbackAck::AlreadyHandled)
        }
        Ok(ApplyOutcome::UserNotFound) => {
            warn!(
                provider = %provider,
                user_id = %event.user_id,
                journal_id = %event.journal_id,
                "postback for unknown ledger account"
            );
            Err(PostbackRejection::UserNotFound)
        }
        Err(e) => {
            error!(
                provider = %provider,
                journal_id = %event.journal_id,
                error = %e,
                "postback apply failed; transaction rolled back"
            );
            Err(PostbackRejection::ServerError)
        }
    }
}
