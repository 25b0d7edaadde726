// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-network postback adapters.
//!
//! Each offer network reports the same three facts - who earned, which
//! external transaction, how much - under its own query vocabulary and
//! authenticity scheme. The adapters translate those vocabularies onto the
//! shared [`PostbackEvent`] shape; everything downstream (reward
//! calculation, idempotency, the ledger) is provider-agnostic.
//!
//! The provider set is closed: adding a network means adding a variant to
//! [`ProviderKind`] and a module next to the existing three.

pub mod bitlabs;
pub mod cpx;
pub mod timewall;

use std::collections::HashMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::PostbackConfig;
use crate::error::PostbackRejection;
use crate::storage::JournalKind;

/// The supported offer networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Cpx,
    BitLabs,
    TimeWall,
}

impl ProviderKind {
    /// Uppercase namespace used to build journal ids.
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Cpx => "CPX",
            Self::BitLabs => "BITLABS",
            Self::TimeWall => "TIMEWALL",
        }
    }

    /// Lowercase name used in logs and routes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpx => "cpx",
            Self::BitLabs => "bitlabs",
            Self::TimeWall => "timewall",
        }
    }

    /// Build the provider-namespaced idempotency key for an external
    /// transaction id, e.g. `CPX_abc123`.
    pub fn journal_id(self, external_id: &str) -> String {
        format!("{}_{}", self.namespace(), external_id)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw inbound request as the adapter sees it.
#[derive(Debug)]
pub struct RawPostback<'a> {
    /// Query parameters, untouched.
    pub params: &'a HashMap<String, String>,
    /// Caller's source address (forwarded-for aware).
    pub remote_ip: IpAddr,
}

/// A postback translated onto the shared internal shape, authenticated and
/// amount-validated, ready for the reward calculator and the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostbackEvent {
    pub provider: ProviderKind,
    pub user_id: String,
    pub external_id: String,
    /// Provider-namespaced idempotency key.
    pub journal_id: String,
    pub kind: JournalKind,
    pub bonus: bool,
    /// Gross provider-reported amount in USD cents.
    pub gross_cents: i64,
}

/// Adapter verdict: an actionable event, or a lifecycle notification the
/// platform acknowledges without acting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostbackDecision {
    Event(PostbackEvent),
    Ignored,
}

/// Run the matching adapter: parse the vocabulary, check authenticity, map
/// the status, and validate the amount.
pub fn evaluate(
    provider: ProviderKind,
    raw: &RawPostback<'_>,
    config: &PostbackConfig,
) -> Result<PostbackDecision, PostbackRejection> {
    match provider {
        ProviderKind::Cpx => cpx::evaluate(raw, config),
        ProviderKind::BitLabs => bitlabs::evaluate(raw, config),
        ProviderKind::TimeWall => timewall::evaluate(raw, config),
    }
}

/// First non-empty value among the given parameter names.
pub(crate) fn first_param<'a>(
    params: &'a HashMap<String, String>,
    names: &[&str],
) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| params.get(*name))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_ids_are_provider_namespaced() {
        assert_eq!(ProviderKind::Cpx.journal_id("abc123"), "CPX_abc123");
        assert_eq!(ProviderKind::BitLabs.journal_id("t-9"), "BITLABS_t-9");
        assert_eq!(ProviderKind::TimeWall.journal_id("55"), "TIMEWALL_55");
    }

    #[test]
    fn first_param_prefers_earlier_names_and_skips_empties() {
        let mut params = HashMap::new();
        params.insert("subid".to_string(), "42".to_string());
        params.insert("user_id".to_string(), "  ".to_string());
        assert_eq!(first_param(&params, &["user_id", "subid"]), Some("42"));
        assert_eq!(first_param(&params, &["missing"]), None);
    }

    #[test]
    fn provider_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::TimeWall).unwrap(),
            r#""timewall""#
        );
    }
}
