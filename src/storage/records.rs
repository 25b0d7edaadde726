// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger and journal record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::providers::ProviderKind;

/// Direction of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JournalKind {
    /// User earned money for a completed action.
    Credit,
    /// Provider reversed/charged back a previously credited action.
    Reversal,
}

/// Terminal status of a journal entry, fixed at insert time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    /// Entry recorded a credit.
    Completed,
    /// Entry recorded a reversal.
    Reversed,
}

/// A user's ledger account.
///
/// `balance_cents` is mutated only inside [`LedgerDb::apply_event`]'s write
/// transaction and can never go below zero. `total_earned_cents` counts gross
/// lifetime credits and is never decremented by reversals.
///
/// [`LedgerDb::apply_event`]: super::ledger_db::LedgerDb::apply_event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerAccount {
    /// Stable internal user identifier (ledger account key).
    pub user_id: String,
    /// Current withdrawable amount in cents.
    pub balance_cents: i64,
    /// Cumulative lifetime credited amount in cents.
    pub total_earned_cents: i64,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl LedgerAccount {
    /// Create a fresh account with the given starting balance.
    pub fn new(user_id: impl Into<String>, balance_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            balance_cents,
            total_earned_cents: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a credit: balance and lifetime earnings both grow by the net
    /// amount. Returns the signed delta applied to the balance.
    pub fn apply_credit(&mut self, net_cents: i64) -> i64 {
        self.balance_cents += net_cents;
        self.total_earned_cents += net_cents;
        self.updated_at = Utc::now();
        net_cents
    }

    /// Apply a reversal: the balance is debited by at most its current value
    /// (floored at zero); lifetime earnings are untouched. Returns the signed
    /// (non-positive) delta actually applied to the balance.
    pub fn apply_reversal(&mut self, net_cents: i64) -> i64 {
        let debit = net_cents.min(self.balance_cents).max(0);
        self.balance_cents -= debit;
        self.updated_at = Utc::now();
        -debit
    }
}

/// An append-only journal entry, keyed by the provider-namespaced
/// idempotency id. Immutable after insert; corrections are modeled as new
/// reversal entries, never edits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JournalEntry {
    /// Provider-namespaced idempotency key, e.g. `CPX_abc123`.
    pub id: String,
    /// Server-assigned unique event id.
    pub event_id: Uuid,
    /// Ledger account the entry belongs to.
    pub user_id: String,
    /// Credit vs reversal.
    pub kind: JournalKind,
    /// Whether the originating postback was bonus-flagged.
    pub bonus: bool,
    /// Signed net amount actually applied to the balance, in cents
    /// (positive for credits, non-positive for reversals; a reversal clamped
    /// at the balance floor records the clamped delta).
    pub amount_cents: i64,
    /// Terminal status.
    pub status: JournalStatus,
    /// Network that originated the event.
    pub provider: ProviderKind,
    /// Server-side processing time.
    pub occurred_at: DateTime<Utc>,
    /// Raw provider query parameters, kept for audit/dispute resolution.
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
}

impl JournalEntry {
    /// Construct an entry at processing time.
    pub fn new(
        id: String,
        user_id: String,
        kind: JournalKind,
        bonus: bool,
        amount_cents: i64,
        provider: ProviderKind,
        meta: serde_json::Value,
    ) -> Self {
        let status = match kind {
            JournalKind::Credit => JournalStatus::Completed,
            JournalKind::Reversal => JournalStatus::Reversed,
        };
        Self {
            id,
            event_id: Uuid::new_v4(),
            user_id,
            kind,
            bonus,
            amount_cents,
            status,
            provider,
            occurred_at: Utc::now(),
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_grows_balance_and_lifetime_earnings() {
        let mut account = LedgerAccount::new("user-1", 0);
        let delta = account.apply_credit(700);
        assert_eq!(delta, 700);
        assert_eq!(account.balance_cents, 700);
        assert_eq!(account.total_earned_cents, 700);
    }

    #[test]
    fn reversal_debits_but_never_below_zero() {
        let mut account = LedgerAccount::new("user-1", 500);
        let delta = account.apply_reversal(700);
        assert_eq!(delta, -500);
        assert_eq!(account.balance_cents, 0);
    }

    #[test]
    fn reversal_leaves_lifetime_earnings_untouched() {
        let mut account = LedgerAccount::new("user-1", 0);
        account.apply_credit(1000);
        account.apply_reversal(400);
        assert_eq!(account.balance_cents, 600);
        assert_eq!(account.total_earned_cents, 1000);
    }

    #[test]
    fn journal_entry_status_follows_kind() {
        let credit = JournalEntry::new(
            "CPX_a".into(),
            "user-1".into(),
            JournalKind::Credit,
            false,
            700,
            ProviderKind::Cpx,
            serde_json::json!({}),
        );
        assert_eq!(credit.status, JournalStatus::Completed);

        let reversal = JournalEntry::new(
            "CPX_b".into(),
            "user-1".into(),
            JournalKind::Reversal,
            false,
            -700,
            ProviderKind::Cpx,
            serde_json::json!({}),
        );
        assert_eq!(reversal.status, JournalStatus::Reversed);
    }

    #[test]
    fn journal_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JournalKind::Credit).unwrap(),
            r#""credit""#
        );
        assert_eq!(
            serde_json::to_string(&JournalStatus::Reversed).unwrap(),
            r#""reversed""#
        );
    }
}
