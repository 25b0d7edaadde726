// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `ledger_accounts`: user_id → serialized LedgerAccount
//! - `journal`: provider-namespaced journal id → serialized JournalEntry
//!
//! The journal id is the idempotency key. [`LedgerDb::apply_event`] is the
//! single write path for balances: it re-checks the journal id, mutates the
//! account, and inserts the journal entry inside one write transaction, so
//! either all of it lands or none of it does. redb serializes write
//! transactions, which also serializes concurrent postbacks for the same
//! user as required.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::records::{JournalEntry, JournalKind, LedgerAccount};
use crate::providers::ProviderKind;

/// Accounts table: user_id → serialized LedgerAccount (JSON bytes).
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger_accounts");

/// Journal table: journal id → serialized JournalEntry (JSON bytes).
/// Key uniqueness is the idempotency backstop.
const JOURNAL: TableDefinition<&str, &[u8]> = TableDefinition::new("journal");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type LedgerDbResult<T> = Result<T, LedgerDbError>;

// =============================================================================
// Apply Contract
// =============================================================================

/// A validated, authenticated postback ready to be applied.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    /// Ledger account to mutate.
    pub user_id: String,
    /// Provider-namespaced idempotency key.
    pub journal_id: String,
    /// Originating network.
    pub provider: ProviderKind,
    /// Credit vs reversal.
    pub kind: JournalKind,
    /// Whether the postback was bonus-flagged.
    pub bonus: bool,
    /// Net amount magnitude in cents (already through the reward calculator).
    pub net_amount_cents: i64,
    /// Raw provider parameters for the journal's audit trail.
    pub meta: serde_json::Value,
}

/// Outcome of [`LedgerDb::apply_event`].
#[derive(Debug)]
pub enum ApplyOutcome {
    /// Balance mutated and journal entry inserted.
    Applied {
        entry: JournalEntry,
        /// Account balance after the mutation, in cents.
        balance_cents: i64,
    },
    /// A journal entry with this id already exists; nothing was changed.
    Duplicate,
    /// No ledger account for the reported user; nothing was changed.
    UserNotFound,
}

// =============================================================================
// LedgerDb
// =============================================================================

/// Embedded ACID ledger + journal store.
pub struct LedgerDb {
    db: Database,
}

impl LedgerDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerDbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(JOURNAL)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert or replace a ledger account.
    ///
    /// This is a bootstrap/test entry point; postback processing never
    /// creates accounts.
    pub fn upsert_account(&self, account: &LedgerAccount) -> LedgerDbResult<()> {
        let json = serde_json::to_vec(account)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ACCOUNTS)?;
            table.insert(account.user_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up an account by user id.
    pub fn get_account(&self, user_id: &str) -> LedgerDbResult<Option<LedgerAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(user_id)? {
            Some(value) => {
                let account: LedgerAccount = serde_json::from_slice(value.value())?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Journal
    // =========================================================================

    /// Look up a journal entry by its provider-namespaced id.
    pub fn get_journal_entry(&self, journal_id: &str) -> LedgerDbResult<Option<JournalEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(JOURNAL)?;
        match table.get(journal_id)? {
            Some(value) => {
                let entry: JournalEntry = serde_json::from_slice(value.value())?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Fast existence probe used as the idempotency pre-check. The
    /// authoritative check happens again inside [`Self::apply_event`].
    pub fn journal_contains(&self, journal_id: &str) -> LedgerDbResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(JOURNAL)?;
        Ok(table.get(journal_id)?.is_some())
    }

    // =========================================================================
    // Atomic apply
    // =========================================================================

    /// Apply a postback event: one write transaction covering the journal
    /// re-check, the balance mutation, and the journal insert.
    ///
    /// Returns without mutating anything when the journal id already exists
    /// (duplicate delivery) or the account is missing. Any error rolls the
    /// whole transaction back.
    pub fn apply_event(&self, request: ApplyRequest) -> LedgerDbResult<ApplyOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut journal = write_txn.open_table(JOURNAL)?;

            // Re-check inside the transaction: two concurrent deliveries of
            // the same postback serialize here, and the loser sees the
            // winner's entry.
            let duplicate = journal.get(request.journal_id.as_str())?.is_some();
            if duplicate {
                ApplyOutcome::Duplicate
            } else {
                let account_bytes = {
                    match accounts.get(request.user_id.as_str())? {
                        Some(value) => Some(value.value().to_vec()),
                        None => None,
                    }
                };

                match account_bytes {
                    None => ApplyOutcome::UserNotFound,
                    Some(bytes) => {
                        let mut account: LedgerAccount = serde_json::from_slice(&bytes)?;

                        let applied_delta = match request.kind {
                            JournalKind::Credit => {
                                account.apply_credit(request.net_amount_cents)
                            }
                            JournalKind::Reversal => {
                                account.apply_reversal(request.net_amount_cents)
                            }
                        };

                        let mut meta = request.meta;
                        if request.kind == JournalKind::Reversal
                            && applied_delta.unsigned_abs() < request.net_amount_cents.unsigned_abs()
                        {
                            // Floored at zero: keep the full computed amount
                            // for dispute resolution.
                            if let Some(map) = meta.as_object_mut() {
                                map.insert(
                                    "computed_amount_cents".to_string(),
                                    serde_json::json!(-request.net_amount_cents),
                                );
                            }
                        }

                        let entry = JournalEntry::new(
                            request.journal_id.clone(),
                            request.user_id.clone(),
                            request.kind,
                            request.bonus,
                            applied_delta,
                            request.provider,
                            meta,
                        );

                        let account_json = serde_json::to_vec(&account)?;
                        accounts.insert(request.user_id.as_str(), account_json.as_slice())?;

                        let entry_json = serde_json::to_vec(&entry)?;
                        journal.insert(request.journal_id.as_str(), entry_json.as_slice())?;

                        ApplyOutcome::Applied {
                            entry,
                            balance_cents: account.balance_cents,
                        }
                    }
                }
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    /// Readiness probe: the database answers a read.
    pub fn health_check(&self) -> LedgerDbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(JOURNAL)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
