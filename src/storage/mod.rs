// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent state for the postback subsystem, backed by an embedded redb
//! database.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/ledger.redb
//!   ledger_accounts   user_id → LedgerAccount
//!   journal           journal id → JournalEntry (append-only)
//! ```
//!
//! The journal id (`<PROVIDER>_<external tx id>`) is the idempotency key;
//! its uniqueness inside the write transaction is what guarantees
//! at-most-once balance mutation. The [`ReplayCache`] in front of it is a
//! bounded fast path only.

pub mod ledger_db;
pub mod records;
pub mod replay_cache;

pub use ledger_db::{ApplyOutcome, ApplyRequest, LedgerDb, LedgerDbError, LedgerDbResult};
pub use records::{JournalEntry, JournalKind, JournalStatus, LedgerAccount};
pub use replay_cache::ReplayCache;
