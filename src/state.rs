// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::PostbackConfig;
use crate::storage::{LedgerDb, ReplayCache};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerDb>,
    pub replay_cache: Arc<ReplayCache>,
    pub config: Arc<PostbackConfig>,
}

impl AppState {
    pub fn new(ledger: LedgerDb, config: PostbackConfig) -> Self {
        let replay_cache = ReplayCache::new(config.replay_cache_capacity, config.replay_cache_ttl);
        Self {
            ledger: Arc::new(ledger),
            replay_cache: Arc::new(replay_cache),
            config: Arc::new(config),
        }
    }
}
