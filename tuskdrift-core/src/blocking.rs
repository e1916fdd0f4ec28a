// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Trace Blocking Manager — a process-wide "stop emitting" bit per trace.
//!
//! Grounded on `agentreplay-core::resilience::CircuitBreaker`'s shared,
//! lock-guarded state and the teacher's general preference for sharded
//! concurrent maps (`dashmap`) over a single global mutex.

use crate::ids::TraceId;
use dashmap::DashMap;
use std::time::Instant;

/// A blocked trace's bit is never cleared by this manager; callers that
/// care about unbounded memory growth should call [`TraceBlockingManager::prune_older_than`]
/// on a schedule (spec.md §4.4 leaves the retention policy to the consumer).
#[derive(Debug, Default)]
pub struct TraceBlockingManager {
    blocked: DashMap<TraceId, Instant>,
}

impl TraceBlockingManager {
    pub fn new() -> Self {
        Self {
            blocked: DashMap::new(),
        }
    }

    /// Mark a trace as blocked. Idempotent; never unblocks.
    pub fn block_trace(&self, id: TraceId) {
        self.blocked.entry(id).or_insert_with(Instant::now);
        tracing::warn!(trace_id = %id, "trace blocked");
    }

    pub fn is_blocked(&self, id: TraceId) -> bool {
        self.blocked.contains_key(&id)
    }

    /// Drop bookkeeping for traces last observed before `retention` ago.
    /// Policy is left to the caller; this just performs the sweep.
    pub fn prune_older_than(&self, retention: std::time::Duration) {
        let cutoff = Instant::now() - retention;
        self.blocked.retain(|_, observed_at| *observed_at > cutoff);
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}
