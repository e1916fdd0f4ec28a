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

//! Env and Date trackers — spec.md §9 "Prototype/global patching →
//! capability injection": instead of the original's Date/process.env
//! proxy shims, drivers consult these tracker objects explicitly.
//! Keyed-lock-guarded maps, the same shape as
//! `agentreplay-core::resilience::CircuitBreaker`'s internal state,
//! generalized from one lock per breaker to one DashMap entry per
//! replay trace.

use crate::error::{Result, SdkError};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use tuskdrift_core::TraceId;

/// Per-trace environment variable overrides, populated from the
/// `x-td-env-vars` inbound header (spec.md §6, §9: "JSON object...
/// reject malformed values").
#[derive(Default)]
pub struct EnvTracker {
    overrides: DashMap<TraceId, HashMap<String, String>>,
}

impl EnvTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `x-td-env-vars` header value and installs it for
    /// `trace_id`. Malformed JSON is rejected rather than silently
    /// ignored (spec.md §9 open question: "reject malformed values").
    pub fn install_from_header(&self, trace_id: TraceId, raw: &str) -> Result<()> {
        let parsed: HashMap<String, String> = serde_json::from_str(raw)
            .map_err(|e| SdkError::InvalidEnvHeader(e.to_string()))?;
        self.overrides.insert(trace_id, parsed);
        Ok(())
    }

    /// Resolves `key` for `trace_id`: an installed override wins, else
    /// falls through to the real process environment (spec.md §9).
    pub fn get(&self, trace_id: Option<TraceId>, key: &str) -> Option<String> {
        if let Some(trace_id) = trace_id {
            if let Some(overrides) = self.overrides.get(&trace_id) {
                if let Some(value) = overrides.get(key) {
                    return Some(value.clone());
                }
            }
        }
        std::env::var(key).ok()
    }

    pub fn clear(&self, trace_id: TraceId) {
        self.overrides.remove(&trace_id);
    }
}

/// Per-trace "last observed mock timestamp" (spec.md §9: "the Date
/// tracker is keyed by replay-trace-id and serves the last observed
/// mock timestamp so deterministic replays see stable clocks"). In
/// RECORD mode there is nothing to serve — the real clock is always
/// correct — so `record` is a no-op there; REPLAY is the only mode
/// that actually consults [`Self::last`].
#[derive(Default)]
pub struct DateTracker {
    last: DashMap<TraceId, Mutex<chrono::DateTime<chrono::Utc>>>,
}

impl DateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `timestamp` as the most recent clock reading observed
    /// for `trace_id`.
    pub fn record(&self, trace_id: TraceId, timestamp: chrono::DateTime<chrono::Utc>) {
        match self.last.get(&trace_id) {
            Some(slot) => *slot.lock() = timestamp,
            None => {
                self.last.insert(trace_id, Mutex::new(timestamp));
            }
        }
    }

    /// The last timestamp recorded for `trace_id`, if any.
    pub fn last(&self, trace_id: TraceId) -> Option<chrono::DateTime<chrono::Utc>> {
        self.last.get(&trace_id).map(|slot| *slot.lock())
    }

    pub fn clear(&self, trace_id: TraceId) {
        self.last.remove(&trace_id);
    }
}
