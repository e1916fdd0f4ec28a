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

//! Error kinds for the reference HTTP driver — spec.md §7.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpDriverError {
    #[error(transparent)]
    Transport(#[from] tuskdrift_transport::TransportError),

    /// REPLAY: no recorded mock matched any of the six resolver tiers.
    /// Raising this to the caller is the default driver policy per
    /// spec.md §7 ("Driver-defined policy: raise... most drivers").
    #[error("no recorded mock found for this outbound call")]
    MockNotFound,

    /// REPLAY: `startSpan` failed — fatal, because correctness depends
    /// on span presence (spec.md §4.1).
    #[error("span creation failed in replay mode: {0}")]
    ReplaySpanCreationFailed(String),

    /// REPLAY: an inbound request carried no `x-td-trace-id` header.
    #[error("replay request missing x-td-trace-id header")]
    MissingReplayTraceId,

    #[error("malformed x-td-env-vars header: {0}")]
    InvalidEnvHeader(String),

    #[error("the underlying call failed: {0}")]
    OriginalCall(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HttpDriverError>;
