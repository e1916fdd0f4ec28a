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

//! Ambient logging init, grounded on
//! `agentreplay-server::run_server`'s `tracing_subscriber::registry()`
//! setup: an `EnvFilter` (falling back to a crate-scoped default
//! directive when `RUST_LOG` is unset) plus a formatting layer.

use crate::config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global `tracing` subscriber. `log_level` is
/// spec.md §6's `logLevel` config field; it only supplies the
/// fallback directive used when `RUST_LOG` is not set in the
/// environment, so an operator's explicit `RUST_LOG` always wins.
///
/// `Silent` disables the fallback directive entirely ("off").
///
/// Call once per process; a second call is a no-op failure that this
/// function swallows, since by the time a second SDK instance spins
/// up in the same process the first subscriber is already the
/// correct one to keep.
pub fn init_logging(log_level: Option<LogLevel>) {
    let default_directive = match log_level {
        Some(level) => format!("tuskdrift={}", level.as_filter_directive()),
        None => "tuskdrift=info".to_string(),
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
