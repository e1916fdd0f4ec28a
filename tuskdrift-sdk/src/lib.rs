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

//! The facade crate a host application actually depends on: resolves
//! configuration (spec.md §6), initializes logging, owns the Env/Date
//! trackers (spec.md §9), and wires every subsystem crate plus the
//! reference HTTP driver into one `TuskDrift` handle.

mod config;
mod error;
mod facade;
mod logging;
mod trackers;

pub use config::{DriftMode, LogLevel, MockConnTarget, TuskConfig};
pub use error::{Result, SdkError};
pub use facade::{ServiceIdentity, TuskDrift};
pub use logging::init_logging;
pub use trackers::{DateTracker, EnvTracker};

// Re-exported so a host application need only depend on this one crate
// for the pieces it directly touches (drivers, adapters, rules).
pub use tuskdrift_export::adapters::{CallbackAdapter, ExportAdapter, FilesystemAdapter, InMemoryAdapter};
pub use tuskdrift_http::{HttpDriver, HttpMessage, Mode, MockProvider, SpanOptions};
pub use tuskdrift_transform::RuleConfig;
