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

//! The reference HTTP driver (spec.md §6) — the only in-scope
//! interceptor. Wires `tuskdrift-core` span lifecycle, `tuskdrift-export`
//! batching, `tuskdrift-transform` redaction/drop rules, and either a
//! `tuskdrift-transport` CLI connection or an in-process mock store into
//! one `createAndExecuteSpan`-shaped entry point.

mod driver;
mod error;
mod mock_provider;
mod options;

pub use driver::HttpDriver;
pub use error::{HttpDriverError, Result};
pub use mock_provider::{LocalMockStore, MockProvider, TransportMockProvider};
pub use options::{HttpMessage, Mode, SpanOptions};
