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

//! Length-prefixed framed binary protocol to the CLI: connect, mock
//! requests with request-id correlation, and fire-and-forget inbound
//! replay spans.

pub mod client;
pub mod error;
pub mod framing;
pub mod message;
pub mod sync_client;

pub use client::{AsyncDuplex, ConnInfo, ConnectionState, TransportClient};
pub use error::{Result, TransportError};
pub use message::{generate_request_id, TransportMessage};
pub use sync_client::{SyncConnInfo, SyncMockClient};
