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

//! Declarative transform rules applied to span input/output values:
//! redact, mask, replace, or drop a matched field — spec.md §4.9.

mod action;
mod engine;
mod error;
mod rule;

pub use engine::{RequestMeta, TransformActionRecord, TransformEngine, TransformMetadata};
pub use error::{Result, TransformError};
pub use rule::{ActionConfig, Direction, RuleConfig, RuleTarget};
