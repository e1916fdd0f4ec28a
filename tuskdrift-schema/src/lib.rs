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

//! Schema inference and deterministic canonical hashing.

pub mod canonical;
pub mod clean_span;
pub mod hasher;
pub mod schema;
pub mod value;

pub use canonical::canonicalize;
pub use clean_span::CleanSpan;
pub use hasher::{generate_schema_and_hash, sha256_hex, GeneratedSchemaAndHash};
pub use schema::{
    infer_schema, infer_schema_with_merges, DecodedType, Encoding, JsonSchema, JsonSchemaWithMerge,
    SchemaMerge, SchemaMerges,
};
pub use value::Value;
