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

//! The closed set of span attribute keys, plus the small enums that
//! classify a span (kind, package type, status).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of attribute names a driver may set on a span.
///
/// Kept closed (rather than an arbitrary string key) so that the span
/// transformer can exhaustively match on it instead of guessing at
/// string keys coming from driver code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttrKey {
    Name,
    PackageName,
    SubmoduleName,
    InstrumentationName,
    PackageType,
    InputValue,
    OutputValue,
    InputSchemaMerges,
    OutputSchemaMerges,
    Metadata,
    TransformMetadata,
    IsPreAppStart,
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttrKey::Name => "NAME",
            AttrKey::PackageName => "PACKAGE_NAME",
            AttrKey::SubmoduleName => "SUBMODULE_NAME",
            AttrKey::InstrumentationName => "INSTRUMENTATION_NAME",
            AttrKey::PackageType => "PACKAGE_TYPE",
            AttrKey::InputValue => "INPUT_VALUE",
            AttrKey::OutputValue => "OUTPUT_VALUE",
            AttrKey::InputSchemaMerges => "INPUT_SCHEMA_MERGES",
            AttrKey::OutputSchemaMerges => "OUTPUT_SCHEMA_MERGES",
            AttrKey::Metadata => "METADATA",
            AttrKey::TransformMetadata => "TRANSFORM_METADATA",
            AttrKey::IsPreAppStart => "IS_PRE_APP_START",
        };
        write!(f, "{s}")
    }
}

/// Attribute values are stored as strings, as required by spec: "values
/// serialize to strings for transport-level neutrality." Structured
/// payloads (JSON input/output, schema merges, metadata) are carried as
/// their serialized JSON string form and parsed back out by the span
/// transformer.
pub type AttributeBag = BTreeMap<AttrKey, String>;

/// Span kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanKind {
    Server,
    Client,
    Internal,
}

/// Package type — classifies which interceptor produced the span.
///
/// The full enumeration covers every out-of-scope interceptor named in
/// spec.md §1 so drivers built against this crate have a stable type to
/// report through, even though only the HTTP driver ships in this repo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageType {
    Http,
    Pg,
    MySql,
    Redis,
    Grpc,
    GraphQl,
    Jwt,
    Jwks,
    Prisma,
    Firestore,
    NextJs,
    Date,
    Env,
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackageType::Http => "HTTP",
            PackageType::Pg => "PG",
            PackageType::MySql => "MYSQL",
            PackageType::Redis => "REDIS",
            PackageType::Grpc => "GRPC",
            PackageType::GraphQl => "GRAPHQL",
            PackageType::Jwt => "JWT",
            PackageType::Jwks => "JWKS",
            PackageType::Prisma => "PRISMA",
            PackageType::Firestore => "FIRESTORE",
            PackageType::NextJs => "NEXTJS",
            PackageType::Date => "DATE",
            PackageType::Env => "ENV",
        };
        write!(f, "{s}")
    }
}

/// Span completion status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanStatus {
    Ok,
    Error { message: Option<String> },
}

impl SpanStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SpanStatus::Error { .. })
    }
}
