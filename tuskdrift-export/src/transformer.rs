//! Span Transformer — spec.md §4.3.
//!
//! Pure function: a finished [`RawSpanRecord`] (raw attribute bag +
//! finishing timestamp) becomes a [`CleanSpan`]. Never panics; a parse
//! failure on a required attribute drops the whole span (logged) rather
//! than propagating, matching "Must never throw; on parse failure the
//! span is dropped (logged)".

use tuskdrift_core::{AttrKey, PackageType, RawSpanRecord};
use tuskdrift_schema::{generate_schema_and_hash, CleanSpan, SchemaMerges};

/// Pull a JSON-valued attribute out of the bag and parse it, logging and
/// returning `None` instead of propagating on failure.
fn parse_json_attr(record: &RawSpanRecord, key: AttrKey) -> Option<serde_json::Value> {
    let raw = record.attributes.get(&key)?;
    match serde_json::from_str(raw) {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(
                span_id = %record.span_id,
                attr = %key,
                error = %err,
                "span transformer: failed to parse attribute JSON, dropping field"
            );
            None
        }
    }
}

fn parse_merges_attr(record: &RawSpanRecord, key: AttrKey) -> Option<SchemaMerges> {
    let raw = record.attributes.get(&key)?;
    match serde_json::from_str(raw) {
        Ok(m) => Some(m),
        Err(err) => {
            tracing::warn!(
                span_id = %record.span_id,
                attr = %key,
                error = %err,
                "span transformer: failed to parse schema merges, ignoring"
            );
            None
        }
    }
}

fn string_attr<'a>(record: &'a RawSpanRecord, key: AttrKey) -> Option<&'a str> {
    record.attributes.get(&key).map(String::as_str)
}

/// Parse a required attribute: absent means "never set" (`Null`), but
/// present-and-unparseable means the span itself is untrustworthy and
/// must be dropped rather than degraded.
fn parse_required_json_attr(record: &RawSpanRecord, key: AttrKey) -> Result<serde_json::Value, ()> {
    match record.attributes.get(&key) {
        None => Ok(serde_json::Value::Null),
        Some(raw) => serde_json::from_str(raw).map_err(|err| {
            tracing::warn!(
                span_id = %record.span_id,
                attr = %key,
                error = %err,
                "span transformer: required attribute failed to parse, dropping span"
            );
        }),
    }
}

/// Transform a finished span into its exportable record. Returns `None`
/// when a required field (`INPUT_VALUE`/`OUTPUT_VALUE`) fails to parse —
/// spec.md §4.3 "Must never throw; on parse failure the span is dropped
/// (logged)". Optional attributes (schema merges, metadata) degrade to
/// `None`/ignored instead, since their absence doesn't make the span
/// untrustworthy.
pub fn transform_span(record: RawSpanRecord) -> Option<CleanSpan> {
    let input_merges = parse_merges_attr(&record, AttrKey::InputSchemaMerges);
    let output_merges = parse_merges_attr(&record, AttrKey::OutputSchemaMerges);

    let input_raw = parse_required_json_attr(&record, AttrKey::InputValue).ok()?;
    let output_raw = parse_required_json_attr(&record, AttrKey::OutputValue).ok()?;

    let input = generate_schema_and_hash(input_raw, input_merges.as_ref());
    let output = generate_schema_and_hash(output_raw, output_merges.as_ref());

    let name = string_attr(&record, AttrKey::Name)
        .map(str::to_string)
        .unwrap_or(record.name);
    let package_name = string_attr(&record, AttrKey::PackageName)
        .map(str::to_string)
        .unwrap_or(record.package_name);
    let instrumentation_name = string_attr(&record, AttrKey::InstrumentationName)
        .map(str::to_string)
        .unwrap_or(record.instrumentation_name);
    let submodule_name = string_attr(&record, AttrKey::SubmoduleName)
        .map(str::to_string)
        .or(record.submodule_name);
    let package_type = string_attr(&record, AttrKey::PackageType)
        .and_then(parse_package_type)
        .unwrap_or(record.package_type);

    let metadata = parse_json_attr(&record, AttrKey::Metadata);
    let transform_metadata = parse_json_attr(&record, AttrKey::TransformMetadata);

    Some(CleanSpan {
        trace_id: record.trace_id.to_string(),
        span_id: record.span_id.to_string(),
        parent_span_id: record
            .parent_span_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        name,
        package_name,
        instrumentation_name,
        submodule_name,
        package_type,
        kind: record.kind,
        input_value: input.decoded_value,
        output_value: output.decoded_value,
        input_schema: input.schema,
        output_schema: output.schema,
        input_value_hash: input.decoded_value_hash,
        output_value_hash: output.decoded_value_hash,
        input_schema_hash: input.decoded_schema_hash,
        output_schema_hash: output.decoded_schema_hash,
        status: record.status,
        timestamp: record.timestamp,
        duration: record.duration,
        is_root_span: record.is_root_span,
        is_pre_app_start: record.is_pre_app_start,
        metadata,
        transform_metadata,
        is_used: false,
    })
}

fn parse_package_type(s: &str) -> Option<PackageType> {
    Some(match s {
        "HTTP" => PackageType::Http,
        "PG" => PackageType::Pg,
        "MYSQL" => PackageType::MySql,
        "REDIS" => PackageType::Redis,
        "GRPC" => PackageType::Grpc,
        "GRAPHQL" => PackageType::GraphQl,
        "JWT" => PackageType::Jwt,
        "JWKS" => PackageType::Jwks,
        "PRISMA" => PackageType::Prisma,
        "FIRESTORE" => PackageType::Firestore,
        "NEXTJS" => PackageType::NextJs,
        "DATE" => PackageType::Date,
        "ENV" => PackageType::Env,
        _ => return None,
    })
}
