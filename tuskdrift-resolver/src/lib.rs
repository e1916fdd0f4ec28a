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

//! Mock Resolver — spec.md §4.8.
//!
//! Six-tier priority match of an outbound request fingerprint against a
//! trace's recorded spans, with "unused-first" accounting. Grounded on
//! the priority-ordered lookup shape of the hook registry (fixed tiers
//! scanned in order, first match wins), generalized from priority-by-
//! number to priority-by-match-quality.

use serde_json::Value;
use tuskdrift_schema::{canonicalize, sha256_hex, CleanSpan};

/// The three identifying hashes of an outbound call, used to look up a
/// previously recorded mock (spec.md §4.8).
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub input_value: Value,
    pub input_value_hash: String,
    pub input_schema_hash: String,
}

impl Fingerprint {
    pub fn from_span(span: &CleanSpan) -> Self {
        Self {
            input_value: span.input_value.clone(),
            input_value_hash: span.input_value_hash.clone(),
            input_schema_hash: span.input_schema_hash.clone(),
        }
    }
}

/// Which of the six priority tiers produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    UnusedExact = 1,
    UsedExact = 2,
    UnusedHeaderStripped = 3,
    UsedHeaderStripped = 4,
    UnusedSchema = 5,
    UsedSchema = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub index: usize,
    pub tier: MatchTier,
}

/// Removes the top-level `headers` key (if any) and re-hashes, for
/// header-stripped tiers 3/4 (spec.md §4.8: "treats input as an object
/// and removes the top-level `headers` key only").
fn header_stripped_hash(value: &Value) -> String {
    let stripped = match value {
        Value::Object(map) => {
            let mut map = map.clone();
            map.remove("headers");
            Value::Object(map)
        }
        other => other.clone(),
    };
    let canonical = canonicalize(&stripped);
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    sha256_hex(&bytes)
}

fn sorted_order(candidates: &[CleanSpan]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by_key(|&i| (candidates[i].timestamp.seconds, candidates[i].timestamp.nanos));
    order
}

fn find_first(
    order: &[usize],
    candidates: &[CleanSpan],
    pred: impl Fn(&CleanSpan) -> bool,
) -> Option<usize> {
    order.iter().copied().find(|&i| pred(&candidates[i]))
}

/// Resolves a mock for `fingerprint` against `candidates` (every
/// recorded span for the trace, in arbitrary order on entry). On a
/// match at an "unused" tier, marks that candidate `is_used = true`.
/// Returns `None` if no tier matches.
pub fn resolve_mock(candidates: &mut [CleanSpan], fingerprint: &Fingerprint) -> Option<Resolved> {
    let order = sorted_order(candidates);
    let fingerprint_stripped_hash = header_stripped_hash(&fingerprint.input_value);

    if let Some(idx) = find_first(&order, candidates, |c| {
        !c.is_used && c.input_value_hash == fingerprint.input_value_hash
    }) {
        candidates[idx].is_used = true;
        return Some(Resolved { index: idx, tier: MatchTier::UnusedExact });
    }
    if let Some(idx) = find_first(&order, candidates, |c| {
        c.is_used && c.input_value_hash == fingerprint.input_value_hash
    }) {
        return Some(Resolved { index: idx, tier: MatchTier::UsedExact });
    }
    if let Some(idx) = find_first(&order, candidates, |c| {
        !c.is_used && header_stripped_hash(&c.input_value) == fingerprint_stripped_hash
    }) {
        candidates[idx].is_used = true;
        return Some(Resolved { index: idx, tier: MatchTier::UnusedHeaderStripped });
    }
    if let Some(idx) = find_first(&order, candidates, |c| {
        c.is_used && header_stripped_hash(&c.input_value) == fingerprint_stripped_hash
    }) {
        return Some(Resolved { index: idx, tier: MatchTier::UsedHeaderStripped });
    }
    if let Some(idx) = find_first(&order, candidates, |c| {
        !c.is_used && c.input_schema_hash == fingerprint.input_schema_hash
    }) {
        candidates[idx].is_used = true;
        return Some(Resolved { index: idx, tier: MatchTier::UnusedSchema });
    }
    if let Some(idx) = find_first(&order, candidates, |c| {
        c.is_used && c.input_schema_hash == fingerprint.input_schema_hash
    }) {
        return Some(Resolved { index: idx, tier: MatchTier::UsedSchema });
    }

    tracing::debug!("mock resolver: no tier matched, returning no mock");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuskdrift_core::{PackageType, SpanKind, SpanStatus, TimestampPair};
    use tuskdrift_schema::JsonSchema;

    fn span_at(seconds: i64, input_value_hash: &str, input_schema_hash: &str, is_used: bool) -> CleanSpan {
        CleanSpan {
            trace_id: "t".into(),
            span_id: format!("s{seconds}"),
            parent_span_id: String::new(),
            name: "n".into(),
            package_name: "pg".into(),
            instrumentation_name: "pg-driver".into(),
            submodule_name: None,
            package_type: PackageType::Pg,
            kind: SpanKind::Client,
            input_value: serde_json::json!({"text": "SELECT 1", "headers": {"x-req-id": "abc"}}),
            output_value: serde_json::Value::Null,
            input_schema: JsonSchema::Null,
            output_schema: JsonSchema::Null,
            input_value_hash: input_value_hash.into(),
            output_value_hash: "h".into(),
            input_schema_hash: input_schema_hash.into(),
            output_schema_hash: "h".into(),
            status: SpanStatus::Ok,
            timestamp: TimestampPair { seconds, nanos: 0 },
            duration: TimestampPair { seconds: 0, nanos: 0 },
            is_root_span: false,
            is_pre_app_start: false,
            metadata: None,
            transform_metadata: None,
            is_used,
        }
    }

    #[test]
    fn tier1_exact_unused_match_marks_used() {
        let mut candidates = vec![span_at(1, "H1", "S1", false)];
        let fingerprint = Fingerprint {
            input_value: candidates[0].input_value.clone(),
            input_value_hash: "H1".into(),
            input_schema_hash: "S1".into(),
        };
        let result = resolve_mock(&mut candidates, &fingerprint).unwrap();
        assert_eq!(result.tier, MatchTier::UnusedExact);
        assert!(candidates[0].is_used);
    }

    #[test]
    fn falls_back_to_used_exact_when_no_unused_candidate() {
        let mut candidates = vec![span_at(1, "H1", "S1", true)];
        let fingerprint = Fingerprint {
            input_value: candidates[0].input_value.clone(),
            input_value_hash: "H1".into(),
            input_schema_hash: "S1".into(),
        };
        let result = resolve_mock(&mut candidates, &fingerprint).unwrap();
        assert_eq!(result.tier, MatchTier::UsedExact);
        assert!(candidates[0].is_used, "used tier must not un-mark the candidate");
    }

    #[test]
    fn header_drift_falls_through_to_header_stripped_tier() {
        let mut candidates = vec![span_at(1, "RECORDED_HASH", "S1", false)];
        let fingerprint = Fingerprint {
            input_value: serde_json::json!({"text": "SELECT 1", "headers": {"x-req-id": "different"}}),
            input_value_hash: "DIFFERENT_HASH".into(),
            input_schema_hash: "S1".into(),
        };
        let result = resolve_mock(&mut candidates, &fingerprint).unwrap();
        assert_eq!(result.tier, MatchTier::UnusedHeaderStripped);
    }

    #[test]
    fn unused_first_respects_recording_timestamp_order() {
        let mut candidates = vec![
            span_at(2, "H1", "S1", false),
            span_at(1, "H1", "S1", false),
        ];
        let fingerprint = Fingerprint {
            input_value: candidates[0].input_value.clone(),
            input_value_hash: "H1".into(),
            input_schema_hash: "S1".into(),
        };
        let result = resolve_mock(&mut candidates, &fingerprint).unwrap();
        assert_eq!(result.index, 1, "earlier-recorded (index 1, ts=1) must win over index 0 (ts=2)");
    }

    #[test]
    fn no_match_returns_none() {
        let mut candidates = vec![span_at(1, "H1", "S1", false)];
        let fingerprint = Fingerprint {
            input_value: serde_json::json!({"text": "totally different"}),
            input_value_hash: "H2".into(),
            input_schema_hash: "S2".into(),
        };
        assert!(resolve_mock(&mut candidates, &fingerprint).is_none());
    }
}
