//! Applying a single compiled action to a string value — spec.md §4.9
//! "Actions on a match (non-drop)".

use crate::rule::CompiledAction;
use sha2::{Digest, Sha256};

/// `redact` takes the first 12 hex characters of the value's SHA-256
/// digest, per spec.md §4.9 ("first 12 hex chars + `...`").
const REDACT_HEX_CHARS: usize = 12;

pub(crate) fn apply_to_string(action: &CompiledAction, value: &str) -> String {
    match action {
        CompiledAction::Redact { hash_prefix } => {
            let mut hasher = Sha256::new();
            hasher.update(value.as_bytes());
            let digest = hex::encode(hasher.finalize());
            format!("{hash_prefix}{}...", &digest[..REDACT_HEX_CHARS])
        }
        CompiledAction::Mask { mask_char } => mask_char.to_string().repeat(value.chars().count()),
        CompiledAction::Replace { replace_with } => replace_with.clone(),
        CompiledAction::Drop => String::new(),
    }
}
