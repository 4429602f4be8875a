//! Request signing for the upload provider.
//!
//! The string to sign is every non-empty parameter, sorted by key, serialized
//! as `key=value` pairs joined by `&`, with the API secret appended directly.
//! Array values are joined with `,`. The signature is the lowercase hex digest
//! of that string: SHA-1 by default, SHA-256 for accounts configured for it.

use std::collections::BTreeMap;

use pulsevest_core::SignatureAlgorithm;
use serde_json::Value;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Signs `params` with `api_secret` using the provider's default SHA-1 digest.
///
/// `null`, empty strings, and empty arrays are skipped, so a client can send
/// its whole parameter object without pre-filtering.
#[must_use]
pub fn sign_params(params: &BTreeMap<String, Value>, api_secret: &str) -> String {
    sign_params_with(params, api_secret, SignatureAlgorithm::Sha1)
}

/// Like [`sign_params`], with an explicit digest.
#[must_use]
pub fn sign_params_with(
    params: &BTreeMap<String, Value>,
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let payload = format!("{}{api_secret}", string_to_sign(params));
    match algorithm {
        SignatureAlgorithm::Sha1 => format!("{:x}", Sha1::digest(payload.as_bytes())),
        SignatureAlgorithm::Sha256 => format!("{:x}", Sha256::digest(payload.as_bytes())),
    }
}

pub(crate) fn string_to_sign(params: &BTreeMap<String, Value>) -> String {
    params
        .iter()
        .filter_map(|(key, value)| {
            let rendered = render_value(value)?;
            if rendered.is_empty() {
                None
            } else {
                Some(format!("{key}={rendered}"))
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(render_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}
