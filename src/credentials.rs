//! At-rest obfuscation of per-source app credentials.
//!
//! App ids and secrets are stored base64-encoded in the config file so they
//! are not readable at a glance. This is an encoding, not encryption: anyone
//! with the file can recover them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn obfuscate(plain: &str) -> String {
    if plain.is_empty() {
        return String::new();
    }
    STANDARD.encode(plain.as_bytes())
}

/// Reverse [`obfuscate`]. Values that are not valid base64 UTF-8 come back
/// unchanged so hand-written plaintext credentials keep working.
pub fn reveal(stored: &str) -> String {
    if stored.is_empty() {
        return String::new();
    }
    match STANDARD
        .decode(stored.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    {
        Some(plain) => plain,
        None => {
            tracing::warn!("stored credential is not base64; using it verbatim");
            stored.to_string()
        }
    }
}
