use crate::{Configuration, RepositoryRule};

// For signature verification
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Verifies an `X-Hub-Signature` header (`sha1=<hex>`) against the raw body.
///
/// Malformed headers are treated as a mismatch. The digest comparison is
/// constant-time.
pub fn verify_github_signature(provided_signature: &str, secret: &str, body: &[u8]) -> bool {
    let Some(git_signature) = decode_signature("sha1=", provided_signature) else {
        return false;
    };

    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&git_signature).is_ok()
}

/// Same as [`verify_github_signature`] for `X-Hub-Signature-256` (`sha256=<hex>`).
pub fn verify_github_signature_256(provided_signature: &str, secret: &str, body: &[u8]) -> bool {
    let Some(git_signature) = decode_signature("sha256=", provided_signature) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&git_signature).is_ok()
}

fn decode_signature(prefix: &str, provided_signature: &str) -> Option<Vec<u8>> {
    let hex_signature = provided_signature.strip_prefix(prefix)?;
    hex_decode(hex_signature).ok()
}

/// Finds the first repository rule whose name equals `full_name` exactly.
/// Later rules with the same name are never consulted.
pub fn find_matching_repository<'a>(
    config: &'a Configuration,
    full_name: &str,
) -> Option<&'a RepositoryRule> {
    config
        .repositories
        .iter()
        .find(|rule| rule.repository == full_name)
}
