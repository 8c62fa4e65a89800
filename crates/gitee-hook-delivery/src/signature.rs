use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a webhook token against the raw body using constant-time comparison.
///
/// The token is the hex-encoded HMAC-SHA256 of the body keyed with the shared
/// secret, optionally prefixed with `sha256=`. An empty secret never verifies.
pub fn verify(secret: &[u8], body: &[u8], token: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    let hex_sig = token.trim();
    let hex_sig = hex_sig.strip_prefix("sha256=").unwrap_or(hex_sig);

    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Computes the token a sender would attach for `body`, as `sha256=<hex>`.
#[cfg(test)]
pub(crate) fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
