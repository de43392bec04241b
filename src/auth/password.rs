//! Password hashing and constant-time verification.
//!
//! Hashes are scrypt-derived (N=16384, r=8, p=1, dkLen=64) over a random
//! 16-byte salt and stored as `"<saltHex>:<keyHex>"`. A malformed stored hash
//! is a verification failure, never an error.

use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};
use scrypt::Params;
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 64;
// log2(16384) = 14
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// Returns an error if the system RNG or the scrypt primitive fails; callers
/// treat this as fatal for the current request, never retried.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .context("failed to generate password salt")?;

    let key = derive_key(password.as_bytes(), &salt)?;
    Ok(format!("{}:{}", hex::encode(salt), hex::encode(key)))
}

/// Verify a password against a stored `"<saltHex>:<keyHex>"` value.
///
/// Both halves are decoded and a key is derived regardless of which half is
/// malformed, so the failure modes stay indistinguishable by timing; only the
/// final comparison depends on the derived bytes.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, key_hex)) = stored.split_once(':') else {
        return false;
    };
    if salt_hex.is_empty() || key_hex.is_empty() {
        return false;
    }

    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(key_hex) else {
        return false;
    };

    let Ok(derived) = derive_key(password.as_bytes(), &salt) else {
        return false;
    };

    constant_time_equal(&derived, &expected)
}

fn derive_key(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .context("invalid scrypt parameters")?;

    let mut output = [0u8; KEY_LEN];
    scrypt::scrypt(password, salt, &params, &mut output).context("scrypt derivation failed")?;
    Ok(output)
}

/// Constant-time byte equality.
///
/// `ct_eq` requires equal-length inputs, so a length mismatch short-circuits
/// to `false` before the comparison.
fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips() -> Result<()> {
        let hash = hash_password("correct horse battery staple")?;
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
        Ok(())
    }

    #[test]
    fn hash_format_is_salt_colon_key() -> Result<()> {
        let hash = hash_password("secret")?;
        let (salt_hex, key_hex) = hash.split_once(':').context("missing separator")?;
        assert_eq!(salt_hex.len(), SALT_LEN * 2);
        assert_eq!(key_hex.len(), KEY_LEN * 2);
        Ok(())
    }

    #[test]
    fn salts_differ_between_calls() -> Result<()> {
        let first = hash_password("same password")?;
        let second = hash_password("same password")?;
        assert_ne!(first, second);
        assert!(verify_password("same password", &first));
        assert!(verify_password("same password", &second));
        Ok(())
    }

    #[test]
    fn malformed_hashes_fail_closed() {
        assert!(!verify_password("secret", "no-separator"));
        assert!(!verify_password("secret", ":"));
        assert!(!verify_password("secret", "deadbeef:"));
        assert!(!verify_password("secret", ":deadbeef"));
        assert!(!verify_password("secret", "not-hex:also-not-hex"));
    }

    #[test]
    fn corrupted_salt_or_key_fails() -> Result<()> {
        let hash = hash_password("secret")?;
        let (salt_hex, key_hex) = hash.split_once(':').context("missing separator")?;

        // Swap the halves.
        assert!(!verify_password("secret", &format!("{key_hex}:{salt_hex}")));

        // Flip one salt nibble.
        let mut corrupted_salt = salt_hex.to_string();
        let flipped = if corrupted_salt.starts_with('0') {
            "1"
        } else {
            "0"
        };
        corrupted_salt.replace_range(0..1, flipped);
        assert!(!verify_password("secret", &format!("{corrupted_salt}:{key_hex}")));
        Ok(())
    }

    #[test]
    fn truncated_key_short_circuits() -> Result<()> {
        let hash = hash_password("secret")?;
        let (salt_hex, key_hex) = hash.split_once(':').context("missing separator")?;
        let truncated = &key_hex[..key_hex.len() - 2];
        assert!(!verify_password("secret", &format!("{salt_hex}:{truncated}")));
        Ok(())
    }
}
