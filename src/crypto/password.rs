use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2_sha256";

#[cfg(not(test))]
pub const PBKDF2_ITERATIONS: u32 = 210_000;
// Tests hash many passwords; the format is identical, only the cost differs.
#[cfg(test)]
pub const PBKDF2_ITERATIONS: u32 = 1_000;

pub const SALT_LENGTH: usize = 16;
pub const HASH_LENGTH: usize = 32;

/// Hash a password as `pbkdf2_sha256$<iterations>$<salt>$<hash>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    encode(password, &salt, PBKDF2_ITERATIONS)
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(expected)) else {
        return false;
    };
    if iterations == 0 || expected.len() != HASH_LENGTH {
        return false;
    }

    let mut derived = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut derived);
    derived[..].ct_eq(&expected[..]).into()
}

fn encode(password: &str, salt: &[u8], iterations: u32) -> String {
    let mut derived = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut derived);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(derived)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let hash = hash_password("Gizli-Parola-1");
        assert!(hash.starts_with("pbkdf2_sha256$"));
        assert!(verify_password("Gizli-Parola-1", &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password("Gizli-Parola-1");
        assert!(!verify_password("gizli-parola-1", &hash));
    }

    #[test]
    fn same_password_gets_different_salts() {
        assert_ne!(hash_password("abc"), hash_password("abc"));
    }

    #[test]
    fn iteration_count_is_read_from_the_hash() {
        let stored = encode("parola", b"0123456789abcdef", 7);
        assert!(verify_password("parola", &stored));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plaintext"));
        assert!(!verify_password("x", "pbkdf2_sha256$abc$c2FsdA$aGFzaA"));
        assert!(!verify_password("x", "bcrypt$10$c2FsdA$aGFzaA"));
        assert!(!verify_password("x", "pbkdf2_sha256$1$c2FsdA$aGFzaA"));
    }
}
