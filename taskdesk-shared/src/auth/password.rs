/// Password hashing module using Argon2id
///
/// Credentials are stored as a separate (salt, hash) pair rather than a PHC
/// string, so the codec works on raw Argon2id output:
///
/// - **Salt**: 16 random bytes from the OS RNG, hex-encoded
/// - **Algorithm**: Argon2id, version 0x13
/// - **Memory**: 64 MB (65536 KB) by default
/// - **Iterations**: 3 passes by default
/// - **Parallelism**: 4 lanes by default
/// - **Output**: 32-byte hash, hex-encoded
///
/// Hashing is deterministic for a given (password, salt, parameters) triple,
/// so verification recomputes the hash and compares it in constant time.
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::password::{PasswordCodec, PasswordConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = PasswordCodec::new(&PasswordConfig::default())?;
///
/// let salt = codec.generate_salt();
/// let hash = codec.hash_password("super_secret_password_123", &salt)?;
///
/// assert!(codec.verify_password("super_secret_password_123", &salt, &hash)?);
/// assert!(!codec.verify_password("wrong_password", &salt, &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{Algorithm, Argon2, ParamsBuilder, Version};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::models::user::Credential;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Hash output length in bytes
pub const HASH_LEN: usize = 32;

/// Passwords shorter than this are rejected before strength is considered
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Error type for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Malformed input, e.g. an empty password
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Password is shorter than the minimum length
    #[error("Password must be at least {min} characters long")]
    TooShort { min: usize },

    /// Password lacks character-class diversity
    #[error("Password is too weak: mix upper and lower case letters, digits and symbols")]
    TooWeak,

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Stored salt or hash is not valid hex
    #[error("Invalid credential encoding: {0}")]
    InvalidEncoding(String),
}

/// Password strength classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    /// Converts strength to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordStrength::Weak => "weak",
            PasswordStrength::Medium => "medium",
            PasswordStrength::Strong => "strong",
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Number of lanes
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        PasswordConfig {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Salted Argon2id hasher
///
/// Cheap to clone; holds only the configured parameters.
#[derive(Clone)]
pub struct PasswordCodec {
    argon2: Argon2<'static>,
}

impl PasswordCodec {
    /// Builds a codec with the given cost parameters
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if Argon2 rejects the parameters
    /// (e.g. memory below 8 KiB per lane).
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(config.memory_kib)
            .t_cost(config.iterations)
            .p_cost(config.parallelism)
            .output_len(HASH_LEN)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        Ok(PasswordCodec {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Generates a fresh random salt, hex-encoded
    pub fn generate_salt(&self) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        hex::encode(salt)
    }

    /// Derives the hex-encoded hash of `password` under `salt`
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the password is empty
    /// - `InvalidEncoding` if the salt is not hex
    /// - `HashError` if Argon2 fails
    pub fn hash_password(&self, password: &str, salt: &str) -> Result<String, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }

        let salt = hex::decode(salt)
            .map_err(|e| PasswordError::InvalidEncoding(format!("salt: {}", e)))?;

        let mut output = [0u8; HASH_LEN];
        self.argon2
            .hash_password_into(password.as_bytes(), &salt, &mut output)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(hex::encode(output))
    }

    /// Recomputes the hash and compares it against `expected_hash`
    ///
    /// Comparison runs over the decoded bytes in constant time.
    pub fn verify_password(
        &self,
        password: &str,
        salt: &str,
        expected_hash: &str,
    ) -> Result<bool, PasswordError> {
        let expected = hex::decode(expected_hash)
            .map_err(|e| PasswordError::InvalidEncoding(format!("hash: {}", e)))?;
        let computed = hex::decode(self.hash_password(password, salt)?)
            .map_err(|e| PasswordError::InvalidEncoding(format!("hash: {}", e)))?;

        Ok(constant_time_eq(&computed, &expected))
    }

    /// Validates `password` against the policy and derives a new credential
    pub fn new_credential(&self, password: &str) -> Result<Credential, PasswordError> {
        validate_new_password(password)?;
        let salt = self.generate_salt();
        let hash = self.hash_password(password, &salt)?;
        Ok(Credential::new(salt, hash))
    }

    /// Verifies `password` against a stored credential
    pub fn verify_credential(
        &self,
        password: &str,
        credential: &Credential,
    ) -> Result<bool, PasswordError> {
        self.verify_password(password, &credential.salt, &credential.password_hash)
    }
}

impl std::fmt::Debug for PasswordCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordCodec").finish_non_exhaustive()
    }
}

/// Classifies password strength from length and character-class diversity
///
/// Character classes are lowercase, uppercase, digit and symbol.
///
/// - fewer than 6 characters, or a single class: `Weak`
/// - 8+ characters with at least 3 classes: `Strong`
/// - anything else: `Medium`
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::password::{classify_strength, PasswordStrength};
///
/// assert_eq!(classify_strength("abc"), PasswordStrength::Weak);
/// assert_eq!(classify_strength("user123"), PasswordStrength::Medium);
/// assert_eq!(classify_strength("Abcd123!"), PasswordStrength::Strong);
/// ```
pub fn classify_strength(password: &str) -> PasswordStrength {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return PasswordStrength::Weak;
    }

    let classes = [
        password.chars().any(|c| c.is_lowercase()),
        password.chars().any(|c| c.is_uppercase()),
        password.chars().any(|c| c.is_numeric()),
        password.chars().any(|c| !c.is_alphanumeric()),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    if classes <= 1 {
        PasswordStrength::Weak
    } else if length >= 8 && classes >= 3 {
        PasswordStrength::Strong
    } else {
        PasswordStrength::Medium
    }
}

/// Applies the registration / password-change policy
///
/// Too short and too weak are reported as distinct errors.
pub fn validate_new_password(password: &str) -> Result<(), PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::InvalidInput(
            "password must not be empty".to_string(),
        ));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }

    match classify_strength(password) {
        PasswordStrength::Weak => Err(PasswordError::TooWeak),
        PasswordStrength::Medium | PasswordStrength::Strong => Ok(()),
    }
}

/// Constant-time byte comparison
///
/// Always walks the full length and accumulates differences with bitwise OR,
/// so the running time does not depend on where the inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> PasswordCodec {
        PasswordCodec::new(&PasswordConfig {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        })
        .expect("light parameters are valid")
    }

    #[test]
    fn test_generate_salt_is_random_hex() {
        let codec = codec();
        let salt1 = codec.generate_salt();
        let salt2 = codec.generate_salt();

        assert_eq!(salt1.len(), SALT_LEN * 2);
        assert!(hex::decode(&salt1).is_ok());
        assert_ne!(salt1, salt2);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let codec = codec();
        let salt = codec.generate_salt();

        let hash1 = codec.hash_password("correct_password", &salt).unwrap();
        let hash2 = codec.hash_password("correct_password", &salt).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), HASH_LEN * 2);
    }

    #[test]
    fn test_different_salts_produce_different_hashes() {
        let codec = codec();
        let hash1 = codec
            .hash_password("same_password", &codec.generate_salt())
            .unwrap();
        let hash2 = codec
            .hash_password("same_password", &codec.generate_salt())
            .unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_verify_roundtrip() {
        let codec = codec();
        let passwords = vec![
            "simple",
            "with spaces",
            "with-special-chars!@#$%",
            "unicode-密码-パスワード",
        ];

        for password in passwords {
            let salt = codec.generate_salt();
            let hash = codec.hash_password(password, &salt).unwrap();
            assert!(
                codec.verify_password(password, &salt, &hash).unwrap(),
                "Password '{}' should verify",
                password
            );
        }
    }

    #[test]
    fn test_verify_password_incorrect() {
        let codec = codec();
        let salt = codec.generate_salt();
        let hash = codec.hash_password("correct_password", &salt).unwrap();

        assert!(!codec.verify_password("wrong_password", &salt, &hash).unwrap());
    }

    #[test]
    fn test_empty_password_is_invalid_input() {
        let codec = codec();
        let salt = codec.generate_salt();

        assert!(matches!(
            codec.hash_password("", &salt),
            Err(PasswordError::InvalidInput(_))
        ));
        assert!(matches!(
            codec.verify_password("", &salt, &"00".repeat(HASH_LEN)),
            Err(PasswordError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let codec = codec();
        let salt = codec.generate_salt();
        let result = codec.verify_password("password", &salt, "not-hex");
        assert!(matches!(result, Err(PasswordError::InvalidEncoding(_))));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let result = PasswordCodec::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 1,
            parallelism: 4,
        });
        assert!(matches!(result, Err(PasswordError::HashError(_))));
    }

    #[test]
    fn test_classify_strength() {
        assert_eq!(classify_strength(""), PasswordStrength::Weak);
        assert_eq!(classify_strength("abc"), PasswordStrength::Weak);
        assert_eq!(classify_strength("abcdefgh"), PasswordStrength::Weak);
        assert_eq!(classify_strength("abc123"), PasswordStrength::Medium);
        assert_eq!(classify_strength("Abc12!"), PasswordStrength::Medium);
        assert_eq!(classify_strength("Abcd123!"), PasswordStrength::Strong);
        assert_eq!(classify_strength("Password1"), PasswordStrength::Strong);
    }

    #[test]
    fn test_validate_new_password() {
        assert!(matches!(
            validate_new_password(""),
            Err(PasswordError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_new_password("Ab1!"),
            Err(PasswordError::TooShort { min: 6 })
        ));
        assert!(matches!(
            validate_new_password("abcdefgh"),
            Err(PasswordError::TooWeak)
        ));
        assert!(validate_new_password("user123").is_ok());
    }

    #[test]
    fn test_new_credential_verifies() {
        let codec = codec();
        let credential = codec.new_credential("Str0ng!Pass").unwrap();

        assert!(codec.verify_credential("Str0ng!Pass", &credential).unwrap());
        assert!(!codec.verify_credential("Str0ng!Pas", &credential).unwrap());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hello!"));
        assert!(constant_time_eq(b"", b""));
    }
}
