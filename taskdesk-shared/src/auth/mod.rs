/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id salted hashing, verification, strength policy
/// - [`authorization`]: role and ownership checks
/// - [`session`]: the persisted "current user" slot
/// - [`service`]: login/logout state machine, registration, password changes
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations, 16-byte salt
/// - **Constant-time Comparison**: hash verification never short-circuits
/// - **Strength Policy**: minimum length 6, weak passwords rejected
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::password::{classify_strength, PasswordStrength};
///
/// assert_eq!(classify_strength("Abcd123!"), PasswordStrength::Strong);
/// ```

pub mod authorization;
pub mod password;
pub mod service;
pub mod session;
