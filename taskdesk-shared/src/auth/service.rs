/// Authentication service
///
/// Owns the observable authentication state (`Anonymous` or
/// `Authenticated(user)`) and every transition between the two. Query engines
/// subscribe to that state and re-scope their output as soon as it changes.
///
/// # Login
///
/// The identifier is trimmed, then looked up as a username and, failing that,
/// as an email address. Both lookups are exact and case-sensitive. Checks run
/// in a fixed order (existence, then active flag, then password) and each
/// failure has a fixed message:
///
/// | Failure              | Message               |
/// |----------------------|-----------------------|
/// | no such user         | `user not found`      |
/// | account deactivated  | `account deactivated` |
/// | wrong password       | `invalid password`    |
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdesk_shared::auth::password::{PasswordCodec, PasswordConfig};
/// use taskdesk_shared::auth::service::{AuthResult, AuthService};
/// use taskdesk_shared::auth::session::MemorySessionStore;
/// use taskdesk_shared::store::memory::MemoryUserStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = AuthService::new(
///     Arc::new(MemoryUserStore::new()),
///     Arc::new(MemorySessionStore::new()),
///     PasswordCodec::new(&PasswordConfig::default())?,
/// );
///
/// match auth.login("admin", "admin123").await {
///     AuthResult::Success(user) => println!("welcome {}", user.full_name()),
///     AuthResult::Error(reason) => println!("login failed: {}", reason),
/// }
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use validator::Validate;

use super::authorization::{require_admin, require_self_or_admin, AuthzError};
use super::password::{PasswordCodec, PasswordError};
use super::session::SessionStore;
use crate::error::{CoreError, CoreResult};
use crate::models::user::{NewUser, Role, User, UserId};
use crate::store::{StoreError, UserStore};

/// Observable authentication state
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Anonymous,
    Authenticated(User),
}

impl AuthState {
    /// The authenticated user, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// Reason a login attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    UserNotFound,
    AccountDeactivated,
    InvalidPassword,

    /// A collaborator failed; the attempt did not reach a verdict
    Unavailable(String),
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::UserNotFound => f.write_str("user not found"),
            AuthFailure::AccountDeactivated => f.write_str("account deactivated"),
            AuthFailure::InvalidPassword => f.write_str("invalid password"),
            AuthFailure::Unavailable(reason) => write!(f, "authentication failed: {}", reason),
        }
    }
}

/// Outcome of a login attempt; login never returns `Err`
#[derive(Debug, Clone, PartialEq)]
pub enum AuthResult {
    Success(User),
    Error(AuthFailure),
}

impl AuthResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthResult::Success(_))
    }
}

/// Login, logout, registration and password changes
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    codec: PasswordCodec,
    state: watch::Sender<AuthState>,
    session_ends: watch::Sender<u64>,
}

impl AuthService {
    /// Builds the service in the `Anonymous` state
    ///
    /// Call [`AuthService::current_user`] once at startup to pick up a
    /// persisted session.
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        codec: PasswordCodec,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::Anonymous);
        let (session_ends, _) = watch::channel(0);
        AuthService {
            users,
            sessions,
            codec,
            state,
            session_ends,
        }
    }

    /// Subscribes to state changes; the receiver sees the current state first
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Counts transitions from an authenticated user to `Anonymous`
    ///
    /// `watch` only keeps the latest state, so a logout followed by a login
    /// can reach a slow observer as a single change. The counter is bumped
    /// before the new state becomes visible, which lets observers tell that a
    /// session ended in between.
    pub fn session_ends(&self) -> watch::Receiver<u64> {
        self.session_ends.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// The authenticated user, or `Authorization` if nobody is logged in
    pub fn actor(&self) -> CoreResult<User> {
        match self.state.borrow().user() {
            Some(user) => Ok(user.clone()),
            None => Err(AuthzError::Unauthenticated.into()),
        }
    }

    fn publish(&self, next: AuthState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            if state.is_authenticated() && !next.is_authenticated() {
                self.session_ends.send_modify(|count| *count += 1);
            }
            *state = next;
            true
        });
    }

    /// Resolves the persisted session to a live user
    ///
    /// A session pointing at a missing or deactivated user is cleared and the
    /// state falls back to `Anonymous`. A session pointing at a user whose
    /// record changed republishes the fresh record.
    pub async fn current_user(&self) -> CoreResult<Option<User>> {
        let Some(user_id) = self.sessions.get().await? else {
            self.publish(AuthState::Anonymous);
            return Ok(None);
        };

        match self.users.by_id(user_id).await? {
            Some(user) if user.is_active => {
                self.publish(AuthState::Authenticated(user.clone()));
                Ok(Some(user))
            }
            Some(_) => {
                tracing::info!(user_id = %user_id, "Session user is deactivated, clearing session");
                self.publish(AuthState::Anonymous);
                self.sessions.clear().await?;
                Ok(None)
            }
            None => {
                tracing::info!(
                    user_id = %user_id,
                    "Session user no longer exists, clearing session"
                );
                self.publish(AuthState::Anonymous);
                self.sessions.clear().await?;
                Ok(None)
            }
        }
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        if identifier.is_empty() {
            return Ok(None);
        }
        match self.users.by_username(identifier).await? {
            Some(user) => Ok(Some(user)),
            None => self.users.by_email(identifier).await,
        }
    }

    /// Authenticates by username or email
    pub async fn login(&self, identifier: &str, password: &str) -> AuthResult {
        let identifier = identifier.trim();

        let user = match self.find_by_identifier(identifier).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::info!(identifier = %identifier, "Login failed: unknown user");
                return AuthResult::Error(AuthFailure::UserNotFound);
            }
            Err(e) => {
                tracing::error!(error = %e, "Login failed: user lookup error");
                return AuthResult::Error(AuthFailure::Unavailable(e.to_string()));
            }
        };

        if !user.is_active {
            tracing::info!(user_id = %user.id, "Login failed: account deactivated");
            return AuthResult::Error(AuthFailure::AccountDeactivated);
        }

        match self.codec.verify_credential(password, &user.credential) {
            Ok(true) => {}
            Ok(false) | Err(PasswordError::InvalidInput(_)) => {
                tracing::info!(user_id = %user.id, "Login failed: invalid password");
                return AuthResult::Error(AuthFailure::InvalidPassword);
            }
            Err(e) => {
                tracing::error!(
                    user_id = %user.id,
                    error = %e,
                    "Login failed: credential check error"
                );
                return AuthResult::Error(AuthFailure::Unavailable(e.to_string()));
            }
        }

        if let Err(e) = self.sessions.set(user.id).await {
            tracing::error!(
                user_id = %user.id,
                error = %e,
                "Login failed: could not persist session"
            );
            return AuthResult::Error(AuthFailure::Unavailable(e.to_string()));
        }

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        self.publish(AuthState::Authenticated(user.clone()));
        AuthResult::Success(user)
    }

    /// Clears the session; a no-op when already anonymous
    ///
    /// The persisted slot is cleared first. If that fails the state stays
    /// authenticated, so memory and disk never disagree about who is logged in.
    pub async fn logout(&self) -> CoreResult<()> {
        let user_id = self.state.borrow().user().map(|user| user.id);

        self.sessions.clear().await?;
        self.publish(AuthState::Anonymous);

        if let Some(user_id) = user_id {
            tracing::info!(user_id = %user_id, "User logged out");
        }
        Ok(())
    }

    /// Creates a user account without logging it in
    ///
    /// Creating an administrator requires an administrator to be logged in.
    ///
    /// # Errors
    ///
    /// - `Validation`: malformed fields, short or weak password
    /// - `Conflict`: username or email already taken
    /// - `Authorization`: non-admin attempting to create an admin
    pub async fn register(&self, fields: NewUser, password: &str) -> CoreResult<UserId> {
        let fields = fields.normalized();
        fields.validate()?;

        match fields.role {
            Role::Admin => require_admin(&self.actor()?)?,
            Role::Member => {}
        }

        if self.users.by_username(&fields.username).await?.is_some() {
            return Err(CoreError::Conflict(format!(
                "username '{}' is already taken",
                fields.username
            )));
        }
        if self.users.by_email(&fields.email).await?.is_some() {
            return Err(CoreError::Conflict(format!(
                "email '{}' is already taken",
                fields.email
            )));
        }

        let credential = self.codec.new_credential(password)?;
        let user = User::new(
            fields.username,
            fields.email,
            credential,
            fields.first_name,
            fields.last_name,
            fields.role,
        );
        let id = self.users.insert(user).await?;

        tracing::info!(user_id = %id, role = %fields.role, "User registered");
        Ok(id)
    }

    /// Replaces a user's credential
    ///
    /// With `require_current` the caller must be the user (or an admin) and
    /// `current_password` must verify. Without it, the caller must be an
    /// administrator.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
        require_current: bool,
    ) -> CoreResult<()> {
        let actor = self.actor()?;
        if require_current {
            require_self_or_admin(&actor, user_id)?;
        } else {
            require_admin(&actor)?;
        }

        let mut user = self
            .users
            .by_id(user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("user not found".to_string()))?;

        if require_current {
            match self.codec.verify_credential(current_password, &user.credential) {
                Ok(true) => {}
                Ok(false) | Err(PasswordError::InvalidInput(_)) => {
                    return Err(CoreError::Validation(
                        "current password is incorrect".to_string(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }

        user.credential = self.codec.new_credential(new_password)?;
        user.updated_at = Utc::now();
        self.users.update(user).await?;

        tracing::info!(
            user_id = %user_id,
            actor_id = %actor.id,
            self_service = require_current,
            "Password changed"
        );

        if actor.id == user_id {
            self.current_user().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Credential;

    #[test]
    fn test_failure_messages_are_fixed() {
        assert_eq!(AuthFailure::UserNotFound.to_string(), "user not found");
        assert_eq!(
            AuthFailure::AccountDeactivated.to_string(),
            "account deactivated"
        );
        assert_eq!(AuthFailure::InvalidPassword.to_string(), "invalid password");
    }

    #[test]
    fn test_auth_state_user() {
        assert!(AuthState::Anonymous.user().is_none());

        let user = User::new(
            "jdoe",
            "jdoe@example.com",
            Credential::new("00", "11"),
            "John",
            "Doe",
            Role::Member,
        );
        let state = AuthState::Authenticated(user.clone());
        assert!(state.is_authenticated());
        assert_eq!(state.user(), Some(&user));
    }
}
