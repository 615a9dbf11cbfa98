/// User model and input types
///
/// Users own credentials (an Argon2id hash plus its salt) and a role. The
/// role drives every visibility and mutation check in the core, so it is a
/// closed enum: adding a variant breaks every exhaustive `match` on purpose.
///
/// # Example
///
/// ```
/// use taskdesk_shared::models::user::{Credential, Role, User};
///
/// let credential = Credential::new("00".repeat(16), "11".repeat(32));
/// let user = User::new("jdoe", "jdoe@example.com", credential, "John", "Doe", Role::Member);
///
/// assert_eq!(user.full_name(), "John Doe");
/// assert!(user.is_active);
/// assert!(!user.role.can_manage_users());
/// ```

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Minimum length of a first or last name
pub const MIN_NAME_LENGTH: usize = 3;

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        UserId(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sees every task, manages the roster
    Admin,

    /// Sees tasks they created or were assigned
    Member,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Parses a role name (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "member" | "user" => Some(Role::Member),
            _ => None,
        }
    }

    /// Can create, delete, activate users and change roles
    pub fn can_manage_users(&self) -> bool {
        match self {
            Role::Admin => true,
            Role::Member => false,
        }
    }

    /// Can view all tasks (not just own)
    pub fn can_view_all_tasks(&self) -> bool {
        match self {
            Role::Admin => true,
            Role::Member => false,
        }
    }

    /// Can assign tasks to users other than themselves
    pub fn can_assign_to_others(&self) -> bool {
        match self {
            Role::Admin => true,
            Role::Member => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Salt and password hash, always stored and replaced together
///
/// Both values are lowercase hex. Never construct one from a plaintext
/// password directly; use `PasswordCodec::new_credential`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Hex-encoded random salt
    pub salt: String,

    /// Hex-encoded Argon2id output
    pub password_hash: String,
}

impl Credential {
    /// Pairs a salt with the hash derived from it
    pub fn new(salt: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Credential {
            salt: salt.into(),
            password_hash: password_hash.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("salt", &"<redacted>")
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID
    pub id: UserId,

    /// Login name, unique across all users
    pub username: String,

    /// Email address, unique across all users
    pub email: String,

    /// Salted password hash
    pub credential: Credential,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Role deciding visibility and mutation rights
    pub role: Role,

    /// Deactivated accounts cannot log in
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a new active user with a fresh id and timestamps
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        credential: Credential,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        User {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            credential,
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// First and last name separated by a space
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive substring match over the searchable fields
    ///
    /// `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        [
            self.full_name(),
            self.email.clone(),
            self.username.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Input for creating a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewUser {
    /// Login name
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "invalid email address"))]
    pub email: String,

    /// Given name
    #[validate(custom(function = "validate_person_name"))]
    pub first_name: String,

    /// Family name
    #[validate(custom(function = "validate_person_name"))]
    pub last_name: String,

    /// Role to assign (defaults to Member)
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Member
}

impl NewUser {
    /// Trims surrounding whitespace from every text field
    pub fn normalized(self) -> Self {
        NewUser {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role,
        }
    }
}

/// Input for updating profile fields
///
/// All fields are optional. Only non-None fields will be updated. Role and
/// activation status are changed through dedicated, admin-only operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUser {
    /// New login name
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: Option<String>,

    /// New email address
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,

    /// New given name
    #[validate(custom(function = "validate_person_name"))]
    pub first_name: Option<String>,

    /// New family name
    #[validate(custom(function = "validate_person_name"))]
    pub last_name: Option<String>,
}

impl UpdateUser {
    /// Trims surrounding whitespace from every present field
    pub fn normalized(self) -> Self {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
        UpdateUser {
            username: trim(self.username),
            email: trim(self.email),
            first_name: trim(self.first_name),
            last_name: trim(self.last_name),
        }
    }

    /// Applies the present fields to `user` and bumps `updated_at`
    pub fn apply_to(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        user.updated_at = Utc::now();
    }

    /// True when nothing would change
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
    }
}

/// Names are letters and spaces only, at least `MIN_NAME_LENGTH` characters
fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    let letters_only = trimmed
        .chars()
        .all(|c| c.is_alphabetic() || c.is_whitespace());

    if trimmed.chars().count() < MIN_NAME_LENGTH || !letters_only {
        let mut err = ValidationError::new("person_name");
        err.message = Some(Cow::from(
            "names must contain only letters and be at least 3 characters",
        ));
        return Err(err);
    }

    Ok(())
}
