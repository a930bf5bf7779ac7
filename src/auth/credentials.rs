use crate::auth::clock::Clock;
use crate::auth::password::CredentialHasher;
use crate::auth::session::SessionTokenManager;
use crate::db::UserStore;
use crate::types::{AppError, Result, Role, TokenPair, UserRecord};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashed once per service so unknown-username logins pay for a real verify.
const DUMMY_PASSWORD: &str = "authgate-dummy-password";

/// Login and account management on top of a [`UserStore`].
pub struct CredentialService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<SessionTokenManager>,
    clock: Arc<dyn Clock>,
    dummy_hash: String,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<SessionTokenManager>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            store,
            hasher,
            tokens,
            clock,
            dummy_hash,
        })
    }

    /// Checks a username/password pair.
    ///
    /// An unknown username and a wrong password fail with the same
    /// [`AppError::UsernameOrPasswordMismatch`] and take the same time: an
    /// unknown username is still verified against a dummy hash.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserRecord> {
        let Some(user) = self.store.get_user_by_username(username).await? else {
            let _ = self.hasher.verify(password, &self.dummy_hash);
            debug!("login rejected: unknown username");
            return Err(AppError::UsernameOrPasswordMismatch);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            debug!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AppError::UsernameOrPasswordMismatch);
        }

        info!(user_id = %user.id, "login succeeded");
        Ok(user)
    }

    /// Creates a user. The ID and both timestamps are assigned here.
    pub async fn signup(&self, username: &str, password: &str, roles: &[String]) -> Result<UserRecord> {
        let mut errors = Vec::new();
        validate_username(username, &mut errors);
        validate_password(password, &mut errors);
        let roles = parse_roles(roles, &mut errors);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        self.ensure_username_free(username, None).await?;

        let now = self.clock.now();
        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: self.hasher.hash(password)?,
            roles,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&user).await?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<UserRecord> {
        self.store
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".to_string()))
    }

    /// Changes username and/or password. At least one must be supplied; the
    /// password is re-hashed only when a new one is given.
    pub async fn update(
        &self,
        id: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<UserRecord> {
        if username.is_none() && password.is_none() {
            return Err(AppError::MissingDataInRequest);
        }

        let mut user = self.get_user(id).await?;

        let mut errors = Vec::new();
        if let Some(username) = username {
            user.username = username.to_string();
        }
        validate_username(&user.username, &mut errors);
        if let Some(password) = password {
            validate_password(password, &mut errors);
        }
        if user.roles.is_empty() {
            errors.push("roles: at least one role is required".to_string());
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        if username.is_some() {
            self.ensure_username_free(&user.username, Some(&user.id))
                .await?;
        }
        if let Some(password) = password {
            user.password_hash = self.hasher.hash(password)?;
        }
        user.updated_at = self.clock.now();

        if !self.store.update_user(&user).await? {
            return Err(AppError::NotFound("user".to_string()));
        }

        info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let user = self.get_user(id).await?;

        if !self.store.delete_user(&user.id).await? {
            return Err(AppError::NotFound("user".to_string()));
        }

        info!(user_id = %user.id, "user deleted");
        Ok(())
    }

    /// Mints a token pair bound to the user's immutable ID.
    pub fn issue_tokens(&self, user: &UserRecord) -> Result<TokenPair> {
        Ok(self.tokens.issue_pair(&user.id)?)
    }

    /// Rotates a refresh token, returning the subject it was bound to.
    pub fn refresh_tokens(&self, refresh_token: &str) -> Result<(String, TokenPair)> {
        Ok(self.tokens.refresh_pair(refresh_token)?)
    }

    async fn ensure_username_free(&self, username: &str, owner: Option<&str>) -> Result<()> {
        match self.store.get_user_by_username(username).await? {
            Some(existing) if Some(existing.id.as_str()) != owner => Err(AppError::Validation(
                vec!["username: already taken".to_string()],
            )),
            _ => Ok(()),
        }
    }
}

fn validate_username(username: &str, errors: &mut Vec<String>) {
    if username.chars().count() < MIN_USERNAME_LEN {
        errors.push(format!(
            "username: must be at least {} characters",
            MIN_USERNAME_LEN
        ));
    }
}

fn validate_password(password: &str, errors: &mut Vec<String>) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "password: must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
}

fn parse_roles(roles: &[String], errors: &mut Vec<String>) -> BTreeSet<Role> {
    if roles.is_empty() {
        errors.push("roles: at least one role is required".to_string());
    }

    let mut parsed = BTreeSet::new();
    for role in roles {
        match role.parse::<Role>() {
            Ok(role) => {
                parsed.insert(role);
            }
            Err(msg) => errors.push(msg),
        }
    }
    parsed
}
