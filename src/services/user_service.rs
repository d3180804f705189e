use crate::auth::{self, AuthError, TokenPair, TokenService, TokenType};
use crate::config::AdminConfig;
use crate::dto::RegisterRequest;
use crate::error::{option_to_result, AppError, AppResult, RepositoryError};
use crate::models::{User, UserMinimal};
use crate::permissions::Requester;
use crate::repositories::{NewUser, UserRepository};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Letters, digits and `@.+-_`, at most 150 characters
pub fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::Validation("username: This field may not be blank.".into()));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "username: Ensure this field has no more than {} characters.",
            USERNAME_MAX_LEN
        )));
    }
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        return Err(AppError::Validation(
            "username: Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AppError::Validation(format!(
            "password: This password is too short. It must contain at least {} characters.",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}

/// Registration, login and token lifecycle
pub struct UserService {
    user_repo: Arc<UserRepository>,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(user_repo: Arc<UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { user_repo, tokens }
    }

    /// Register a new account
    pub async fn register(&self, request: &RegisterRequest) -> AppResult<UserMinimal> {
        let username = request.username.trim();
        validate_username(username)?;
        validate_password(&request.password)?;

        let password_hash = auth::hash_password_blocking(request.password.clone()).await?;
        let user = self
            .user_repo
            .create(NewUser {
                username,
                email: request.email.trim(),
                first_name: request.first_name.trim(),
                last_name: request.last_name.trim(),
                password_hash: &password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate(_) => {
                    AppError::Conflict("A user with that username already exists.".into())
                }
                other => other.into(),
            })?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user.into())
    }

    /// Everyone for staff/admin, otherwise just the caller
    pub async fn list(&self, requester: Requester) -> AppResult<Vec<UserMinimal>> {
        if requester.privileged {
            return Ok(self.user_repo.list_minimal().await?);
        }
        Ok(vec![self.me(requester.id).await?])
    }

    pub async fn me(&self, user_id: Uuid) -> AppResult<UserMinimal> {
        let user = option_to_result(self.user_repo.find_by_id(user_id).await?, "User not found")?;
        Ok(user.into())
    }

    /// Exchange credentials for an access/refresh pair
    pub async fn obtain_pair(&self, username: &str, password: &str) -> AppResult<TokenPair> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::InvalidCredentials)?;
        if !auth::verify_password_blocking(password.to_string(), user.password_hash.clone()).await {
            return Err(AuthError::InvalidCredentials.into());
        }

        info!("Issued tokens for {}", user.username);
        Ok(self.tokens.issue_pair(user.id)?)
    }

    /// Mint a new access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = self.tokens.decode_as(refresh_token, TokenType::Refresh)?;
        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::InactiveUser)?;

        Ok(self.tokens.issue_access(claims.sub)?)
    }

    /// Any unexpired token signed by us is valid
    pub fn verify(&self, token: &str) -> AppResult<()> {
        self.tokens.decode(token)?;
        Ok(())
    }

    /// Create or promote the configured administrator
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> AppResult<User> {
        validate_username(&admin.username)?;

        let user = match self.user_repo.find_by_username(&admin.username).await? {
            Some(user) => user,
            None => {
                validate_password(&admin.password)?;
                let password_hash = auth::hash_password_blocking(admin.password.clone()).await?;
                self.user_repo
                    .create(NewUser {
                        username: &admin.username,
                        email: &admin.email,
                        first_name: "",
                        last_name: "",
                        password_hash: &password_hash,
                    })
                    .await?
            }
        };

        if !user.is_active {
            self.user_repo.set_active(user.id, true).await?;
        }
        let user = self.user_repo.set_privileges(user.id, true, true).await?;
        info!("Administrator {} ready", user.username);
        Ok(user)
    }
}
