use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use models::user::UserRole;
use rand::rngs::OsRng;
use tracing::{info, debug, instrument};
use uuid::Uuid;

use super::domain::{RegisterInput, LoginInput, AuthUser, AuthSession, CurrentUser};
use super::errors::AuthError;
use super::jwt;
use super::repository::AuthRepository;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Auth service configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub password_algorithm: String,
    pub token_ttl_hours: i64,
    /// Accounts registered with one of these emails get the admin role.
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self { jwt_secret: jwt_secret.into(), password_algorithm: "argon2".into(), token_ttl_hours: 12, admin_emails: Vec::new() }
    }

    pub fn from_app(cfg: &configs::AuthConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            password_algorithm: "argon2".into(),
            token_ttl_hours: cfg.token_ttl_hours,
            admin_emails: cfg.admin_emails.iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }

    fn role_for(&self, email: &str) -> UserRole {
        let email = email.trim().to_lowercase();
        if self.admin_emails.iter().any(|a| *a == email) { UserRole::Admin } else { UserRole::Customer }
    }
}

fn check_password_policy(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!("password too short (>={})", MIN_PASSWORD_LEN)));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string())
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    pub fn config(&self) -> &AuthConfig { &self.cfg }

    /// Register a new user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::new("0123456789abcdef"));
    /// let input = RegisterInput { email: "User@Example.com".into(), name: "Test".into(), password: "Secret123".into() };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// assert!(!user.email_confirmed);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        check_password_policy(&input.password)?;
        models::user::validate_name(&input.name).map_err(|e| AuthError::Validation(e.to_string()))?;
        if let Some(existing) = self.repo.find_user_by_email(&input.email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let role = self.cfg.role_for(&input.email);
        let hash = hash_password(&input.password)?;
        // a racing sign-up for the same email still ends in Conflict via the unique index
        let user = self.repo
            .create_user_with_password(&input.email, &input.name, role, hash, self.cfg.password_algorithm.clone())
            .await?;
        info!(user_id = %user.id, email = %user.email, role = role.as_str(), "user_registered");
        Ok(user)
    }

    /// Authenticate a user and issue a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig::new("0123456789abcdef"));
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.repo
            .find_user_by_email(&input.email)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        if !user.active {
            debug!(user_id = %user.id, "inactive account");
            return Err(AuthError::Unauthorized);
        }
        self.verify_password(user.id, &input.password).await?;
        let token = self.issue_token(&user)?;
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, token })
    }

    /// Sign in with an identity verified by an external provider, creating the
    /// account on first use. Such accounts have no password.
    #[instrument(skip(self))]
    pub async fn login_external(&self, email: &str, name: &str) -> Result<AuthSession, AuthError> {
        let user = match self.repo.find_user_by_email(email).await? {
            Some(u) => u,
            None => {
                let display = if name.trim().is_empty() { email.split('@').next().unwrap_or(email) } else { name };
                let u = self.repo.create_user(email, display, self.cfg.role_for(email), true).await?;
                info!(user_id = %u.id, "user_registered_external");
                u
            }
        };
        if !user.active {
            return Err(AuthError::Unauthorized);
        }
        let token = self.issue_token(&user)?;
        Ok(AuthSession { user, token })
    }

    #[instrument(skip(self, current, new_password))]
    pub async fn change_password(&self, user_id: Uuid, current: &str, new_password: &str) -> Result<(), AuthError> {
        self.verify_password(user_id, current).await?;
        self.set_password(user_id, new_password).await
    }

    /// Replace the password without checking the old one (reset flow).
    pub async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<(), AuthError> {
        check_password_policy(new_password)?;
        let hash = hash_password(new_password)?;
        self.repo.upsert_password(user_id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user_id, "password_changed");
        Ok(())
    }

    async fn verify_password(&self, user_id: Uuid, password: &str) -> Result<(), AuthError> {
        let cred = self.repo
            .get_credentials(user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }
        Ok(())
    }

    pub fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        jwt::issue_token(&self.cfg.jwt_secret, user, self.cfg.token_ttl_hours)
    }

    /// Decode a bearer token and re-check the account behind it, so tokens of
    /// disabled or deleted users stop working before they expire. Role and
    /// email come from the stored account, not the token.
    pub async fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = jwt::decode_token(&self.cfg.jwt_secret, token).map_err(|_| AuthError::Unauthorized)?;
        let user = self.repo.find_user_by_id(claims.uid).await?.ok_or(AuthError::Unauthorized)?;
        if !user.active {
            debug!(user_id = %user.id, "token of inactive account");
            return Err(AuthError::Unauthorized);
        }
        Ok(CurrentUser { id: user.id, email: user.email, role: user.role })
    }
}
