//! Account workflows layered on `AuthService`: email confirmation, password
//! reset, profile and admin user management.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{pagination::Pagination, types::Page};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use models::{user, user_token::{self, TokenPurpose}};

use crate::auth::{
    domain::{AuthSession, AuthUser, LoginInput, RegisterInput},
    repo::seaorm::SeaOrmAuthRepository,
    AuthService,
};
use crate::errors::ServiceError;
use crate::google::GoogleVerifier;
use crate::mail::{self, templates, Mailer};

const CONFIRM_TTL_HOURS: i64 = 24;
const RESET_TTL_HOURS: i64 = 1;

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: user::UserRole,
    pub status: user::UserStatus,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserDto {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            phone: u.phone,
            role: u.role,
            status: u.status,
            email_confirmed: u.email_confirmed,
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    /// Empty string clears the phone number.
    pub phone: Option<String>,
}

fn random_token() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}

pub struct AccountService {
    db: DatabaseConnection,
    auth: Arc<AuthService<SeaOrmAuthRepository>>,
    mailer: Arc<dyn Mailer>,
    public_base_url: String,
}

impl AccountService {
    pub fn new(
        db: DatabaseConnection,
        auth: Arc<AuthService<SeaOrmAuthRepository>>,
        mailer: Arc<dyn Mailer>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self { db, auth, mailer, public_base_url: public_base_url.into().trim_end_matches('/').to_string() }
    }

    pub fn auth(&self) -> &AuthService<SeaOrmAuthRepository> { &self.auth }

    /// Create the account and email a confirmation link.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, ServiceError> {
        let user = self.auth.register(input).await?;
        let token = random_token();
        user_token::create(&self.db, user.id, TokenPurpose::ConfirmEmail, &token, Utc::now() + Duration::hours(CONFIRM_TTL_HOURS)).await?;
        let link = format!("{}/auth/confirm-email?token={}", self.public_base_url, token);
        mail::send_best_effort(self.mailer.as_ref(), templates::confirm_email(&user.email, &user.name, &link)).await;
        Ok(user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, ServiceError> {
        Ok(self.auth.login(input).await?)
    }

    #[instrument(skip(self, token))]
    pub async fn confirm_email(&self, token: &str) -> Result<UserDto, ServiceError> {
        let t = self.usable_token(TokenPurpose::ConfirmEmail, token).await?;
        let found = user::Entity::find_by_id(t.user_id).one(&self.db).await?.ok_or_else(|| ServiceError::not_found("user"))?;
        let mut am: user::ActiveModel = found.into();
        am.email_confirmed = Set(true);
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await?;
        user_token::mark_used(&self.db, t).await?;
        info!(user_id = %updated.id, "email_confirmed");
        Ok(updated.into())
    }

    /// Always succeeds so callers cannot probe which emails are registered.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let Some(u) = user::find_by_email(&self.db, email).await? else { return Ok(()) };
        if !u.can_sign_in() {
            return Ok(());
        }
        let token = random_token();
        user_token::create(&self.db, u.id, TokenPurpose::ResetPassword, &token, Utc::now() + Duration::hours(RESET_TTL_HOURS)).await?;
        let link = format!("{}/auth/reset-password?token={}", self.public_base_url, token);
        mail::send_best_effort(self.mailer.as_ref(), templates::password_reset(&u.email, &u.name, &link)).await;
        info!(user_id = %u.id, "password_reset_requested");
        Ok(())
    }

    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ServiceError> {
        let t = self.usable_token(TokenPurpose::ResetPassword, token).await?;
        self.auth.set_password(t.user_id, new_password).await?;
        user_token::mark_used(&self.db, t).await?;
        Ok(())
    }

    pub async fn change_password(&self, user_id: Uuid, current: &str, new_password: &str) -> Result<(), ServiceError> {
        Ok(self.auth.change_password(user_id, current, new_password).await?)
    }

    async fn usable_token(&self, purpose: TokenPurpose, token: &str) -> Result<user_token::Model, ServiceError> {
        user_token::find_by_token(&self.db, purpose, token.trim())
            .await?
            .filter(|t| t.is_usable(Utc::now()))
            .ok_or_else(|| ServiceError::Validation("invalid or expired token".into()))
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserDto, ServiceError> {
        let u = user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(|| ServiceError::not_found("user"))?;
        Ok(u.into())
    }

    pub async fn update_profile(&self, user_id: Uuid, input: ProfileUpdate) -> Result<UserDto, ServiceError> {
        let found = user::Entity::find_by_id(user_id).one(&self.db).await?.ok_or_else(|| ServiceError::not_found("user"))?;
        let mut am: user::ActiveModel = found.into();
        if let Some(name) = input.name {
            user::validate_name(&name)?;
            am.name = Set(name.trim().to_string());
        }
        if let Some(phone) = input.phone {
            let phone = phone.trim().to_string();
            if phone.is_empty() {
                am.phone = Set(None);
            } else {
                user::validate_phone(&phone)?;
                am.phone = Set(Some(phone));
            }
        }
        am.updated_at = Set(Utc::now().into());
        Ok(am.update(&self.db).await?.into())
    }

    pub async fn list_users(&self, opts: Pagination) -> Result<Page<UserDto>, ServiceError> {
        let (page_idx, per_page) = opts.normalize();
        let paginator = user::Entity::find().order_by_asc(user::Column::CreatedAt).paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page_idx).await?;
        let (page, per_page) = opts.effective();
        Ok(Page { items: items.into_iter().map(UserDto::from).collect(), total, page, per_page })
    }

    #[instrument(skip(self))]
    pub async fn set_user_status(&self, id: Uuid, status: user::UserStatus) -> Result<UserDto, ServiceError> {
        let found = user::Entity::find_by_id(id).one(&self.db).await?.ok_or_else(|| ServiceError::not_found("user"))?;
        let mut am: user::ActiveModel = found.into();
        am.status = Set(status);
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await?;
        info!(user_id = %id, status = ?status, "user_status_changed");
        Ok(updated.into())
    }

    /// Verify a Google ID token and sign the owner in, creating the account if needed.
    pub async fn google_login(&self, verifier: &dyn GoogleVerifier, id_token: &str) -> Result<AuthSession, ServiceError> {
        let identity = verifier.verify(id_token).await?;
        Ok(self.auth.login_external(&identity.email, &identity.name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::service::AuthConfig;
    use crate::google::mock::StaticGoogleVerifier;
    use crate::mail::mock::RecordingMailer;
    use crate::test_support::get_db;

    async fn setup() -> Result<(AccountService, Arc<RecordingMailer>), anyhow::Error> {
        let db = get_db().await?;
        let auth = Arc::new(AuthService::new(Arc::new(SeaOrmAuthRepository::new(db.clone())), AuthConfig::new("0123456789abcdef")));
        let mailer = Arc::new(RecordingMailer::default());
        Ok((AccountService::new(db, auth, mailer.clone(), "http://shop.test/"), mailer))
    }

    fn token_from(html: &str) -> String {
        let start = html.find("token=").map(|i| i + 6).unwrap_or(0);
        html[start..].chars().take_while(|c| c.is_ascii_alphanumeric()).collect()
    }

    fn reg(email: &str) -> RegisterInput {
        RegisterInput { email: email.into(), name: "Ann".into(), password: "password1".into() }
    }

    #[tokio::test]
    async fn register_then_confirm_email() -> Result<(), anyhow::Error> {
        let (svc, mailer) = setup().await?;
        let u = svc.register(reg("ann@x.com")).await?;
        assert!(!u.email_confirmed);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html.contains("http://shop.test/auth/confirm-email?token="));

        let token = token_from(&sent[0].html);
        let confirmed = svc.confirm_email(&token).await?;
        assert!(confirmed.email_confirmed);
        // tokens are single-use
        assert!(matches!(svc.confirm_email(&token).await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn forgot_and_reset_password() -> Result<(), anyhow::Error> {
        let (svc, mailer) = setup().await?;
        svc.register(reg("ann@x.com")).await?;
        svc.forgot_password("nobody@x.com").await?;
        assert_eq!(mailer.sent().len(), 1, "unknown email sends nothing");

        svc.forgot_password("ANN@x.com").await?;
        let sent = mailer.sent();
        let token = token_from(&sent[1].html);
        assert!(matches!(svc.reset_password(&token, "short").await, Err(ServiceError::Validation(_))));
        svc.reset_password(&token, "new-password").await?;
        let session = svc.login(LoginInput { email: "ann@x.com".into(), password: "new-password".into() }).await?;
        assert_eq!(session.user.email, "ann@x.com");
        assert!(svc.reset_password(&token, "another-one").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn profile_and_admin_status() -> Result<(), anyhow::Error> {
        let (svc, _) = setup().await?;
        let u = svc.register(reg("ann@x.com")).await?;
        let p = svc.update_profile(u.id, ProfileUpdate { name: Some(" Anna ".into()), phone: Some("+380501234567".into()) }).await?;
        assert_eq!(p.name, "Anna");
        assert_eq!(p.phone.as_deref(), Some("+380501234567"));
        assert!(svc.update_profile(u.id, ProfileUpdate { name: None, phone: Some("abc".into()) }).await.is_err());

        svc.set_user_status(u.id, user::UserStatus::Disabled).await?;
        let login = svc.login(LoginInput { email: "ann@x.com".into(), password: "password1".into() }).await;
        assert!(matches!(login, Err(ServiceError::Unauthorized(_))));

        let page = svc.list_users(Pagination { page: 1, per_page: 10 }).await?;
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].status, user::UserStatus::Disabled);
        Ok(())
    }

    #[tokio::test]
    async fn google_login_creates_then_reuses_account() -> Result<(), anyhow::Error> {
        let (svc, _) = setup().await?;
        let verifier = StaticGoogleVerifier::with("good", "g@x.com", "Gee");
        let first = svc.google_login(&verifier, "good").await?;
        let second = svc.google_login(&verifier, "good").await?;
        assert_eq!(first.user.id, second.user.id);
        assert!(first.user.email_confirmed);
        assert!(matches!(svc.google_login(&verifier, "bad").await, Err(ServiceError::Unauthorized(_))));
        Ok(())
    }
}
