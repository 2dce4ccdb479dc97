use async_trait::async_trait;
use models::user::UserRole;
use uuid::Uuid;

use super::domain::{AuthUser, Credentials};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, email: &str, name: &str, role: UserRole, email_confirmed: bool) -> Result<AuthUser, AuthError>;
    /// Password sign-up: the user row and its credentials are written together
    /// or not at all.
    async fn create_user_with_password(
        &self,
        email: &str,
        name: &str,
        role: UserRole,
        password_hash: String,
        password_algorithm: String,
    ) -> Result<AuthUser, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, AuthUser>>, // key: lower-cased email
        creds: Mutex<HashMap<Uuid, Credentials>>, // key: user_id
    }

    fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, AuthError> {
        m.lock().map_err(|e| AuthError::Repository(e.to_string()))
    }

    impl MockAuthRepository {
        /// Flip the `active` flag of a stored user, as an admin status change would.
        pub fn set_active(&self, email: &str, active: bool) {
            if let Ok(mut users) = self.users.lock() {
                if let Some(u) = users.get_mut(&email.to_lowercase()) { u.active = active; }
            }
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(lock(&self.users)?.get(&email.trim().to_lowercase()).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            Ok(lock(&self.users)?.values().find(|u| u.id == id).cloned())
        }

        async fn create_user(&self, email: &str, name: &str, role: UserRole, email_confirmed: bool) -> Result<AuthUser, AuthError> {
            let email = models::user::validate_email(email).map_err(|e| AuthError::Validation(e.to_string()))?;
            let mut users = lock(&self.users)?;
            if users.contains_key(&email) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser { id: Uuid::new_v4(), email: email.clone(), name: name.to_string(), role, email_confirmed, active: true };
            users.insert(email, user.clone());
            Ok(user)
        }

        async fn create_user_with_password(
            &self,
            email: &str,
            name: &str,
            role: UserRole,
            password_hash: String,
            password_algorithm: String,
        ) -> Result<AuthUser, AuthError> {
            let user = self.create_user(email, name, role, false).await?;
            lock(&self.creds)?.insert(user.id, Credentials { user_id: user.id, password_hash, password_algorithm });
            Ok(user)
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            Ok(lock(&self.creds)?.get(&user_id).cloned())
        }

        async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let c = Credentials { user_id, password_hash, password_algorithm };
            lock(&self.creds)?.insert(user_id, c.clone());
            Ok(c)
        }
    }
}
