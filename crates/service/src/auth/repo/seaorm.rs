use models::{errors::ModelError, user::UserRole};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, TransactionTrait};
use uuid::Uuid;

use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn repo_err(e: ModelError) -> AuthError {
    match e {
        ModelError::Validation(m) => AuthError::Validation(m),
        ModelError::Conflict(_) => AuthError::Conflict,
        ModelError::Db(m) => AuthError::Repository(m),
    }
}

fn db_err(e: DbErr) -> AuthError { AuthError::Repository(e.to_string()) }

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::find_by_email(&self.db, email).await.map_err(repo_err)?;
        Ok(res.map(AuthUser::from))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.map(AuthUser::from))
    }

    async fn create_user(&self, email: &str, name: &str, role: UserRole, email_confirmed: bool) -> Result<AuthUser, AuthError> {
        let created = models::user::create(&self.db, email, name, role, email_confirmed)
            .await
            .map_err(repo_err)?;
        Ok(AuthUser::from(created))
    }

    async fn create_user_with_password(
        &self,
        email: &str,
        name: &str,
        role: UserRole,
        password_hash: String,
        password_algorithm: String,
    ) -> Result<AuthUser, AuthError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let created = models::user::create(&txn, email, name, role, false).await.map_err(repo_err)?;
        models::user_credentials::store(&txn, created.id, &password_hash, &password_algorithm)
            .await
            .map_err(repo_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(AuthUser::from(created))
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = models::user_credentials::for_user(&self.db, user_id).await.map_err(repo_err)?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = models::user_credentials::store(&self.db, user_id, &password_hash, &password_algorithm)
            .await
            .map_err(repo_err)?;
        Ok(Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn sign_up_writes_user_and_password_atomically() -> Result<(), anyhow::Error> {
        let repo = SeaOrmAuthRepository::new(get_db().await?);
        let user = repo
            .create_user_with_password("pair@x.com", "Pair", UserRole::Customer, "hash".into(), "argon2".into())
            .await?;
        assert!(repo.get_credentials(user.id).await?.is_some());

        // the unique email index answers a racing duplicate with Conflict
        let dup = repo
            .create_user_with_password("PAIR@x.com", "Again", UserRole::Customer, "hash".into(), "argon2".into())
            .await;
        assert!(matches!(dup, Err(AuthError::Conflict)), "{dup:?}");

        // a failed credentials write leaves no half-created account behind
        let broken = repo
            .create_user_with_password("lonely@x.com", "Lonely", UserRole::Customer, " ".into(), "argon2".into())
            .await;
        assert!(matches!(broken, Err(AuthError::Validation(_))));
        assert!(repo.find_user_by_email("lonely@x.com").await?.is_none());
        Ok(())
    }
}
