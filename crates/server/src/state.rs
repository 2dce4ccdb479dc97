use std::sync::Arc;

use sea_orm::DatabaseConnection;
use service::{
    account_service::AccountService,
    auth::{repo::seaorm::SeaOrmAuthRepository, service::AuthConfig, AuthService},
    checkout::{CheckoutSettings, PaymentGateway, StripeClient},
    google::{GoogleTokenInfoClient, GoogleVerifier},
    image_service::ImageStore,
    mail::{self, Mailer},
    shipping::{self, ShippingDirectory},
};

use crate::errors::StartupError;

/// External systems the handlers talk to.
#[derive(Clone)]
pub struct Integrations {
    pub mailer: Arc<dyn Mailer>,
    pub payments: Arc<dyn PaymentGateway>,
    pub google: Arc<dyn GoogleVerifier>,
    pub shipping: Arc<dyn ShippingDirectory>,
}

impl Integrations {
    /// Production clients built from configuration.
    pub fn from_config(cfg: &configs::AppConfig) -> Result<Self, StartupError> {
        Ok(Self {
            mailer: mail::from_config(&cfg.mail)?,
            payments: Arc::new(StripeClient::new(&cfg.stripe)?),
            google: Arc::new(GoogleTokenInfoClient::new(&cfg.google)?),
            shipping: shipping::from_config(&cfg.nova_poshta)?,
        })
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub accounts: Arc<AccountService>,
    pub mailer: Arc<dyn Mailer>,
    pub payments: Arc<dyn PaymentGateway>,
    pub google: Arc<dyn GoogleVerifier>,
    pub shipping: Arc<dyn ShippingDirectory>,
    pub checkout: CheckoutSettings,
    pub images: ImageStore,
    pub support_inbox: String,
    /// Mark the auth cookie `Secure` when served over https.
    pub secure_cookies: bool,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, cfg: &configs::AppConfig, integrations: Integrations) -> Self {
        let auth = Arc::new(AuthService::new(Arc::new(SeaOrmAuthRepository::new(db.clone())), AuthConfig::from_app(&cfg.auth)));
        let accounts = Arc::new(AccountService::new(
            db.clone(),
            auth.clone(),
            integrations.mailer.clone(),
            cfg.server.public_base_url.clone(),
        ));
        Self {
            db,
            auth,
            accounts,
            mailer: integrations.mailer,
            payments: integrations.payments,
            google: integrations.google,
            shipping: integrations.shipping,
            checkout: CheckoutSettings::from_config(&cfg.stripe),
            images: ImageStore::from_config(&cfg.storage),
            support_inbox: cfg.mail.support_inbox.clone(),
            secure_cookies: cfg.server.public_base_url.starts_with("https://"),
        }
    }
}
