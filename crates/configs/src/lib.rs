use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub nova_poshta: NovaPoshtaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Base URL the storefront front end is reachable at; used in emailed links.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            worker_threads: Some(4),
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_public_base_url() -> String { "http://localhost:3000".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Accounts registered with one of these emails receive the `admin` role.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: String::new(), token_ttl_hours: default_token_ttl_hours(), admin_emails: Vec::new() }
    }
}

fn default_token_ttl_hours() -> i64 { 12 }

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub success_url: String,
    #[serde(default)]
    pub cancel_url: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            api_base: default_stripe_api_base(),
            currency: default_currency(),
            success_url: String::new(),
            cancel_url: String::new(),
        }
    }
}

fn default_stripe_api_base() -> String { "https://api.stripe.com".into() }
fn default_currency() -> String { "usd".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// `log` writes messages to the tracing output, `http` posts them to `endpoint`.
    #[serde(default = "default_mail_provider")]
    pub provider: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_mail_from")]
    pub from: String,
    #[serde(default = "default_support_inbox")]
    pub support_inbox: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: default_mail_provider(),
            endpoint: String::new(),
            api_key: String::new(),
            from: default_mail_from(),
            support_inbox: default_support_inbox(),
        }
    }
}

fn default_mail_provider() -> String { "log".into() }
fn default_mail_from() -> String { "no-reply@storefront.local".into() }
fn default_support_inbox() -> String { "support@storefront.local".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_tokeninfo_url")]
    pub tokeninfo_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self { Self { client_id: String::new(), tokeninfo_url: default_tokeninfo_url() } }
}

fn default_tokeninfo_url() -> String { "https://oauth2.googleapis.com/tokeninfo".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct NovaPoshtaConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_nova_poshta_url")]
    pub api_url: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for NovaPoshtaConfig {
    fn default() -> Self {
        Self { api_key: String::new(), api_url: default_nova_poshta_url(), cache_ttl_secs: default_cache_ttl() }
    }
}

fn default_nova_poshta_url() -> String { "https://api.novaposhta.ua/v2.0/json/".into() }
fn default_cache_ttl() -> u64 { 3600 }

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            max_image_bytes: default_max_image_bytes(),
            public_prefix: default_public_prefix(),
        }
    }
}

fn default_images_dir() -> String { "data/images".into() }
fn default_max_image_bytes() -> usize { 5 * 1024 * 1024 }
fn default_public_prefix() -> String { "/static/images".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

fn env_or(target: &mut String, key: &str) {
    if target.trim().is_empty() {
        if let Ok(v) = std::env::var(key) {
            *target = v;
        }
    }
}

impl AppConfig {
    /// Load `config.toml` when present, otherwise start from defaults;
    /// environment variables fill whatever the file left empty.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(_) => AppConfig::default(),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.auth.normalize_from_env();
        self.auth.validate()?;
        env_or(&mut self.stripe.secret_key, "STRIPE_SECRET_KEY");
        env_or(&mut self.mail.api_key, "MAIL_API_KEY");
        env_or(&mut self.mail.endpoint, "MAIL_ENDPOINT");
        env_or(&mut self.google.client_id, "GOOGLE_CLIENT_ID");
        env_or(&mut self.nova_poshta.api_key, "NOVA_POSHTA_API_KEY");
        if self.stripe.success_url.trim().is_empty() {
            self.stripe.success_url = format!("{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}", self.server.public_base_url);
        }
        if self.stripe.cancel_url.trim().is_empty() {
            self.stripe.cancel_url = format!("{}/checkout/cancel", self.server.public_base_url);
        }
        if self.mail.provider != "log" && self.mail.provider != "http" {
            return Err(anyhow!("mail.provider must be `log` or `http`"));
        }
        if self.mail.provider == "http" && self.mail.endpoint.trim().is_empty() {
            return Err(anyhow!("mail.endpoint is required when mail.provider = \"http\""));
        }
        if self.storage.max_image_bytes == 0 {
            return Err(anyhow!("storage.max_image_bytes must be > 0"));
        }
        while self.storage.public_prefix.len() > 1 && self.storage.public_prefix.ends_with('/') {
            self.storage.public_prefix.pop();
        }
        if !self.storage.public_prefix.starts_with('/') || self.storage.public_prefix == "/" || self.storage.public_prefix == "/images" {
            return Err(anyhow!("storage.public_prefix must be an absolute path other than `/` and `/images`"));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        while self.public_base_url.ends_with('/') {
            self.public_base_url.pop();
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        env_or(&mut self.url, "DATABASE_URL");
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || lower.starts_with("sqlite:")) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        env_or(&mut self.jwt_secret, "JWT_SECRET");
        if self.admin_emails.is_empty() {
            if let Ok(list) = std::env::var("ADMIN_EMAILS") {
                self.admin_emails = list.split(',').map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()).collect();
            }
        }
        for e in self.admin_emails.iter_mut() {
            *e = e.trim().to_lowercase();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < 16 {
            return Err(anyhow!("auth.jwt_secret must be at least 16 characters (JWT_SECRET)"));
        }
        if self.token_ttl_hours <= 0 {
            return Err(anyhow!("auth.token_ttl_hours must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml_with_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [database]
            url = "sqlite::memory:"

            [auth]
            jwt_secret = "0123456789abcdef0123"
            admin_emails = ["Boss@Example.com"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.auth.token_ttl_hours, 12);
        assert_eq!(cfg.stripe.api_base, "https://api.stripe.com");
        assert_eq!(cfg.storage.max_image_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn normalize_fills_checkout_urls_and_lowercases_admins() {
        let mut cfg = AppConfig::default();
        cfg.database.url = "sqlite::memory:".into();
        cfg.auth.jwt_secret = "0123456789abcdef0123".into();
        cfg.auth.admin_emails = vec![" Boss@Example.com ".into()];
        cfg.server.public_base_url = "https://shop.example.com/".into();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.auth.admin_emails, vec!["boss@example.com".to_string()]);
        assert!(cfg.stripe.success_url.starts_with("https://shop.example.com/checkout/success"));
        assert_eq!(cfg.stripe.cancel_url, "https://shop.example.com/checkout/cancel");
    }

    #[test]
    fn rejects_non_sql_database_url() {
        let db = DatabaseConfig { url: "mysql://x".into(), ..DatabaseConfig::default() };
        assert!(db.validate().is_err());
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let auth = AuthConfig { jwt_secret: "short".into(), ..AuthConfig::default() };
        assert!(auth.validate().is_err());
    }

    #[test]
    fn image_prefix_must_not_shadow_image_routes() {
        let mut cfg = AppConfig::default();
        cfg.database.url = "sqlite::memory:".into();
        cfg.auth.jwt_secret = "0123456789abcdef0123".into();
        cfg.storage.public_prefix = "/images/".into();
        assert!(cfg.normalize_and_validate().is_err());
        cfg.storage.public_prefix = "/media/".into();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.storage.public_prefix, "/media");
    }
}
