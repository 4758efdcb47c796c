/// Server configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development. Token secrets and redirect targets live in
/// [`warden_auth::config::AuthConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Externally reachable origin of this API, used for the email
    /// verification link.
    pub public_base_url: String,
    /// Page that collects a new password; receives `?token=`.
    pub password_reset_page_url: String,
    pub database_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                |
    /// |------------------------|----------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                              |
    /// | `PORT`                 | `3000`                                 |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`                |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                   |
    /// | `PUBLIC_BASE_URL`      | `http://localhost:3000`                |
    /// | `PASSWORD_RESET_URL`   | `http://localhost:5173/reset-password` |
    /// | `DATABASE_URL`         | required                               |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let password_reset_page_url = std::env::var("PASSWORD_RESET_URL")
            .unwrap_or_else(|_| "http://localhost:5173/reset-password".into());

        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            public_base_url,
            password_reset_page_url,
            database_url,
        }
    }

    /// Link that redeems a CONFIRM_EMAIL token against this API.
    pub fn verify_email_link(&self, token: &str) -> String {
        format!("{}/api/v1/auth/email/verify?token={token}", self.public_base_url)
    }

    pub fn password_reset_link(&self, token: &str) -> String {
        format!("{}?token={token}", self.password_reset_page_url)
    }
}
