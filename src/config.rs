use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub token: TokenConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let token = TokenConfig {
            secret: std::env::var("ACCESS_TOKEN_SECRET")?,
            ttl_secs: std::env::var("ACCESS_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(86_400),
        };
        Ok(Self {
            database_url,
            token,
        })
    }
}
