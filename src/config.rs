use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL. Without one the service keeps listings in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub log_level: String,
    // Uploaded images
    pub media_root: String,
    pub media_url: String,
    pub max_upload_mb: usize,
    pub page_size: usize,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let jwt_secret = std::env::var("JWT_SECRET_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SECRET_KEY"))?;

        let jwt_maxage = parse_var("JWT_MAXAGE", 60)?;
        let port = parse_var("PORT", 8000)?;
        let max_upload_mb = parse_var("MAX_UPLOAD_MB", 5)?;
        let page_size = parse_var("PAGE_SIZE", 10)?;

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string());
        let media_root = std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string());
        let media_url = std::env::var("MEDIA_URL").unwrap_or_else(|_| "/media".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let media_url = media_url.trim_end_matches('/').to_string();
        if !media_url.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: "MEDIA_URL",
                value: media_url,
            });
        }

        if page_size == 0 || page_size > 50 {
            return Err(ConfigError::Invalid {
                name: "PAGE_SIZE",
                value: page_size.to_string(),
            });
        }

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_maxage,
            port,
            log_level,
            media_root,
            media_url,
            max_upload_mb,
            page_size,
            allowed_origins,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config(media_root: &std::path::Path) -> Config {
    Config {
        database_url: None,
        jwt_secret: "test-secret".to_string(),
        jwt_maxage: 60,
        port: 8000,
        log_level: "debug".to_string(),
        media_root: media_root.to_string_lossy().into_owned(),
        media_url: "/media".to_string(),
        max_upload_mb: 1,
        page_size: 10,
        allowed_origins: vec!["http://localhost:3000".to_string()],
    }
}
