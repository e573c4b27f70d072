//! Runtime settings from environment variables.

use crate::auth::JwtConfig;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;

/// Site-wide SEO fallbacks returned when no record matches a path.
#[derive(Clone, Debug)]
pub struct SeoDefaults {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub image: Option<String>,
}

impl Default for SeoDefaults {
    fn default() -> Self {
        SeoDefaults {
            title: "Storefront".into(),
            description: "Discover products from our partner stores.".into(),
            keywords: "store, products, shop".into(),
            image: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_dimension: u32,
    pub quality: u8,
    pub max_file_bytes: usize,
    /// Whole request body, all files of a multipart request included.
    pub max_body_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        UploadSettings {
            dir: PathBuf::from("uploads"),
            max_dimension: 800,
            quality: 80,
            max_file_bytes: 5 * 1024 * 1024,
            max_body_bytes: 50 * 1024 * 1024,
        }
    }
}

/// How outgoing mail leaves the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MailTransport {
    /// Recipient and subject are logged; nothing is delivered.
    Log,
    /// Amazon SES. `region` overrides the default AWS region.
    Ses { region: Option<String> },
}

impl FromStr for MailTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(MailTransport::Log),
            "ses" => Ok(MailTransport::Ses { region: None }),
            other => Err(format!("unknown transport {} (expected log or ses)", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MailSettings {
    pub transport: MailTransport,
    pub from: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings {
            transport: MailTransport::Log,
            from: "no-reply@localhost".into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub upload: UploadSettings,
    pub google_client_id: Option<String>,
    pub frontend_url: String,
    pub reset_token_ttl_minutes: i64,
    pub seo: SeoDefaults,
    pub admin_seed: Option<AdminSeed>,
    pub mail: MailSettings,
}

fn var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET",
                reason: "must be at least 32 characters".into(),
            });
        }
        let quality: u8 = parsed("IMAGE_QUALITY", 80)?;
        if !(1..=100).contains(&quality) {
            return Err(ConfigError::Invalid {
                var: "IMAGE_QUALITY",
                reason: "must be between 1 and 100".into(),
            });
        }
        let defaults = SeoDefaults::default();
        let mail = mail_settings()?;
        let admin_seed = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };
        Ok(AppConfig {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/storefront".into()),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            max_connections: parsed("DB_MAX_CONNECTIONS", 5)?,
            jwt: JwtConfig {
                secret,
                expiration_hours: parsed("JWT_EXPIRATION_HOURS", 24)?,
                issuer: var("JWT_ISSUER").unwrap_or_else(|| "storefront".into()),
            },
            upload: UploadSettings {
                dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "uploads".into())),
                max_dimension: parsed("IMAGE_MAX_DIMENSION", 800)?,
                quality,
                max_file_bytes: parsed("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
                max_body_bytes: parsed("MAX_BODY_BYTES", 50 * 1024 * 1024)?,
            },
            google_client_id: var("GOOGLE_CLIENT_ID"),
            frontend_url: var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            reset_token_ttl_minutes: parsed("RESET_TOKEN_TTL_MINUTES", 60)?,
            seo: SeoDefaults {
                title: var("SITE_TITLE").unwrap_or(defaults.title),
                description: var("SITE_DESCRIPTION").unwrap_or(defaults.description),
                keywords: var("SITE_KEYWORDS").unwrap_or(defaults.keywords),
                image: var("SITE_IMAGE").or(defaults.image),
            },
            admin_seed,
            mail,
        })
    }

    /// Settings for tests and embedding: everything defaulted around the given secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        AppConfig {
            database_url: "postgres://localhost/storefront".into(),
            bind_addr: "127.0.0.1:3000".into(),
            max_connections: 5,
            jwt: JwtConfig {
                secret: secret.into(),
                expiration_hours: 24,
                issuer: "storefront".into(),
            },
            upload: UploadSettings::default(),
            google_client_id: None,
            frontend_url: "http://localhost:3000".into(),
            reset_token_ttl_minutes: 60,
            seo: SeoDefaults::default(),
            admin_seed: None,
            mail: MailSettings::default(),
        }
    }
}

/// `MAIL_TRANSPORT` (log or ses, default log). SES needs `MAIL_FROM`; `SES_REGION` is optional.
fn mail_settings() -> Result<MailSettings, ConfigError> {
    let mut transport = parsed("MAIL_TRANSPORT", MailTransport::Log)?;
    if let MailTransport::Ses { region } = &mut transport {
        *region = var("SES_REGION");
    }
    let from = match (&transport, var("MAIL_FROM")) {
        (_, Some(from)) => from,
        (MailTransport::Ses { .. }, None) => return Err(ConfigError::Missing("MAIL_FROM")),
        (MailTransport::Log, None) => MailSettings::default().from,
    };
    Ok(MailSettings { transport, from })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mail_transport() {
        assert_eq!("log".parse::<MailTransport>(), Ok(MailTransport::Log));
        assert_eq!("SES".parse::<MailTransport>(), Ok(MailTransport::Ses { region: None }));
        assert!("smtp".parse::<MailTransport>().is_err());
    }

    #[test]
    fn defaults_log_mail() {
        let config = AppConfig::with_secret("x".repeat(32));
        assert_eq!(config.mail.transport, MailTransport::Log);
    }
}
