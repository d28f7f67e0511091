use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaBackend {
    Fs,
    S3,
}

/// Process configuration read from the environment (`.env` is loaded in debug builds).
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub media_backend: MediaBackend,
    pub media_dir: PathBuf,
    /// Base used to build URLs of locally stored media.
    pub public_base_url: String,
    pub frontend_url: Option<String>,
    pub notify_webhook_url: Option<String>,
}

fn string_env(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match optional_env("PORT") {
            Some(p) => p.parse().map_err(|_| anyhow::anyhow!("PORT must be a port number, got '{p}'"))?,
            None => 3000,
        };
        let media_backend = match string_env("MEDIA_BACKEND", "fs").to_ascii_lowercase().as_str() {
            "fs" => MediaBackend::Fs,
            "s3" => MediaBackend::S3,
            other => anyhow::bail!("MEDIA_BACKEND must be 'fs' or 's3', got '{other}'"),
        };
        let public_base_url = optional_env("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));
        Ok(Self {
            bind: string_env("KIDSTEPS_BIND", "0.0.0.0"),
            port,
            data_dir: PathBuf::from(string_env("KIDSTEPS_DATA_DIR", "data")),
            media_backend,
            media_dir: PathBuf::from(string_env("KIDSTEPS_MEDIA_DIR", "uploads")),
            public_base_url,
            frontend_url: optional_env("FRONTEND_URL"),
            notify_webhook_url: optional_env("NOTIFY_WEBHOOK_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn defaults_and_overrides() {
        for k in ["PORT", "MEDIA_BACKEND", "PUBLIC_BASE_URL", "KIDSTEPS_DATA_DIR", "FRONTEND_URL"] {
            std::env::remove_var(k);
        }
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.media_backend, MediaBackend::Fs);
        assert_eq!(cfg.public_base_url, "http://localhost:3000");
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert!(cfg.frontend_url.is_none());

        std::env::set_var("PORT", "8081");
        std::env::set_var("MEDIA_BACKEND", "S3");
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.media_backend, MediaBackend::S3);

        std::env::set_var("MEDIA_BACKEND", "ftp");
        assert!(AppConfig::from_env().is_err());
        std::env::remove_var("PORT");
        std::env::remove_var("MEDIA_BACKEND");
    }
}
