use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

use crate::orchestrator::PlatformIds;

#[derive(Parser, Debug)]
#[command(name = "picgram", about = "A self-hosted photo sharing backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub platform: PlatformConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API with credentials.
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
    pub max_file_bytes: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub bcrypt_cost: u32,
}

/// Identifiers of the database, collections and bucket the orchestrator targets.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PlatformConfig {
    pub public_url: String,
    pub database_id: String,
    pub user_collection_id: String,
    pub post_collection_id: String,
    pub saves_collection_id: String,
    pub storage_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_file_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "picgram_session".to_string(),
            session_hours: 720,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:3000".to_string(),
            database_id: "main".to_string(),
            user_collection_id: "users".to_string(),
            post_collection_id: "posts".to_string(),
            saves_collection_id: "saves".to_string(),
            storage_id: "media".to_string(),
        }
    }
}

impl PlatformConfig {
    pub fn ids(&self) -> PlatformIds {
        PlatformIds {
            database_id: self.database_id.clone(),
            user_collection_id: self.user_collection_id.clone(),
            post_collection_id: self.post_collection_id.clone(),
            saves_collection_id: self.saves_collection_id.clone(),
            storage_id: self.storage_id.clone(),
        }
    }

    /// Apply `PICGRAM_*` environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut String); 6] = [
            ("PICGRAM_PUBLIC_URL", &mut self.public_url),
            ("PICGRAM_DATABASE_ID", &mut self.database_id),
            ("PICGRAM_USER_COLLECTION_ID", &mut self.user_collection_id),
            ("PICGRAM_POST_COLLECTION_ID", &mut self.post_collection_id),
            ("PICGRAM_SAVES_COLLECTION_ID", &mut self.saves_collection_id),
            ("PICGRAM_STORAGE_ID", &mut self.storage_id),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::load_with_env(cli, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        cli: &Cli,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.platform.apply_env(lookup);

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("picgram.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("uploads"));
        }

        url::Url::parse(&config.platform.public_url).map_err(|e| {
            anyhow::anyhow!("invalid platform.public_url {:?}: {}", config.platform.public_url, e)
        })?;

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".picgram")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("picgram.db"))
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("uploads"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn cli(data_dir: &std::path::Path) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir.to_path_buf()),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.cookie_name, "picgram_session");
        assert_eq!(config.auth.session_hours, 720);
        assert_eq!(config.storage.max_file_bytes, 50 * 1024 * 1024);
        assert_eq!(config.platform.database_id, "main");
        assert_eq!(config.platform.storage_id, "media");
        assert!(config.database.path.is_none());
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(std::path::Path::new("/tmp/test-picgram"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-picgram"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_picgram() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
        };
        assert!(Config::data_dir(&cli).ends_with(".picgram"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with_env(&cli(tmp.path()), no_env).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), tmp.path().join("picgram.db"));
        assert_eq!(config.uploads_path(), tmp.path().join("uploads"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000
allowed_origins = ["http://localhost:5173"]

[platform]
database_id = "prod"
storage_id = "images"

[auth]
session_hours = 24
"#,
        )
        .unwrap();

        let mut cli = cli(tmp.path());
        cli.config = Some(config_path);
        let config = Config::load_with_env(&cli, no_env).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.platform.database_id, "prod");
        assert_eq!(config.platform.storage_id, "images");
        assert_eq!(config.platform.post_collection_id, "posts");
        assert_eq!(config.auth.session_hours, 24);
    }

    #[test]
    fn env_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[platform]\ndatabase_id = \"from-file\"\n",
        )
        .unwrap();

        let config = Config::load_with_env(&cli(tmp.path()), |key| match key {
            "PICGRAM_DATABASE_ID" => Some("from-env".to_string()),
            "PICGRAM_STORAGE_ID" => Some("  ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.platform.database_id, "from-env");
        assert_eq!(config.platform.storage_id, "media");
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[server]\nhost = \"192.168.1.1\"\nport = 9000\n",
        )
        .unwrap();

        let mut cli = cli(tmp.path());
        cli.host = Some("10.0.0.1".to_string());
        cli.port = Some(4000);
        let config = Config::load_with_env(&cli, no_env).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn invalid_public_url_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let result = Config::load_with_env(&cli(tmp.path()), |key| {
            (key == "PICGRAM_PUBLIC_URL").then(|| "not a url".to_string())
        });
        assert!(result.is_err());
    }
}
