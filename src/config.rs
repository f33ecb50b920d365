use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vitrina", about = "A portfolio sharing server")]
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
    pub auth: AuthConfig,
    pub federated: FederatedConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin browsers reach us at, used for OAuth redirect URIs
    pub public_url: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FederatedConfig {
    pub google: ProviderConfig,
    pub facebook: ProviderConfig,
}

/// One OAuth2 provider. A provider with no client_id is disabled.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    pub fn enabled(&self) -> bool {
        !self.client_id.is_empty()
    }

    fn fill_missing_endpoints(&mut self, stock: &ProviderConfig) {
        if self.auth_url.is_empty() {
            self.auth_url = stock.auth_url.clone();
        }
        if self.token_url.is_empty() {
            self.token_url = stock.token_url.clone();
        }
        if self.userinfo_url.is_empty() {
            self.userinfo_url = stock.userinfo_url.clone();
        }
        if self.scopes.is_empty() {
            self.scopes = stock.scopes.clone();
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "vitrina_session".to_string(),
            session_hours: 720,
        }
    }
}

impl Default for FederatedConfig {
    fn default() -> Self {
        Self {
            google: ProviderConfig {
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
                scopes: vec![
                    "openid".to_string(),
                    "email".to_string(),
                    "profile".to_string(),
                ],
                ..ProviderConfig::default()
            },
            facebook: ProviderConfig {
                auth_url: "https://www.facebook.com/v19.0/dialog/oauth".to_string(),
                token_url: "https://graph.facebook.com/v19.0/oauth/access_token".to_string(),
                userinfo_url: "https://graph.facebook.com/me?fields=id,name,email,picture.type(large)"
                    .to_string(),
                scopes: vec!["email".to_string(), "public_profile".to_string()],
                ..ProviderConfig::default()
            },
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
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

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("vitrina.db"));
        }

        // A provider section that sets only client credentials keeps
        // the stock endpoint URLs.
        let stock = FederatedConfig::default();
        config.federated.google.fill_missing_endpoints(&stock.google);
        config
            .federated
            .facebook
            .fill_missing_endpoints(&stock.facebook);

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not determine home directory")
                .join(".vitrina")
        })
    }

    pub fn db_path(&self) -> &PathBuf {
        self.database.path.as_ref().unwrap()
    }

    /// Enabled provider config for a known provider key.
    pub fn provider(&self, key: &str) -> Option<&ProviderConfig> {
        let provider = match key {
            "google" => &self.federated.google,
            "facebook" => &self.federated.facebook,
            _ => return None,
        };
        provider.enabled().then_some(provider)
    }

    /// Callback URI registered with the provider.
    pub fn federated_redirect_uri(&self, key: &str) -> String {
        format!(
            "{}/auth/federated/{}/callback",
            self.server.public_url.trim_end_matches('/'),
            key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.cookie_name, "vitrina_session");
        assert_eq!(config.auth.session_hours, 720);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn providers_are_disabled_without_client_ids() {
        let config = Config::default();
        assert!(config.provider("google").is_none());
        assert!(config.provider("facebook").is_none());
        assert!(config.provider("github").is_none());
    }

    #[test]
    fn provider_defaults_keep_endpoint_urls() {
        let config = Config::default();
        assert!(config.federated.google.auth_url.contains("accounts.google.com"));
        assert!(config.federated.facebook.token_url.contains("graph.facebook.com"));
    }

    #[test]
    fn redirect_uri_strips_trailing_slash() {
        let mut config = Config::default();
        config.server.public_url = "https://vitrina.example/".to_string();
        assert_eq!(
            config.federated_redirect_uri("google"),
            "https://vitrina.example/auth/federated/google/callback"
        );
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(PathBuf::from("/tmp/test-vitrina")),
        };
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-vitrina"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_vitrina() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
        };
        let dir = Config::data_dir(&cli);
        assert!(dir.ends_with(".vitrina"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), &tmp.path().join("vitrina.db"));
    }

    #[test]
    fn load_applies_cli_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: None,
            host: Some("127.0.0.1".to_string()),
            port: Some(8080),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
public_url = "https://vitrina.example"

[auth]
cookie_name = "my_cookie"
session_hours = 24

[federated.google]
client_id = "g-client"
client_secret = "g-secret"
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.cookie_name, "my_cookie");
        assert_eq!(config.auth.session_hours, 24);

        // Partial provider sections still get the default endpoints.
        let google = config.provider("google").unwrap();
        assert_eq!(google.client_id, "g-client");
        assert!(google.auth_url.contains("accounts.google.com"));
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }
}
