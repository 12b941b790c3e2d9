use crate::domain::viewport::WindowCaps;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub playback: PlaybackSettings,
    #[serde(default)]
    pub window: WindowCaps,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// Host (and optional port) of the relay server, e.g. `pool.local:8080`
    pub host: String,
    /// Use `wss`/`https` instead of `ws`/`http`
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    #[serde(default = "default_prediction_path")]
    pub prediction_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Session cookie forwarded on every request, e.g. `token=...`
    #[serde(default)]
    pub session_cookie: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlaybackSettings {
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    #[serde(default = "default_backlog_threshold")]
    pub backlog_threshold: usize,
}

fn default_socket_path() -> String {
    "/web/api/ws".to_string()
}

fn default_prediction_path() -> String {
    "/web/api/prediction".to_string()
}

fn default_logout_path() -> String {
    "/auth/logoff".to_string()
}

fn default_tick_millis() -> u64 {
    1000
}

fn default_backlog_threshold() -> usize {
    10
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tick_millis: default_tick_millis(),
            backlog_threshold: default_backlog_threshold(),
        }
    }
}

impl PlaybackSettings {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }
}

impl ServerSettings {
    /// Websocket address of the metrics relay
    pub fn socket_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}{}", scheme, self.host_trimmed(), normalize_path(&self.socket_path))
    }

    pub fn http_url(&self, path: &str) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.host_trimmed(), normalize_path(path))
    }

    pub fn prediction_url(&self) -> String {
        self.http_url(&self.prediction_path)
    }

    pub fn logout_url(&self) -> String {
        self.http_url(&self.logout_path)
    }

    fn host_trimmed(&self) -> &str {
        self.host.trim_end_matches('/')
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Loads `config/dashboard.*` overlaid by `POOL_DASHBOARD__SECTION__KEY` variables
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("POOL_DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn parse(toml: &str) -> DashboardConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse("[server]\nhost = \"pool.local:8080\"\n");

        assert_eq!(config.server.socket_url(), "ws://pool.local:8080/web/api/ws");
        assert_eq!(config.playback.period(), Duration::from_secs(1));
        assert_eq!(config.playback.backlog_threshold, 10);
        assert_eq!(config.window, WindowCaps::default());
        assert_eq!(config.server.session_cookie, None);
    }

    #[test]
    fn test_secure_host_uses_tls_schemes() {
        let config = parse(
            r#"
            [server]
            host = "pool.example.com/"
            secure = true
            prediction_path = "api/predict"

            [playback]
            tick_millis = 250

            [window]
            small = 5
            "#,
        );

        assert_eq!(config.server.socket_url(), "wss://pool.example.com/web/api/ws");
        assert_eq!(config.server.prediction_url(), "https://pool.example.com/api/predict");
        assert_eq!(config.server.logout_url(), "https://pool.example.com/auth/logoff");
        assert_eq!(config.playback.period(), Duration::from_millis(250));
        assert_eq!(config.window.small, 5);
        assert_eq!(config.window.large, 11);
    }
}
