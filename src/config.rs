use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Настройки сервиса. Сам список правил хранится отдельно (см. `rules::RuleStore`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub ipc: IpcConfig,
    pub rules: RulesConfig,
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Путь к сокету Wayfire; по умолчанию `$WAYFIRE_SOCKET`
    pub socket_path: Option<String>,
    pub request_timeout_ms: u64,
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    pub path: Option<String>,
    /// Перечитывать файл правил перед каждой оценкой, если он изменился
    pub reload_on_event: bool,
    /// Пустой match_value для app-id/title совпадает с любым окном
    pub empty_value_matches_all: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            request_timeout_ms: 2000,
            reconnect_delay_ms: 1000,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: None,
            reload_on_event: true,
            empty_value_matches_all: false,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

impl Config {
    /// Загрузить конфигурацию: значения по умолчанию, затем TOML-файл
    /// (если существует), затем переменные окружения `WFRULES_*`
    /// (вложенность через `__`, например `WFRULES_IPC__SOCKET_PATH`).
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("WFRULES_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация IPC
        if self.ipc.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms должно быть больше 0");
        }

        if self.ipc.reconnect_delay_ms < 100 {
            anyhow::bail!("reconnect_delay_ms должно быть минимум 100");
        }

        if self.events.channel_capacity == 0 {
            anyhow::bail!("channel_capacity должно быть больше 0");
        }

        if let Some(path) = &self.rules.path {
            if path.trim().is_empty() {
                anyhow::bail!("rules.path не может быть пустым");
            }
        }

        Ok(())
    }

    /// Путь к файлу правил: явный или `$XDG_CONFIG_HOME/wf-rules/rules.json`
    pub fn rules_path(&self) -> PathBuf {
        if let Some(path) = &self.rules.path {
            return PathBuf::from(path);
        }

        let config_home = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));

        config_home.join("wf-rules").join("rules.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.rules.reload_on_event);
        assert!(!config.rules.empty_value_matches_all);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ipc.request_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ipc.reconnect_delay_ms = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.events.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_merges_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf-rules.toml");
        std::fs::write(
            &path,
            r#"
[logging]
level = "debug"

[rules]
path = "/tmp/my-rules.json"
empty_value_matches_all = true
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.ipc.request_timeout_ms, 2000);
        assert!(config.rules.empty_value_matches_all);
        assert_eq!(config.rules_path(), PathBuf::from("/tmp/my-rules.json"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.events.channel_capacity, 256);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf-rules.toml");
        std::fs::write(&path, "[logging]\nformat = \"xml\"\n").unwrap();

        assert!(Config::load(&path).is_err());
    }
}
