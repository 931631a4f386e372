use crate::error::{Result, RulesError};
use crate::services::compositor::CompositorClient;
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const PLUGINS_OPTION: &str = "core/plugins";

/// Плагины Wayfire, через которые выполняются действия правил
pub const REQUIRED_PLUGINS: [&str; 7] = ["ipc", "ipc-rules", "stipc", "wm-actions", "grid", "alpha", "wsets"];

/// Результат проверки списка плагинов компоситора
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginReport {
    pub enabled: Vec<String>,
    pub missing: Vec<&'static str>,
}

impl PluginReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Проверить, что обязательные плагины включены в `core/plugins`
pub async fn check_plugins(compositor: &dyn CompositorClient) -> Result<PluginReport> {
    info!("Проверка плагинов Wayfire...");

    let value = compositor.get_option_value(PLUGINS_OPTION).await?;
    let enabled = parse_plugin_list(&value)?;
    let missing: Vec<&'static str> = REQUIRED_PLUGINS
        .iter()
        .copied()
        .filter(|plugin| !enabled.iter().any(|name| name == plugin))
        .collect();

    if missing.is_empty() {
        info!("Все необходимые плагины включены");
    } else {
        warn!(
            "Не включены плагины Wayfire: {}. Часть действий работать не будет",
            missing.join(", ")
        );
    }

    Ok(PluginReport { enabled, missing })
}

/// Дописать отсутствующие плагины в `core/plugins`
pub async fn enable_missing_plugins(compositor: &dyn CompositorClient) -> Result<PluginReport> {
    let report = check_plugins(compositor).await?;
    if report.is_complete() {
        return Ok(report);
    }

    let mut plugins = report.enabled.clone();
    plugins.extend(report.missing.iter().map(|plugin| plugin.to_string()));

    let mut values = Map::new();
    values.insert(PLUGINS_OPTION.to_string(), Value::from(plugins.join(" ")));
    compositor.set_option_values(values).await?;

    info!("Включены плагины: {}", report.missing.join(", "));
    Ok(PluginReport {
        enabled: plugins,
        missing: Vec::new(),
    })
}

fn parse_plugin_list(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(list) => Ok(list.split_whitespace().map(str::to_string).collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(RulesError::Ipc(format!(
            "Неожиданное значение {}: {}",
            PLUGINS_OPTION, other
        ))),
    }
}
