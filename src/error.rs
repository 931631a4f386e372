use crate::events::ViewId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Ошибка конфигурации: {0}")]
    Config(String),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Значение вне закрытого перечисления (match_key, event, action, слот и т.п.)
    #[error("Неизвестное значение {kind}: '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Некорректное значение '{value}' для действия {action}: {reason}")]
    ActionValue {
        action: &'static str,
        value: String,
        reason: String,
    },

    #[error("Ошибка IPC: {0}")]
    Ipc(String),

    #[error("View {0} не найден")]
    ViewNotFound(ViewId),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),
}

impl RulesError {
    pub fn action_value(action: &'static str, value: &str, reason: impl Into<String>) -> Self {
        RulesError::ActionValue {
            action,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Ошибка, которую ожидаемо возвращает компоситор для закрытого окна
    pub fn is_stale_view(&self) -> bool {
        matches!(self, RulesError::ViewNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, RulesError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! rules_error {
    (config, $($arg:tt)*) => {
        $crate::error::RulesError::Config(format!($($arg)*))
    };
    (ipc, $($arg:tt)*) => {
        $crate::error::RulesError::Ipc(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::RulesError::ServiceUnavailable(format!($($arg)*))
    };
}
