//! Rule model: what a persisted rule looks like and how its closed
//! vocabularies (match keys, events, actions) are represented.
//!
//! Unknown vocabulary values are rejected while a record is deserialised, so
//! everything past the [`store::RuleStore`] boundary works with typed values.

pub mod action;
pub mod matcher;
pub mod store;

pub use action::ActionCommand;
pub use matcher::Matcher;
pub use store::RuleStore;

use crate::error::{Result, RulesError};
use crate::events::EventName;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Правило, созданное пользователем и сохранённое в файле правил
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub match_key: MatchKey,
    #[serde(deserialize_with = "deserialize_opaque")]
    pub match_value: String,
    pub event: EventName,
    #[serde(default, rename = "timeout")]
    pub timeout_ms: u64,
    pub action: Action,
    #[serde(default, deserialize_with = "deserialize_opaque")]
    pub value: String,
}

impl Rule {
    pub fn new(match_key: MatchKey, match_value: impl Into<String>, event: EventName, action: Action) -> Self {
        Self {
            name: None,
            match_key,
            match_value: match_value.into(),
            event,
            timeout_ms: 0,
            action,
            value: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Имя для логов: `name`, если задано, иначе позиция в списке
    pub fn label(&self, index: usize) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => format!("'{}'", name),
            _ => format!("#{}", index + 1),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}=\"{}\" -> {}",
            self.event, self.match_key, self.match_value, self.action
        )?;
        if !self.value.is_empty() {
            write!(f, "({})", self.value)?;
        }
        if self.timeout_ms > 0 {
            write!(f, " через {}мс", self.timeout_ms)?;
        }
        Ok(())
    }
}

/// Поле view, с которым сравнивается `match_value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchKey {
    AppId,
    Title,
    OutputName,
    Type,
    Role,
    Parent,
}

impl MatchKey {
    pub const ALL: [MatchKey; 6] = [
        MatchKey::AppId,
        MatchKey::Title,
        MatchKey::OutputName,
        MatchKey::Type,
        MatchKey::Role,
        MatchKey::Parent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKey::AppId => "app-id",
            MatchKey::Title => "title",
            MatchKey::OutputName => "output-name",
            MatchKey::Type => "type",
            MatchKey::Role => "role",
            MatchKey::Parent => "parent",
        }
    }

    /// Ключи со сравнением по вхождению подстроки
    pub fn is_substring(&self) -> bool {
        matches!(self, MatchKey::AppId | MatchKey::Title)
    }
}

impl FromStr for MatchKey {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self> {
        MatchKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| RulesError::UnknownVariant {
                kind: "match_key",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Действие, выполняемое при срабатывании правила
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Fullscreen,
    Center,
    Maximize,
    MoveToOutput,
    SendToWorkspace,
    Alpha,
    ConfigureView,
    SetMinimized,
    CenterCursor,
    AssignSlot,
    PressKey,
    MoveCursor,
    ClickButton,
    SetFocus,
}

impl Action {
    pub const ALL: [Action; 14] = [
        Action::Fullscreen,
        Action::Center,
        Action::Maximize,
        Action::MoveToOutput,
        Action::SendToWorkspace,
        Action::Alpha,
        Action::ConfigureView,
        Action::SetMinimized,
        Action::CenterCursor,
        Action::AssignSlot,
        Action::PressKey,
        Action::MoveCursor,
        Action::ClickButton,
        Action::SetFocus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Fullscreen => "fullscreen",
            Action::Center => "center",
            Action::Maximize => "maximize",
            Action::MoveToOutput => "move_to_output",
            Action::SendToWorkspace => "send_to_workspace",
            Action::Alpha => "alpha",
            Action::ConfigureView => "configure_view",
            Action::SetMinimized => "set_minimized",
            Action::CenterCursor => "center_cursor",
            Action::AssignSlot => "assign_slot",
            Action::PressKey => "press_key",
            Action::MoveCursor => "move_cursor",
            Action::ClickButton => "click_button",
            Action::SetFocus => "set_focus",
        }
    }

    /// Действия, не определённые для view с ролью отличной от toplevel
    pub fn requires_toplevel(&self) -> bool {
        matches!(
            self,
            Action::Fullscreen | Action::Maximize | Action::SetMinimized | Action::ConfigureView
        )
    }
}

impl FromStr for Action {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| RulesError::UnknownVariant {
                kind: "action",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Непрозрачное значение из файла правил: строка, bool или число
#[derive(Deserialize)]
#[serde(untagged)]
enum OpaqueValue {
    Text(String),
    Flag(bool),
    Int(i64),
    Float(f64),
}

fn deserialize_opaque<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<OpaqueValue>::deserialize(deserializer)?;
    Ok(match value {
        None => String::new(),
        Some(OpaqueValue::Text(text)) => text,
        Some(OpaqueValue::Flag(flag)) => flag.to_string(),
        Some(OpaqueValue::Int(number)) => number.to_string(),
        Some(OpaqueValue::Float(number)) => number.to_string(),
    })
}
