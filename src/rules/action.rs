use super::Action;
use crate::error::{Result, RulesError};
use crate::events::Geometry;
use smallvec::SmallVec;
use std::fmt;

/// Действие с разобранным значением, готовое к отправке в компоситор
#[derive(Debug, Clone, PartialEq)]
pub enum ActionCommand {
    Fullscreen(bool),
    Center,
    Maximize,
    MoveToOutput(String),
    SendToWorkspace { x: i32, y: i32 },
    Alpha(f64),
    ConfigureView(Geometry),
    SetMinimized(bool),
    CenterCursor,
    AssignSlot(Slot),
    PressKey(String),
    MoveCursor { x: i32, y: i32 },
    ClickButton { button: String, mode: ButtonMode },
    SetFocus,
}

impl ActionCommand {
    /// Разобрать непрозрачное `value` правила в форму, которую ожидает действие
    pub fn parse(action: Action, value: &str) -> Result<Self> {
        let name = action.as_str();
        let command = match action {
            Action::Fullscreen => ActionCommand::Fullscreen(parse_bool(name, value)?),
            Action::Center => ActionCommand::Center,
            Action::Maximize => ActionCommand::Maximize,
            Action::MoveToOutput => ActionCommand::MoveToOutput(parse_token(name, value)?),
            Action::SendToWorkspace => {
                let [x, y] = parse_ints::<2>(name, value)?;
                if x < 0 || y < 0 {
                    return Err(RulesError::action_value(name, value, "координаты workspace не могут быть отрицательными"));
                }
                ActionCommand::SendToWorkspace { x, y }
            }
            Action::Alpha => ActionCommand::Alpha(parse_alpha(name, value)?),
            Action::ConfigureView => {
                let [x, y, width, height] = parse_ints::<4>(name, value)?;
                if width <= 0 || height <= 0 {
                    return Err(RulesError::action_value(name, value, "ширина и высота должны быть больше 0"));
                }
                ActionCommand::ConfigureView(Geometry::new(x, y, width, height))
            }
            Action::SetMinimized => ActionCommand::SetMinimized(parse_bool(name, value)?),
            Action::CenterCursor => ActionCommand::CenterCursor,
            Action::AssignSlot => ActionCommand::AssignSlot(
                value
                    .trim()
                    .parse::<Slot>()
                    .map_err(|_| RulesError::action_value(name, value, "неизвестный слот"))?,
            ),
            Action::PressKey => ActionCommand::PressKey(parse_token(name, value)?),
            Action::MoveCursor => {
                let [x, y] = parse_ints::<2>(name, value)?;
                ActionCommand::MoveCursor { x, y }
            }
            Action::ClickButton => {
                let (button, mode) = value
                    .split_once(',')
                    .ok_or_else(|| RulesError::action_value(name, value, "ожидалось 'кнопка,режим'"))?;
                let button = parse_token(name, button)?;
                let mode = mode
                    .trim()
                    .parse::<ButtonMode>()
                    .map_err(|_| RulesError::action_value(name, value, "режим должен быть press, release или click"))?;
                ActionCommand::ClickButton { button, mode }
            }
            Action::SetFocus => ActionCommand::SetFocus,
        };
        Ok(command)
    }

    pub fn action(&self) -> Action {
        match self {
            ActionCommand::Fullscreen(_) => Action::Fullscreen,
            ActionCommand::Center => Action::Center,
            ActionCommand::Maximize => Action::Maximize,
            ActionCommand::MoveToOutput(_) => Action::MoveToOutput,
            ActionCommand::SendToWorkspace { .. } => Action::SendToWorkspace,
            ActionCommand::Alpha(_) => Action::Alpha,
            ActionCommand::ConfigureView(_) => Action::ConfigureView,
            ActionCommand::SetMinimized(_) => Action::SetMinimized,
            ActionCommand::CenterCursor => Action::CenterCursor,
            ActionCommand::AssignSlot(_) => Action::AssignSlot,
            ActionCommand::PressKey(_) => Action::PressKey,
            ActionCommand::MoveCursor { .. } => Action::MoveCursor,
            ActionCommand::ClickButton { .. } => Action::ClickButton,
            ActionCommand::SetFocus => Action::SetFocus,
        }
    }
}

fn parse_bool(action: &'static str, value: &str) -> Result<bool> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(RulesError::action_value(action, value, "ожидалось true или false"))
    }
}

fn parse_token(action: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RulesError::action_value(action, value, "пустое значение"));
    }
    Ok(trimmed.to_string())
}

fn parse_alpha(action: &'static str, value: &str) -> Result<f64> {
    let alpha: f64 = value
        .trim()
        .parse()
        .map_err(|_| RulesError::action_value(action, value, "ожидалось число"))?;
    if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
        return Err(RulesError::action_value(action, value, "прозрачность должна быть в диапазоне 0.0 - 1.0"));
    }
    Ok(alpha)
}

/// Список целых через запятую строго заданной длины
fn parse_ints<const N: usize>(action: &'static str, value: &str) -> Result<[i32; N]> {
    let parts: SmallVec<[i32; 4]> = value
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| RulesError::action_value(action, value, "ожидались целые числа через запятую"))?;

    parts.as_slice().try_into().map_err(|_| {
        RulesError::action_value(action, value, format!("ожидалось {} значений, получено {}", N, parts.len()))
    })
}

/// Предопределённые позиции сетки (плагин grid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Slot {
    pub const ALL: [Slot; 9] = [
        Slot::TopLeft,
        Slot::Top,
        Slot::TopRight,
        Slot::Left,
        Slot::Center,
        Slot::Right,
        Slot::BottomLeft,
        Slot::Bottom,
        Slot::BottomRight,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Slot::TopLeft => "slot_tl",
            Slot::Top => "slot_t",
            Slot::TopRight => "slot_tr",
            Slot::Left => "slot_l",
            Slot::Center => "slot_c",
            Slot::Right => "slot_r",
            Slot::BottomLeft => "slot_bl",
            Slot::Bottom => "slot_b",
            Slot::BottomRight => "slot_br",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Slot::TopLeft => "Top Left",
            Slot::Top => "Top",
            Slot::TopRight => "Top Right",
            Slot::Left => "Left",
            Slot::Center => "Center",
            Slot::Right => "Right",
            Slot::BottomLeft => "Bottom Left",
            Slot::Bottom => "Bottom",
            Slot::BottomRight => "Bottom Right",
        }
    }
}

impl std::str::FromStr for Slot {
    type Err = RulesError;

    /// Принимает и токен (`slot_tl`), и отображаемое имя (`Top Left`)
    fn from_str(s: &str) -> Result<Self> {
        Slot::ALL
            .iter()
            .copied()
            .find(|slot| slot.token() == s || slot.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RulesError::UnknownVariant {
                kind: "slot",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Режим нажатия кнопки мыши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonMode {
    Press,
    Release,
    Click,
}

impl ButtonMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonMode::Press => "press",
            ButtonMode::Release => "release",
            ButtonMode::Click => "click",
        }
    }
}

impl std::str::FromStr for ButtonMode {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "press" => Ok(ButtonMode::Press),
            "release" => Ok(ButtonMode::Release),
            "click" => Ok(ButtonMode::Click),
            _ => Err(RulesError::UnknownVariant {
                kind: "button mode",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ButtonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
