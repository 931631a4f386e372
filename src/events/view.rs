use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор view в компоситоре
pub type ViewId = u64;

/// Роль, для которой разрешена обработка правил
pub const TOPLEVEL_ROLE: &str = "toplevel";

/// Снимок view в момент события.
///
/// Снимок не перечитывается: если окно закрылось до срабатывания отложенного
/// действия, `id` просто перестаёт резолвиться на стороне компоситора.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewSnapshot {
    pub id: ViewId,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, rename = "type")]
    pub view_type: String,
    #[serde(default)]
    pub output_name: String,
    /// -1 для окна верхнего уровня, иначе id владельца
    #[serde(default = "no_parent")]
    pub parent: i64,
    #[serde(default)]
    pub geometry: Geometry,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub minimized: bool,
    #[serde(default)]
    pub sticky: bool,
}

fn no_parent() -> i64 {
    -1
}

impl ViewSnapshot {
    pub fn new(id: ViewId, app_id: impl Into<String>) -> Self {
        Self {
            id,
            app_id: app_id.into(),
            title: String::new(),
            role: TOPLEVEL_ROLE.to_string(),
            view_type: TOPLEVEL_ROLE.to_string(),
            output_name: String::new(),
            parent: no_parent(),
            geometry: Geometry::default(),
            fullscreen: false,
            minimized: false,
            sticky: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_type(mut self, view_type: impl Into<String>) -> Self {
        self.view_type = view_type.into();
        self
    }

    pub fn with_output(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = output_name.into();
        self
    }

    pub fn with_parent(mut self, parent: i64) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn is_toplevel(&self) -> bool {
        self.role == TOPLEVEL_ROLE
    }

    pub fn parent_kind(&self) -> ParentKind {
        if self.parent > -1 {
            ParentKind::DialogOrPopup
        } else {
            ParentKind::MainWindow
        }
    }
}

impl fmt::Display for ViewSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "#{} ({})", self.id, self.app_id)
        } else {
            write!(f, "#{} \"{}\" ({})", self.id, self.title, self.app_id)
        }
    }
}

/// Производная классификация по отношению parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    MainWindow,
    DialogOrPopup,
}

impl ParentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentKind::MainWindow => "Main Window",
            ParentKind::DialogOrPopup => "Dialog or Popup",
        }
    }
}

/// Геометрия окна или output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Положение прямоугольника `size` по центру `self` с тем же размером
    pub fn centered(&self, size: &Geometry) -> Geometry {
        Geometry {
            x: self.x + (self.width - size.width) / 2,
            y: self.y + (self.height - size.height) / 2,
            width: size.width,
            height: size.height,
        }
    }
}

/// Output (монитор) компоситора
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputInfo {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub geometry: Geometry,
    #[serde(default)]
    pub workarea: Geometry,
    #[serde(default)]
    pub wset_index: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_snapshot_from_wayfire_json() {
        let raw = r#"{
            "id": 12, "app-id": "firefox", "title": "Mozilla Firefox",
            "role": "toplevel", "type": "toplevel", "output-name": "DP-1",
            "parent": -1, "geometry": {"x": 10, "y": 20, "width": 800, "height": 600},
            "fullscreen": false, "minimized": false, "sticky": true, "focusable": true
        }"#;
        let view: ViewSnapshot = serde_json::from_str(raw).unwrap();

        assert_eq!(view.id, 12);
        assert_eq!(view.app_id, "firefox");
        assert_eq!(view.output_name, "DP-1");
        assert_eq!(view.geometry, Geometry::new(10, 20, 800, 600));
        assert!(view.sticky);
        assert!(view.is_toplevel());
    }

    #[test]
    fn test_missing_parent_defaults_to_main_window() {
        let view: ViewSnapshot = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(view.parent, -1);
        assert_eq!(view.parent_kind(), ParentKind::MainWindow);
        assert!(!view.is_toplevel());
    }

    #[test]
    fn test_parent_classification() {
        let main = ViewSnapshot::new(1, "app").with_parent(-1);
        let dialog = ViewSnapshot::new(2, "app").with_parent(7);

        assert_eq!(main.parent_kind().as_str(), "Main Window");
        assert_eq!(dialog.parent_kind().as_str(), "Dialog or Popup");
    }

    #[test]
    fn test_geometry_centering() {
        let workarea = Geometry::new(1920, 0, 1920, 1080);
        let window = Geometry::new(0, 0, 800, 600);

        assert_eq!(workarea.centered(&window), Geometry::new(2480, 240, 800, 600));
        assert_eq!(window.center(), (400, 300));
    }
}
