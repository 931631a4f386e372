pub mod view;

pub use view::{Geometry, OutputInfo, ParentKind, ViewId, ViewSnapshot};

use crate::error::{Result, RulesError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// События жизненного цикла view, на которые подписываются правила
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventName {
    ViewMapped,
    ViewFocused,
    ViewUnmapped,
    ViewPreMap,
    ViewTitleChanged,
    ViewAppIdChanged,
    ViewSetOutput,
    ViewWorkspaceChanged,
    ViewWsetChanged,
    ViewGeometryChanged,
    ViewTiled,
    ViewMinimized,
    ViewFullscreen,
    ViewSticky,
}

impl EventName {
    pub const ALL: [EventName; 14] = [
        EventName::ViewMapped,
        EventName::ViewFocused,
        EventName::ViewUnmapped,
        EventName::ViewPreMap,
        EventName::ViewTitleChanged,
        EventName::ViewAppIdChanged,
        EventName::ViewSetOutput,
        EventName::ViewWorkspaceChanged,
        EventName::ViewWsetChanged,
        EventName::ViewGeometryChanged,
        EventName::ViewTiled,
        EventName::ViewMinimized,
        EventName::ViewFullscreen,
        EventName::ViewSticky,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::ViewMapped => "view-mapped",
            EventName::ViewFocused => "view-focused",
            EventName::ViewUnmapped => "view-unmapped",
            EventName::ViewPreMap => "view-pre-map",
            EventName::ViewTitleChanged => "view-title-changed",
            EventName::ViewAppIdChanged => "view-app-id-changed",
            EventName::ViewSetOutput => "view-set-output",
            EventName::ViewWorkspaceChanged => "view-workspace-changed",
            EventName::ViewWsetChanged => "view-wset-changed",
            EventName::ViewGeometryChanged => "view-geometry-changed",
            EventName::ViewTiled => "view-tiled",
            EventName::ViewMinimized => "view-minimized",
            EventName::ViewFullscreen => "view-fullscreen",
            EventName::ViewSticky => "view-sticky",
        }
    }
}

impl FromStr for EventName {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self> {
        EventName::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| RulesError::UnknownVariant {
                kind: "event",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Событие view, доставленное источником событий
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEvent {
    pub event: EventName,
    pub view: Option<ViewSnapshot>,
    pub timestamp: std::time::Instant,
}

impl ViewEvent {
    pub fn new(event: EventName, view: Option<ViewSnapshot>) -> Self {
        Self {
            event,
            view,
            timestamp: std::time::Instant::now(),
        }
    }

    pub fn with_view(event: EventName, view: ViewSnapshot) -> Self {
        Self::new(event, Some(view))
    }
}

impl fmt::Display for ViewEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.view {
            Some(view) => write!(f, "{}: {}", self.event, view),
            None => write!(f, "{}: <без view>", self.event),
        }
    }
}
