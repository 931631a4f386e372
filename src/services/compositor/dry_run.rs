use crate::error::{Result, RulesError};
use crate::events::{Geometry, OutputInfo, ViewId, ViewSnapshot};
use crate::rules::action::{ButtonMode, Slot};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::info;

use super::r#trait::{center_view, CompositorClient};

/// Вызов, записанный dry-run компоситором
#[derive(Debug, Clone, PartialEq)]
pub enum CompositorCall {
    SetOptionValues(Map<String, Value>),
    SetViewFullscreen(ViewId, bool),
    SetViewMaximized(ViewId),
    SendViewToWorkspace(ViewId, i32, i32),
    SendViewToWset(ViewId, u64),
    SetViewAlpha(ViewId, f64),
    ConfigureView(ViewId, Geometry),
    SetViewMinimized(ViewId, bool),
    CenterViewOnOutput(ViewId),
    CenterCursorOnView(ViewId),
    AssignSlot(ViewId, Slot),
    PressKey(String),
    MoveCursor(i32, i32),
    ClickButton(String, ButtonMode),
    SetViewFocus(ViewId),
}

/// Компоситор без реальных действий: логирует и записывает вызовы.
///
/// Без зарегистрированных view принимает любой id. После `with_views`
/// работает строго: неизвестный или удалённый view даёт `ViewNotFound`.
pub struct DryRunCompositor {
    views: RwLock<Option<HashMap<ViewId, ViewSnapshot>>>,
    outputs: Vec<OutputInfo>,
    options: RwLock<Map<String, Value>>,
    calls: Mutex<Vec<CompositorCall>>,
}

impl Default for DryRunCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunCompositor {
    pub fn new() -> Self {
        let output = OutputInfo {
            id: 1,
            name: "DRY-1".to_string(),
            geometry: Geometry::new(0, 0, 1920, 1080),
            workarea: Geometry::new(0, 0, 1920, 1080),
            wset_index: 1,
        };
        Self {
            views: RwLock::new(None),
            outputs: vec![output],
            options: RwLock::new(Map::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_views(self, views: impl IntoIterator<Item = ViewSnapshot>) -> Self {
        *self.views.write() = Some(views.into_iter().map(|view| (view.id, view)).collect());
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<OutputInfo>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_option(self, path: &str, value: Value) -> Self {
        self.options.write().insert(path.to_string(), value);
        self
    }

    /// Эмулировать закрытие окна
    pub fn remove_view(&self, id: ViewId) {
        if let Some(views) = self.views.write().as_mut() {
            views.remove(&id);
        }
    }

    pub fn calls(&self) -> Vec<CompositorCall> {
        self.calls.lock().clone()
    }

    fn lookup(&self, id: ViewId) -> Result<ViewSnapshot> {
        match self.views.read().as_ref() {
            Some(views) => views.get(&id).cloned().ok_or(RulesError::ViewNotFound(id)),
            None => Ok(ViewSnapshot::new(id, "dry-run").with_output("DRY-1").with_geometry(Geometry::new(0, 0, 800, 600))),
        }
    }

    fn record(&self, call: CompositorCall) {
        info!("[DRY RUN] {:?}", call);
        self.calls.lock().push(call);
    }

    fn record_for_view(&self, id: ViewId, call: CompositorCall) -> Result<()> {
        self.lookup(id)?;
        self.record(call);
        Ok(())
    }
}

#[async_trait::async_trait]
impl CompositorClient for DryRunCompositor {
    async fn list_views(&self) -> Result<Vec<ViewSnapshot>> {
        Ok(self
            .views
            .read()
            .as_ref()
            .map(|views| views.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_view(&self, id: ViewId) -> Result<ViewSnapshot> {
        self.lookup(id)
    }

    async fn get_focused_view(&self) -> Result<Option<ViewSnapshot>> {
        let views = self.list_views().await?;
        Ok(views.into_iter().min_by_key(|view| view.id))
    }

    async fn list_outputs(&self) -> Result<Vec<OutputInfo>> {
        Ok(self.outputs.clone())
    }

    async fn get_option_value(&self, path: &str) -> Result<Value> {
        Ok(self.options.read().get(path).cloned().unwrap_or(Value::Null))
    }

    async fn set_option_values(&self, values: Map<String, Value>) -> Result<()> {
        self.options.write().extend(values.clone());
        self.record(CompositorCall::SetOptionValues(values));
        Ok(())
    }

    async fn set_view_fullscreen(&self, id: ViewId, state: bool) -> Result<()> {
        self.record_for_view(id, CompositorCall::SetViewFullscreen(id, state))
    }

    async fn set_view_maximized(&self, id: ViewId) -> Result<()> {
        self.record_for_view(id, CompositorCall::SetViewMaximized(id))
    }

    async fn send_view_to_workspace(&self, id: ViewId, x: i32, y: i32) -> Result<()> {
        self.record_for_view(id, CompositorCall::SendViewToWorkspace(id, x, y))
    }

    async fn send_view_to_wset(&self, id: ViewId, wset_index: u64) -> Result<()> {
        self.record_for_view(id, CompositorCall::SendViewToWset(id, wset_index))
    }

    async fn set_view_alpha(&self, id: ViewId, alpha: f64) -> Result<()> {
        self.record_for_view(id, CompositorCall::SetViewAlpha(id, alpha))
    }

    async fn configure_view(&self, id: ViewId, geometry: Geometry) -> Result<()> {
        self.record_for_view(id, CompositorCall::ConfigureView(id, geometry))
    }

    async fn set_view_minimized(&self, id: ViewId, state: bool) -> Result<()> {
        self.record_for_view(id, CompositorCall::SetViewMinimized(id, state))
    }

    async fn assign_slot(&self, id: ViewId, slot: Slot) -> Result<()> {
        self.record_for_view(id, CompositorCall::AssignSlot(id, slot))
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.record(CompositorCall::PressKey(key.to_string()));
        Ok(())
    }

    async fn move_cursor(&self, x: i32, y: i32) -> Result<()> {
        self.record(CompositorCall::MoveCursor(x, y));
        Ok(())
    }

    async fn click_button(&self, button: &str, mode: ButtonMode) -> Result<()> {
        self.record(CompositorCall::ClickButton(button.to_string(), mode));
        Ok(())
    }

    async fn set_view_focus(&self, id: ViewId) -> Result<()> {
        self.record_for_view(id, CompositorCall::SetViewFocus(id))
    }

    async fn center_view_on_output(&self, id: ViewId) -> Result<()> {
        self.record_for_view(id, CompositorCall::CenterViewOnOutput(id))?;
        center_view(self, id).await
    }

    async fn center_cursor_on_view(&self, id: ViewId) -> Result<()> {
        let view = self.lookup(id)?;
        self.record(CompositorCall::CenterCursorOnView(id));
        let (x, y) = view.geometry.center();
        self.move_cursor(x, y).await
    }
}
