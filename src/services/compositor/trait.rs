use crate::config::Config;
use crate::error::{Result, RulesError};
use crate::events::{Geometry, OutputInfo, ViewId, ViewSnapshot};
use crate::rules::action::{ButtonMode, Slot};
use serde_json::{Map, Value};
use std::sync::Arc;

/// IPC-фасад компоситора: запросы view/output и команды изменения.
///
/// Вызовы против исчезнувшего view возвращают `RulesError::ViewNotFound`,
/// это штатный исход для отложенных действий.
#[async_trait::async_trait]
pub trait CompositorClient: Send + Sync {
    async fn list_views(&self) -> Result<Vec<ViewSnapshot>>;
    async fn get_view(&self, id: ViewId) -> Result<ViewSnapshot>;
    async fn get_focused_view(&self) -> Result<Option<ViewSnapshot>>;
    async fn list_outputs(&self) -> Result<Vec<OutputInfo>>;
    async fn get_option_value(&self, path: &str) -> Result<Value>;
    async fn set_option_values(&self, values: Map<String, Value>) -> Result<()>;

    async fn set_view_fullscreen(&self, id: ViewId, state: bool) -> Result<()>;
    async fn set_view_maximized(&self, id: ViewId) -> Result<()>;
    async fn send_view_to_workspace(&self, id: ViewId, x: i32, y: i32) -> Result<()>;
    async fn send_view_to_wset(&self, id: ViewId, wset_index: u64) -> Result<()>;
    async fn set_view_alpha(&self, id: ViewId, alpha: f64) -> Result<()>;
    async fn configure_view(&self, id: ViewId, geometry: Geometry) -> Result<()>;
    async fn set_view_minimized(&self, id: ViewId, state: bool) -> Result<()>;
    async fn assign_slot(&self, id: ViewId, slot: Slot) -> Result<()>;
    async fn press_key(&self, key: &str) -> Result<()>;
    async fn move_cursor(&self, x: i32, y: i32) -> Result<()>;
    async fn click_button(&self, button: &str, mode: ButtonMode) -> Result<()>;
    async fn set_view_focus(&self, id: ViewId) -> Result<()>;

    /// Центрировать view в рабочей области его output
    async fn center_view_on_output(&self, id: ViewId) -> Result<()> {
        center_view(self, id).await
    }

    /// Переместить курсор в центр view
    async fn center_cursor_on_view(&self, id: ViewId) -> Result<()> {
        let view = self.get_view(id).await?;
        let (x, y) = view.geometry.center();
        self.move_cursor(x, y).await
    }
}

/// Центрирование поверх запроса геометрии и `configure_view`
pub async fn center_view<C: CompositorClient + ?Sized>(client: &C, id: ViewId) -> Result<()> {
    let view = client.get_view(id).await?;
    let outputs = client.list_outputs().await?;
    let output = outputs
        .iter()
        .find(|output| output.name == view.output_name)
        .ok_or_else(|| RulesError::Ipc(format!("output '{}' для view {} не найден", view.output_name, id)))?;

    let area = if output.workarea.width > 0 && output.workarea.height > 0 {
        output.workarea
    } else {
        output.geometry
    };
    client.configure_view(id, area.centered(&view.geometry)).await
}

/// Factory: настоящий Wayfire IPC или dry-run эмуляция
pub async fn create_compositor(config: &Config, dry_run: bool) -> Result<Arc<dyn CompositorClient>> {
    if dry_run {
        Ok(Arc::new(super::dry_run::DryRunCompositor::new()))
    } else {
        Ok(Arc::new(super::wayfire::WayfireCompositor::connect(&config.ipc).await?))
    }
}
