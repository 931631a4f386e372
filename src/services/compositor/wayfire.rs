use crate::config::IpcConfig;
use crate::debug_if_enabled;
use crate::error::{Result, RulesError};
use crate::events::{Geometry, OutputInfo, ViewId, ViewSnapshot};
use crate::rules::action::{ButtonMode, Slot};
use crate::services::wayfire_socket::WayfireSocket;
use serde_json::{json, Map, Value};
use tracing::info;

use super::r#trait::CompositorClient;

/// Клиент Wayfire IPC (плагины ipc, ipc-rules, stipc, wm-actions, grid, alpha, wsets)
pub struct WayfireCompositor {
    socket: WayfireSocket,
}

impl WayfireCompositor {
    pub async fn connect(config: &IpcConfig) -> Result<Self> {
        info!("Инициализация WayfireCompositor");
        Ok(Self {
            socket: WayfireSocket::open(config).await?,
        })
    }

    async fn command(&self, method: &str, data: Value, view: Option<ViewId>) -> Result<()> {
        debug_if_enabled!("Команда компоситору: {} {}", method, data);
        self.socket.call(method, data, view).await.map(|_| ())
    }
}

/// Ответы вида `{"info": {...}}` и пустой `info` для отсутствующего view
fn view_from_info(reply: Value, id: Option<ViewId>) -> Result<Option<ViewSnapshot>> {
    match reply.get("info") {
        Some(Value::Null) | None => match id {
            Some(id) => Err(RulesError::ViewNotFound(id)),
            None => Ok(None),
        },
        Some(info) => Ok(Some(serde_json::from_value(info.clone())?)),
    }
}

fn button_mode(mode: ButtonMode) -> &'static str {
    match mode {
        ButtonMode::Press => "press",
        ButtonMode::Release => "release",
        ButtonMode::Click => "full",
    }
}

#[async_trait::async_trait]
impl CompositorClient for WayfireCompositor {
    async fn list_views(&self) -> Result<Vec<ViewSnapshot>> {
        let reply = self.socket.call("window-rules/list-views", json!({}), None).await?;
        Ok(serde_json::from_value(reply)?)
    }

    async fn get_view(&self, id: ViewId) -> Result<ViewSnapshot> {
        let reply = self
            .socket
            .call("window-rules/view-info", json!({ "id": id }), Some(id))
            .await?;
        view_from_info(reply, Some(id))?.ok_or(RulesError::ViewNotFound(id))
    }

    async fn get_focused_view(&self) -> Result<Option<ViewSnapshot>> {
        let reply = self.socket.call("window-rules/get-focused-view", json!({}), None).await?;
        view_from_info(reply, None)
    }

    async fn list_outputs(&self) -> Result<Vec<OutputInfo>> {
        let reply = self.socket.call("window-rules/list-outputs", json!({}), None).await?;
        Ok(serde_json::from_value(reply)?)
    }

    async fn get_option_value(&self, path: &str) -> Result<Value> {
        let reply = self
            .socket
            .call("wayfire/get-config-option", json!({ "option": path }), None)
            .await?;
        Ok(reply.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn set_option_values(&self, values: Map<String, Value>) -> Result<()> {
        self.command("wayfire/set-config-options", Value::Object(values), None).await
    }

    async fn set_view_fullscreen(&self, id: ViewId, state: bool) -> Result<()> {
        self.command("wm-actions/set-fullscreen", json!({ "view_id": id, "state": state }), Some(id))
            .await
    }

    async fn set_view_maximized(&self, id: ViewId) -> Result<()> {
        self.assign_slot(id, Slot::Center).await
    }

    async fn send_view_to_workspace(&self, id: ViewId, x: i32, y: i32) -> Result<()> {
        self.command("vswitch/send-view", json!({ "view-id": id, "x": x, "y": y }), Some(id))
            .await
    }

    async fn send_view_to_wset(&self, id: ViewId, wset_index: u64) -> Result<()> {
        self.command(
            "wsets/send-view-to-wset",
            json!({ "view-id": id, "wset-index": wset_index }),
            Some(id),
        )
        .await
    }

    async fn set_view_alpha(&self, id: ViewId, alpha: f64) -> Result<()> {
        self.command("wf/alpha/set-view-alpha", json!({ "view-id": id, "alpha": alpha }), Some(id))
            .await
    }

    async fn configure_view(&self, id: ViewId, geometry: Geometry) -> Result<()> {
        self.command(
            "window-rules/configure-view",
            json!({ "id": id, "geometry": geometry }),
            Some(id),
        )
        .await
    }

    async fn set_view_minimized(&self, id: ViewId, state: bool) -> Result<()> {
        self.command("wm-actions/set-minimized", json!({ "view_id": id, "state": state }), Some(id))
            .await
    }

    async fn assign_slot(&self, id: ViewId, slot: Slot) -> Result<()> {
        let method = format!("grid/{}", slot.token());
        self.command(&method, json!({ "view_id": id }), Some(id)).await
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.command("stipc/feed_key", json!({ "key": key, "state": true }), None).await?;
        self.command("stipc/feed_key", json!({ "key": key, "state": false }), None).await
    }

    async fn move_cursor(&self, x: i32, y: i32) -> Result<()> {
        self.command("stipc/move_cursor", json!({ "x": x, "y": y }), None).await
    }

    async fn click_button(&self, button: &str, mode: ButtonMode) -> Result<()> {
        self.command(
            "stipc/feed_button",
            json!({ "button": button, "mode": button_mode(mode) }),
            None,
        )
        .await
    }

    async fn set_view_focus(&self, id: ViewId) -> Result<()> {
        self.command("window-rules/focus-view", json!({ "id": id }), Some(id)).await
    }
}
