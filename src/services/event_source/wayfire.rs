use crate::config::Config;
use crate::error::Result;
use crate::events::{EventName, ViewEvent, ViewSnapshot};
use crate::services::wayfire_socket::{self, check_reply, read_message, write_message};
use crate::{debug_if_enabled, trace_if_enabled};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use super::r#trait::EventSource;

/// Подписка на события через `window-rules/events/watch`
pub struct WayfireEventSource {
    socket_path: PathBuf,
    reconnect_delay: Duration,
}

/// Почему завершилась одна сессия наблюдения
enum SessionEnd {
    SinkClosed,
    Disconnected,
}

impl WayfireEventSource {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        info!("Инициализация WayfireEventSource");
        Ok(Self {
            socket_path: wayfire_socket::socket_path(&config.ipc)?,
            reconnect_delay: Duration::from_millis(config.ipc.reconnect_delay_ms),
        })
    }

    async fn run_impl(self, sink: mpsc::Sender<ViewEvent>) -> Result<()> {
        loop {
            match self.watch(&sink).await {
                Ok(SessionEnd::SinkClosed) => {
                    info!("Получатель событий закрыт, WayfireEventSource завершает работу");
                    return Ok(());
                }
                Ok(SessionEnd::Disconnected) => {
                    warn!("Соединение с Wayfire закрыто, переподключение через {:?}", self.reconnect_delay);
                }
                Err(e) => {
                    error!("Ошибка подписки на события Wayfire: {}. Повтор через {:?}", e, self.reconnect_delay);
                }
            }

            if sink.is_closed() {
                return Ok(());
            }
            sleep(self.reconnect_delay).await;
        }
    }

    async fn watch(&self, sink: &mpsc::Sender<ViewEvent>) -> Result<SessionEnd> {
        let mut stream = wayfire_socket::connect(&self.socket_path).await?;

        let events: Vec<&str> = EventName::ALL.iter().map(|event| event.as_str()).collect();
        let request = json!({ "method": "window-rules/events/watch", "data": { "events": events } });
        write_message(&mut stream, &request).await?;
        check_reply(read_message(&mut stream).await?, None)?;
        info!("Подписка на {} событий view активна", events.len());

        loop {
            let message = match read_message(&mut stream).await {
                Ok(message) => message,
                Err(e) => {
                    debug_if_enabled!("Чтение события прервано: {}", e);
                    return Ok(SessionEnd::Disconnected);
                }
            };

            let Some(event) = parse_event(&message) else {
                continue;
            };

            if sink.send(event).await.is_err() {
                return Ok(SessionEnd::SinkClosed);
            }
        }
    }
}

/// Разобрать сообщение события; чужие события и мусор пропускаются
pub(super) fn parse_event(message: &Value) -> Option<ViewEvent> {
    let name = message.get("event")?.as_str()?;
    let event: EventName = match name.parse() {
        Ok(event) => event,
        Err(_) => {
            trace_if_enabled!("Пропуск события без подписки: {}", name);
            return None;
        }
    };

    let view = match message.get("view") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<ViewSnapshot>(raw.clone()) {
            Ok(view) => Some(view),
            Err(e) => {
                warn!("Не удалось разобрать view в событии {}: {}", name, e);
                None
            }
        },
    };

    Some(ViewEvent::new(event, view))
}

#[async_trait::async_trait]
impl EventSource for WayfireEventSource {
    async fn run(self: Box<Self>, sink: mpsc::Sender<ViewEvent>) -> Result<()> {
        (*self).run_impl(sink).await
    }
}
