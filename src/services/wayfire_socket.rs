//! Wayfire IPC framing: every message is a little-endian `u32` length
//! followed by that many bytes of JSON. Requests are `{"method", "data"}`
//! objects; replies are JSON objects, with an `"error"` key on failure.

use crate::config::IpcConfig;
use crate::error::{Result, RulesError};
use crate::events::ViewId;
use crate::{rules_error, trace_if_enabled};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration, Instant};
use tracing::{info, warn};

/// Предел размера одного сообщения
const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

/// Путь к сокету: из конфигурации или из `$WAYFIRE_SOCKET`
pub fn socket_path(config: &IpcConfig) -> Result<PathBuf> {
    if let Some(path) = &config.socket_path {
        return Ok(PathBuf::from(path));
    }
    std::env::var_os("WAYFIRE_SOCKET")
        .map(PathBuf::from)
        .ok_or_else(|| rules_error!(service_unavailable, "WAYFIRE_SOCKET не задан и ipc.socket_path не указан"))
}

pub async fn connect(path: &Path) -> Result<UnixStream> {
    UnixStream::connect(path)
        .await
        .map_err(|e| rules_error!(service_unavailable, "не удалось подключиться к {:?}: {}", path, e))
}

pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> Result<()> {
    let payload = serde_json::to_vec(message)?;
    let len = u32::try_from(payload.len()).map_err(|_| rules_error!(ipc, "сообщение слишком велико"))?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Value> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_MESSAGE_LEN {
        return Err(rules_error!(ipc, "сообщение длиной {} байт превышает предел", len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Проверить ответ компоситора. Ошибка про view превращается в `ViewNotFound`.
pub fn check_reply(reply: Value, view: Option<ViewId>) -> Result<Value> {
    let Some(error) = reply.get("error") else {
        return Ok(reply);
    };
    let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
    match view {
        Some(id) if message.to_lowercase().contains("view") => Err(RulesError::ViewNotFound(id)),
        _ => Err(RulesError::Ipc(message)),
    }
}

/// Соединение запрос/ответ с компоситором.
///
/// Все вызовы сериализуются через мьютекс: на сокете в каждый момент
/// не больше одного запроса. После таймаута или ошибки ввода-вывода поток
/// может содержать чужой или недочитанный ответ, поэтому он закрывается,
/// а следующий вызов подключается заново (не чаще `reconnect_delay`
/// после неудачного подключения).
pub struct WayfireSocket {
    path: PathBuf,
    connection: Mutex<Connection>,
    request_timeout: Duration,
    reconnect_delay: Duration,
}

struct Connection {
    stream: Option<UnixStream>,
    // раньше этого момента переподключение не пробуем
    retry_at: Option<Instant>,
}

impl WayfireSocket {
    pub async fn open(config: &IpcConfig) -> Result<Self> {
        let path = socket_path(config)?;
        let stream = connect(&path).await?;
        info!("Подключено к Wayfire IPC: {:?}", path);
        Ok(Self {
            path,
            connection: Mutex::new(Connection {
                stream: Some(stream),
                retry_at: None,
            }),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        })
    }

    /// Выполнить метод IPC. `view` нужен только для классификации ошибок.
    pub async fn call(&self, method: &str, data: Value, view: Option<ViewId>) -> Result<Value> {
        let request = json!({ "method": method, "data": data });
        trace_if_enabled!("IPC -> {}", request);

        let mut connection = self.connection.lock().await;
        let stream = self.ensure_connected(&mut connection).await?;

        let exchange = timeout(self.request_timeout, async {
            write_message(&mut *stream, &request).await?;
            read_message(&mut *stream).await
        })
        .await;

        let reply = match exchange {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Ошибка обмена с Wayfire на {}: {}. Соединение будет открыто заново", method, e);
                connection.stream = None;
                return Err(e);
            }
            Err(_) => {
                warn!("Таймаут ответа на {}, соединение с Wayfire сброшено", method);
                connection.stream = None;
                return Err(rules_error!(ipc, "таймаут ответа на {}", method));
            }
        };

        trace_if_enabled!("IPC <- {}", reply);
        check_reply(reply, view)
    }

    async fn ensure_connected<'a>(&self, connection: &'a mut Connection) -> Result<&'a mut UnixStream> {
        if connection.stream.is_none() {
            if let Some(retry_at) = connection.retry_at {
                if Instant::now() < retry_at {
                    return Err(rules_error!(
                        service_unavailable,
                        "Wayfire IPC недоступен, повтор подключения к {:?} позже",
                        self.path
                    ));
                }
            }

            match connect(&self.path).await {
                Ok(stream) => {
                    info!("Переподключено к Wayfire IPC: {:?}", self.path);
                    connection.stream = Some(stream);
                    connection.retry_at = None;
                }
                Err(e) => {
                    connection.retry_at = Some(Instant::now() + self.reconnect_delay);
                    return Err(e);
                }
            }
        }

        connection
            .stream
            .as_mut()
            .ok_or_else(|| rules_error!(service_unavailable, "нет соединения с {:?}", self.path))
    }
}
