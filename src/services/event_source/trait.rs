use crate::config::Config;
use crate::error::Result;
use crate::events::ViewEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Источник событий view (шина событий компоситора).
///
/// Реализация подписывается на все `EventName::ALL` ровно один раз и
/// пересылает события в `sink`, пока получатель жив.
#[async_trait::async_trait]
pub trait EventSource {
    /// Run the event source
    async fn run(self: Box<Self>, sink: mpsc::Sender<ViewEvent>) -> Result<()>;
}

/// Factory function to create an appropriate event source based on the dry_run flag
pub fn create_event_source(config: Arc<Config>, dry_run: bool) -> Result<Box<dyn EventSource + Send>> {
    if dry_run {
        Ok(Box::new(super::dry_run::DryRunEventSource::new()))
    } else {
        Ok(Box::new(super::wayfire::WayfireEventSource::new(config)?))
    }
}
