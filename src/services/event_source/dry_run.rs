use crate::error::Result;
use crate::events::{EventName, Geometry, ViewEvent, ViewSnapshot};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::info;

use super::r#trait::EventSource;

const FAKE_APPS: [(&str, &str); 4] = [
    ("kitty", "Terminal - dry_run"),
    ("firefox", "Browser - dry_run"),
    ("code", "Editor - dry_run"),
    ("steam_app_0", "Game - dry_run"),
];

pub struct DryRunEventSource {
    period: Duration,
}

impl DryRunEventSource {
    pub fn new() -> Self {
        Self {
            period: Duration::from_secs(10),
        }
    }

    async fn run_impl(self, sink: mpsc::Sender<ViewEvent>) -> Result<()> {
        info!("Dry-run режим - источник событий работает в режиме эмуляции");

        let mut ticker = interval(self.period);
        let mut next_id = 1;

        loop {
            ticker.tick().await;

            let (app_id, title) = FAKE_APPS[(next_id as usize - 1) % FAKE_APPS.len()];
            let view = ViewSnapshot::new(next_id, app_id)
                .with_title(title)
                .with_output("DRY-1")
                .with_geometry(Geometry::new(0, 0, 800, 600));
            next_id += 1;

            info!("Dry-run: эмулируем появление окна {}", view);
            for event in [EventName::ViewMapped, EventName::ViewFocused] {
                if sink.send(ViewEvent::with_view(event, view.clone())).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl EventSource for DryRunEventSource {
    async fn run(self: Box<Self>, sink: mpsc::Sender<ViewEvent>) -> Result<()> {
        (*self).run_impl(sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_emits_mapped_then_focused() {
        let (tx, mut rx) = mpsc::channel(8);
        let source = Box::new(DryRunEventSource::new());
        let handle = tokio::spawn(source.run(tx));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event, EventName::ViewMapped);
        assert_eq!(second.event, EventName::ViewFocused);
        assert_eq!(first.view, second.view);
        assert_eq!(first.view.unwrap().app_id, "kitty");

        drop(rx);
        handle.await.unwrap().unwrap();
    }
}
