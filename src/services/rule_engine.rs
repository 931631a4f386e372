use crate::config::RulesConfig;
use crate::error::Result;
use crate::events::ViewEvent;
use crate::rules::{Matcher, RuleStore};
use crate::services::compositor::CompositorClient;
use crate::services::dispatcher::ActionDispatcher;
use crate::services::scheduler::TimerScheduler;
use crate::{debug_if_enabled, trace_if_enabled};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{info, warn};

/// Параметры движка из секции `[rules]`
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub reload_on_event: bool,
    pub empty_value_matches_all: bool,
}

impl From<&RulesConfig> for EngineOptions {
    fn from(config: &RulesConfig) -> Self {
        Self {
            reload_on_event: config.reload_on_event,
            empty_value_matches_all: config.empty_value_matches_all,
        }
    }
}

/// Движок правил: единственный владелец диспетчера, очереди таймеров и
/// соединения с компоситором.
///
/// Цикл `run` обрабатывает по одному элементу за раз: либо событие, либо
/// созревшие таймеры. Для одного события все совпавшие правила с
/// `timeout == 0` применяются в порядке списка до чтения следующего события.
pub struct RuleEngine {
    store: Arc<RuleStore>,
    matcher: Matcher,
    dispatcher: ActionDispatcher,
    scheduler: TimerScheduler,
    reload_on_event: bool,
}

impl RuleEngine {
    pub fn new(store: Arc<RuleStore>, compositor: Arc<dyn CompositorClient>, options: EngineOptions) -> Self {
        info!(
            "Инициализация RuleEngine ({} правил, перечитывание: {})",
            store.snapshot().len(),
            options.reload_on_event
        );
        Self {
            store,
            matcher: Matcher::new(options.empty_value_matches_all),
            dispatcher: ActionDispatcher::new(compositor),
            scheduler: TimerScheduler::new(),
            reload_on_event: options.reload_on_event,
        }
    }

    pub async fn run(mut self, mut events: mpsc::Receiver<ViewEvent>) -> Result<()> {
        info!("RuleEngine запущен");

        loop {
            let deadline = self.scheduler.next_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event).await;
                    }
                    None => break,
                },
                _ = wait_until(deadline) => {
                    self.fire_due().await;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Обработать одно событие. Возвращает число совпавших правил.
    pub async fn handle_event(&mut self, event: ViewEvent) -> usize {
        // Граница шины событий: только toplevel view
        let Some(view) = event.view.as_ref() else {
            trace_if_enabled!("Событие {} без view пропущено", event.event);
            return 0;
        };
        if !view.is_toplevel() {
            trace_if_enabled!("Событие {} для view {} с ролью '{}' пропущено", event.event, view.id, view.role);
            return 0;
        }

        if self.reload_on_event {
            if let Err(e) = self.store.refresh() {
                warn!("Не удалось перечитать правила, используем предыдущий список: {}", e);
            }
        }

        debug_if_enabled!(
            "Обработка события: {} (ожидало в очереди {:?})",
            event,
            event.timestamp.elapsed()
        );

        let rules = self.store.snapshot();
        let mut matched = 0;

        for (index, rule) in rules.iter().enumerate() {
            if rule.event != event.event || !self.matcher.matches(rule, view) {
                continue;
            }
            matched += 1;

            let label = rule.label(index);
            if rule.timeout_ms == 0 {
                self.dispatcher.apply(rule, &label, view).await;
            } else {
                let id = self.scheduler.schedule(
                    rule.clone(),
                    label.clone(),
                    view.clone(),
                    Duration::from_millis(rule.timeout_ms),
                );
                debug_if_enabled!(
                    "Правило {} для view {} отложено на {}мс (таймер #{})",
                    label,
                    view.id,
                    rule.timeout_ms,
                    id
                );
            }
        }

        matched
    }

    /// Выполнить все созревшие отложенные действия
    pub async fn fire_due(&mut self) -> usize {
        let due = self.scheduler.pop_due(Instant::now());
        for trigger in &due {
            debug_if_enabled!("Таймер #{} сработал для правила {}", trigger.id, trigger.label);
            self.dispatcher.apply(&trigger.rule, &trigger.label, &trigger.view).await;
        }
        due.len()
    }

    pub fn pending(&self) -> usize {
        self.scheduler.len()
    }

    /// Отменить ожидающие таймеры
    pub fn shutdown(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        if !cancelled.is_empty() {
            info!("Отменено {} отложенных действий", cancelled.len());
            for trigger in &cancelled {
                debug_if_enabled!("Таймер #{} правила {} отменён", trigger.id, trigger.label);
            }
        }
        info!("RuleEngine завершил работу");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventName, Geometry, ViewSnapshot};
    use crate::rules::{Action, MatchKey, Rule};
    use crate::services::compositor::{CompositorCall, DryRunCompositor};

    const OPTIONS: EngineOptions = EngineOptions {
        reload_on_event: true,
        empty_value_matches_all: false,
    };

    fn firefox() -> ViewSnapshot {
        ViewSnapshot::new(7, "Firefox")
            .with_title("Mozilla Firefox")
            .with_output("DRY-1")
            .with_geometry(Geometry::new(0, 0, 800, 600))
    }

    fn engine_with(rules: Vec<Rule>, views: Vec<ViewSnapshot>) -> (RuleEngine, Arc<RuleStore>, Arc<DryRunCompositor>) {
        let store = Arc::new(RuleStore::in_memory(rules));
        let compositor = Arc::new(DryRunCompositor::new().with_views(views));
        let engine = RuleEngine::new(store.clone(), compositor.clone(), OPTIONS);
        (engine, store, compositor)
    }

    fn mapped(view: ViewSnapshot) -> ViewEvent {
        ViewEvent::with_view(EventName::ViewMapped, view)
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_fires_within_the_same_turn() {
        let rule = Rule::new(MatchKey::AppId, "fire", EventName::ViewMapped, Action::Center);
        let (mut engine, _, compositor) = engine_with(vec![rule], vec![firefox()]);

        assert_eq!(engine.handle_event(mapped(firefox())).await, 1);

        let centers: Vec<_> = compositor
            .calls()
            .into_iter()
            .filter(|call| matches!(call, CompositorCall::CenterViewOnOutput(_)))
            .collect();
        assert_eq!(centers, vec![CompositorCall::CenterViewOnOutput(7)]);
        assert_eq!(engine.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_rules_apply_in_list_order() {
        let rules = vec![
            Rule::new(MatchKey::AppId, "firefox", EventName::ViewMapped, Action::Alpha).with_value("0.9"),
            Rule::new(MatchKey::Title, "mozilla", EventName::ViewMapped, Action::SetFocus),
            Rule::new(MatchKey::AppId, "firefox", EventName::ViewFocused, Action::Maximize),
            Rule::new(MatchKey::AppId, "chromium", EventName::ViewMapped, Action::Maximize),
        ];
        let (mut engine, _, compositor) = engine_with(rules, vec![firefox()]);

        assert_eq!(engine.handle_event(mapped(firefox())).await, 2);
        assert_eq!(
            compositor.calls(),
            vec![CompositorCall::SetViewAlpha(7, 0.9), CompositorCall::SetViewFocus(7)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_toplevel_and_missing_views_are_discarded() {
        let rule = Rule::new(MatchKey::AppId, "firefox", EventName::ViewMapped, Action::Maximize);
        let popup = firefox().with_role("popup");
        let (mut engine, _, compositor) = engine_with(vec![rule], vec![popup.clone()]);

        assert_eq!(engine.handle_event(mapped(popup)).await, 0);
        assert_eq!(engine.handle_event(ViewEvent::new(EventName::ViewMapped, None)).await, 0);
        assert!(compositor.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_trigger_ignores_later_rule_edits() {
        let rule = Rule::new(MatchKey::AppId, "firefox", EventName::ViewMapped, Action::Alpha)
            .with_timeout(500)
            .with_value("0.3");
        let (mut engine, store, compositor) = engine_with(vec![rule], vec![firefox()]);

        engine.handle_event(mapped(firefox())).await;
        assert_eq!(engine.pending(), 1);
        assert!(compositor.calls().is_empty());

        store.replace(vec![Rule::new(
            MatchKey::AppId,
            "firefox",
            EventName::ViewMapped,
            Action::Alpha,
        )
        .with_value("1.0")]);

        tokio::time::advance(Duration::from_millis(499)).await;
        assert_eq!(engine.fire_due().await, 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(engine.fire_due().await, 1);
        assert_eq!(compositor.calls(), vec![CompositorCall::SetViewAlpha(7, 0.3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_view_at_fire_time_is_a_noop() {
        let rule = Rule::new(MatchKey::AppId, "firefox", EventName::ViewMapped, Action::Maximize).with_timeout(200);
        let (mut engine, _, compositor) = engine_with(vec![rule], vec![firefox()]);

        engine.handle_event(mapped(firefox())).await;
        compositor.remove_view(7);

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(engine.fire_due().await, 1);
        assert!(compositor.calls().is_empty());
        assert_eq!(engine.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_rule_does_not_affect_others() {
        let rules = vec![
            Rule::new(MatchKey::AppId, "firefox", EventName::ViewMapped, Action::ConfigureView).with_value("1,2"),
            Rule::new(MatchKey::AppId, "firefox", EventName::ViewMapped, Action::SetFocus),
        ];
        let (mut engine, _, compositor) = engine_with(rules, vec![firefox()]);

        assert_eq!(engine.handle_event(mapped(firefox())).await, 2);
        assert_eq!(compositor.calls(), vec![CompositorCall::SetViewFocus(7)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_fires_timers_and_cancels_on_shutdown() {
        let rules = vec![
            Rule::new(MatchKey::AppId, "firefox", EventName::ViewMapped, Action::SetFocus).with_timeout(500),
            Rule::new(MatchKey::AppId, "firefox", EventName::ViewMapped, Action::Maximize).with_timeout(60_000),
        ];
        let (engine, _, compositor) = engine_with(rules, vec![firefox()]);
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(engine.run(rx));

        tx.send(mapped(firefox())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(compositor.calls(), vec![CompositorCall::SetViewFocus(7)]);

        drop(tx);
        handle.await.unwrap().unwrap();
        assert_eq!(compositor.calls().len(), 1);
    }
}
