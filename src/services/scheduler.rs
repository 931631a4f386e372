use crate::events::ViewSnapshot;
use crate::rules::Rule;
use std::collections::BTreeMap;
use tokio::time::{Duration, Instant};

pub type TriggerId = u64;

/// Состояние отложенного срабатывания: `Pending -> Fired` или `Pending -> Cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Pending,
    Fired,
    Cancelled,
}

/// Запись об отложенном действии.
///
/// Правило и снимок view захвачены по значению: последующие изменения
/// списка правил на уже запланированное срабатывание не влияют.
#[derive(Debug, Clone)]
pub struct ScheduledTrigger {
    pub id: TriggerId,
    pub rule: Rule,
    pub label: String,
    pub view: ViewSnapshot,
    pub deadline: Instant,
    state: TriggerState,
}

impl ScheduledTrigger {
    pub fn state(&self) -> TriggerState {
        self.state
    }
}

/// Очередь отложенных срабатываний, упорядоченная по (deadline, id).
///
/// Сам ничего не ждёт: владелец цикла спрашивает `next_deadline` и забирает
/// созревшие записи через `pop_due`.
#[derive(Debug, Default)]
pub struct TimerScheduler {
    queue: BTreeMap<(Instant, TriggerId), ScheduledTrigger>,
    next_id: TriggerId,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, rule: Rule, label: String, view: ViewSnapshot, delay: Duration) -> TriggerId {
        let id = self.next_id;
        self.next_id += 1;

        let deadline = Instant::now() + delay;
        self.queue.insert(
            (deadline, id),
            ScheduledTrigger {
                id,
                rule,
                label,
                view,
                deadline,
                state: TriggerState::Pending,
            },
        );
        id
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Забрать все записи со сроком `<= now` в порядке срабатывания
    pub fn pop_due(&mut self, now: Instant) -> Vec<ScheduledTrigger> {
        let mut due = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let mut trigger = entry.remove();
            trigger.state = TriggerState::Fired;
            due.push(trigger);
        }
        due
    }

    /// Отменить все ожидающие записи (остановка сервиса)
    pub fn cancel_all(&mut self) -> Vec<ScheduledTrigger> {
        std::mem::take(&mut self.queue)
            .into_values()
            .map(|mut trigger| {
                trigger.state = TriggerState::Cancelled;
                trigger
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventName;
    use crate::rules::{Action, MatchKey};

    fn rule(name: &str) -> Rule {
        Rule::new(MatchKey::AppId, "app", EventName::ViewMapped, Action::Center).with_name(name)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_due_respects_deadlines_and_order() {
        let mut scheduler = TimerScheduler::new();
        let view = ViewSnapshot::new(1, "app");

        scheduler.schedule(rule("late"), "late".into(), view.clone(), Duration::from_millis(300));
        scheduler.schedule(rule("early"), "early".into(), view.clone(), Duration::from_millis(100));
        scheduler.schedule(rule("tie"), "tie".into(), view, Duration::from_millis(100));

        assert_eq!(scheduler.next_deadline(), Some(Instant::now() + Duration::from_millis(100)));
        assert!(scheduler.pop_due(Instant::now()).is_empty());

        tokio::time::advance(Duration::from_millis(150)).await;
        let due = scheduler.pop_due(Instant::now());
        let labels: Vec<&str> = due.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["early", "tie"]);
        assert!(due.iter().all(|t| t.state() == TriggerState::Fired));
        assert_eq!(scheduler.len(), 1);

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(scheduler.pop_due(Instant::now()).len(), 1);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_marks_pending_as_cancelled() {
        let mut scheduler = TimerScheduler::new();
        let view = ViewSnapshot::new(1, "app");
        scheduler.schedule(rule("a"), "a".into(), view.clone(), Duration::from_secs(1));
        scheduler.schedule(rule("b"), "b".into(), view, Duration::from_secs(2));

        let cancelled = scheduler.cancel_all();
        assert_eq!(cancelled.len(), 2);
        assert!(cancelled.iter().all(|t| t.state() == TriggerState::Cancelled));
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_keeps_its_own_rule_copy() {
        let mut scheduler = TimerScheduler::new();
        let mut original = rule("original").with_value("0.3");
        scheduler.schedule(original.clone(), "original".into(), ViewSnapshot::new(1, "app"), Duration::from_millis(10));

        original.value = "0.9".into();
        tokio::time::advance(Duration::from_millis(10)).await;

        let due = scheduler.pop_due(Instant::now());
        assert_eq!(due[0].rule.value, "0.3");
    }
}
