use crate::debug_if_enabled;
use crate::error::{Result, RulesError};
use crate::events::{ViewId, ViewSnapshot};
use crate::rules::{ActionCommand, Rule};
use crate::services::compositor::CompositorClient;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Итог применения одного правила
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    /// Действие не определено для view с ролью не toplevel
    RoleRefused,
    InvalidValue,
    /// View исчез до выполнения действия
    ViewGone,
    Failed,
}

/// Разбирает значение правила и вызывает соответствующую команду компоситора.
///
/// Никакая ошибка не выходит наружу: худший исход для правила: действие
/// не выполнено, остальные правила это не затрагивает.
pub struct ActionDispatcher {
    compositor: Arc<dyn CompositorClient>,
}

impl ActionDispatcher {
    pub fn new(compositor: Arc<dyn CompositorClient>) -> Self {
        Self { compositor }
    }

    pub async fn apply(&self, rule: &Rule, label: &str, view: &ViewSnapshot) -> DispatchOutcome {
        // Повторная проверка роли: снимок мог устареть
        if rule.action.requires_toplevel() && !view.is_toplevel() {
            debug_if_enabled!(
                "Правило {}: {} пропущено для view {} с ролью '{}'",
                label,
                rule.action,
                view.id,
                view.role
            );
            return DispatchOutcome::RoleRefused;
        }

        let command = match ActionCommand::parse(rule.action, &rule.value) {
            Ok(command) => command,
            Err(e) => {
                warn!("Правило {} пропущено: {}", label, e);
                return DispatchOutcome::InvalidValue;
            }
        };

        info!(
            "[Правило сработало] {} view: {} ({}) действие: {}",
            label, view.id, view.app_id, rule.action
        );

        match self.execute(&command, view.id).await {
            Ok(()) => DispatchOutcome::Applied,
            Err(e) if e.is_stale_view() => {
                warn!("Правило {}: view {} уже закрыт, действие {} не выполнено", label, view.id, rule.action);
                DispatchOutcome::ViewGone
            }
            Err(e @ RulesError::UnknownVariant { .. }) => {
                warn!("Правило {}: {}", label, e);
                DispatchOutcome::Failed
            }
            Err(e) => {
                error!("Не удалось выполнить действие {} правила {}: {}", rule.action, label, e);
                DispatchOutcome::Failed
            }
        }
    }

    async fn execute(&self, command: &ActionCommand, id: ViewId) -> Result<()> {
        let compositor = &self.compositor;
        match command {
            ActionCommand::Fullscreen(state) => compositor.set_view_fullscreen(id, *state).await,
            ActionCommand::Center => compositor.center_view_on_output(id).await,
            ActionCommand::Maximize => compositor.set_view_maximized(id).await,
            ActionCommand::MoveToOutput(name) => {
                let outputs = compositor.list_outputs().await?;
                let output = outputs
                    .iter()
                    .find(|output| &output.name == name)
                    .ok_or_else(|| RulesError::UnknownVariant {
                        kind: "output",
                        value: name.clone(),
                    })?;
                compositor.send_view_to_wset(id, output.wset_index).await
            }
            ActionCommand::SendToWorkspace { x, y } => compositor.send_view_to_workspace(id, *x, *y).await,
            ActionCommand::Alpha(alpha) => compositor.set_view_alpha(id, *alpha).await,
            ActionCommand::ConfigureView(geometry) => compositor.configure_view(id, *geometry).await,
            ActionCommand::SetMinimized(state) => compositor.set_view_minimized(id, *state).await,
            ActionCommand::CenterCursor => compositor.center_cursor_on_view(id).await,
            ActionCommand::AssignSlot(slot) => compositor.assign_slot(id, *slot).await,
            ActionCommand::PressKey(key) => compositor.press_key(key).await,
            ActionCommand::MoveCursor { x, y } => compositor.move_cursor(*x, *y).await,
            ActionCommand::ClickButton { button, mode } => compositor.click_button(button, *mode).await,
            ActionCommand::SetFocus => compositor.set_view_focus(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventName, Geometry, OutputInfo};
    use crate::rules::action::{ButtonMode, Slot};
    use crate::rules::{Action, MatchKey};
    use crate::services::compositor::{CompositorCall, DryRunCompositor};

    fn rule(action: Action, value: &str) -> Rule {
        Rule::new(MatchKey::AppId, "app", EventName::ViewMapped, action).with_value(value)
    }

    fn view(id: ViewId) -> ViewSnapshot {
        ViewSnapshot::new(id, "app")
            .with_output("DRY-1")
            .with_geometry(Geometry::new(0, 0, 640, 480))
    }

    fn setup() -> (Arc<DryRunCompositor>, ActionDispatcher) {
        let compositor = Arc::new(DryRunCompositor::new().with_views([view(1), view(2).with_role("popup")]));
        let dispatcher = ActionDispatcher::new(compositor.clone());
        (compositor, dispatcher)
    }

    #[tokio::test]
    async fn test_each_action_reaches_the_compositor() {
        let (compositor, dispatcher) = setup();
        let target = view(1);
        let cases = [
            (rule(Action::Fullscreen, "true"), CompositorCall::SetViewFullscreen(1, true)),
            (rule(Action::Maximize, ""), CompositorCall::SetViewMaximized(1)),
            (rule(Action::SendToWorkspace, "2,1"), CompositorCall::SendViewToWorkspace(1, 2, 1)),
            (rule(Action::Alpha, "0.5"), CompositorCall::SetViewAlpha(1, 0.5)),
            (
                rule(Action::ConfigureView, "10,20,300,200"),
                CompositorCall::ConfigureView(1, Geometry::new(10, 20, 300, 200)),
            ),
            (rule(Action::SetMinimized, "false"), CompositorCall::SetViewMinimized(1, false)),
            (rule(Action::AssignSlot, "slot_br"), CompositorCall::AssignSlot(1, Slot::BottomRight)),
            (rule(Action::PressKey, "KEY_F11"), CompositorCall::PressKey("KEY_F11".into())),
            (rule(Action::MoveCursor, "5,6"), CompositorCall::MoveCursor(5, 6)),
            (
                rule(Action::ClickButton, "BTN_RIGHT,press"),
                CompositorCall::ClickButton("BTN_RIGHT".into(), ButtonMode::Press),
            ),
            (rule(Action::SetFocus, ""), CompositorCall::SetViewFocus(1)),
        ];

        for (index, (rule, expected)) in cases.iter().enumerate() {
            assert_eq!(dispatcher.apply(rule, "test", &target).await, DispatchOutcome::Applied);
            assert_eq!(compositor.calls()[index], *expected);
        }
    }

    #[tokio::test]
    async fn test_center_and_center_cursor() {
        let (compositor, dispatcher) = setup();

        dispatcher.apply(&rule(Action::Center, ""), "c", &view(1)).await;
        dispatcher.apply(&rule(Action::CenterCursor, ""), "cc", &view(1)).await;

        let calls = compositor.calls();
        assert_eq!(calls[0], CompositorCall::CenterViewOnOutput(1));
        assert!(calls.contains(&CompositorCall::CenterCursorOnView(1)));
        assert!(calls.contains(&CompositorCall::MoveCursor(320, 240)));
    }

    #[tokio::test]
    async fn test_move_to_output_resolves_wset() {
        let compositor = Arc::new(DryRunCompositor::new().with_views([view(1)]).with_outputs(vec![
            OutputInfo {
                id: 1,
                name: "DP-1".into(),
                geometry: Geometry::new(0, 0, 1920, 1080),
                workarea: Geometry::new(0, 0, 1920, 1080),
                wset_index: 1,
            },
            OutputInfo {
                id: 2,
                name: "HDMI-A-1".into(),
                geometry: Geometry::new(1920, 0, 1920, 1080),
                workarea: Geometry::new(1920, 0, 1920, 1080),
                wset_index: 2,
            },
        ]));
        let dispatcher = ActionDispatcher::new(compositor.clone());

        assert_eq!(
            dispatcher.apply(&rule(Action::MoveToOutput, "HDMI-A-1"), "m", &view(1)).await,
            DispatchOutcome::Applied
        );
        assert_eq!(compositor.calls(), vec![CompositorCall::SendViewToWset(1, 2)]);

        assert_eq!(
            dispatcher.apply(&rule(Action::MoveToOutput, "VGA-0"), "m", &view(1)).await,
            DispatchOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_role_guard_refuses_geometry_actions() {
        let (compositor, dispatcher) = setup();
        let popup = view(2).with_role("popup");

        for action in [Action::Maximize, Action::Fullscreen, Action::SetMinimized, Action::ConfigureView] {
            let outcome = dispatcher.apply(&rule(action, "true"), "guard", &popup).await;
            assert_eq!(outcome, DispatchOutcome::RoleRefused);
        }
        assert!(compositor.calls().is_empty());

        // Действия без ограничения роли выполняются
        assert_eq!(
            dispatcher.apply(&rule(Action::SetFocus, ""), "focus", &popup).await,
            DispatchOutcome::Applied
        );
    }

    #[tokio::test]
    async fn test_malformed_value_is_a_noop() {
        let (compositor, dispatcher) = setup();

        let outcome = dispatcher.apply(&rule(Action::ConfigureView, "1,2,3"), "bad", &view(1)).await;
        assert_eq!(outcome, DispatchOutcome::InvalidValue);
        let outcome = dispatcher.apply(&rule(Action::Alpha, "transparent"), "bad", &view(1)).await;
        assert_eq!(outcome, DispatchOutcome::InvalidValue);
        assert!(compositor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stale_view_is_reported_softly() {
        let (compositor, dispatcher) = setup();
        compositor.remove_view(1);

        let outcome = dispatcher.apply(&rule(Action::Maximize, ""), "late", &view(1)).await;
        assert_eq!(outcome, DispatchOutcome::ViewGone);
        assert!(compositor.calls().is_empty());
    }
}
