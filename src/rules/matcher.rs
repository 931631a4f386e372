use super::{MatchKey, Rule};
use crate::events::ViewSnapshot;

/// Сопоставление правила со снимком view.
///
/// Чистая функция без побочных эффектов, все сравнения без учёта регистра:
/// - `app-id`, `title`: вхождение подстроки;
/// - `output-name`, `type`, `role`: точное равенство;
/// - `parent`: равенство с классификацией view ("Main Window" / "Dialog or Popup").
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    /// Пустой `match_value` для подстрочных ключей совпадает с любым view
    empty_value_matches_all: bool,
}

impl Matcher {
    pub fn new(empty_value_matches_all: bool) -> Self {
        Self {
            empty_value_matches_all,
        }
    }

    pub fn matches(&self, rule: &Rule, view: &ViewSnapshot) -> bool {
        let expected = rule.match_value.as_str();

        match rule.match_key {
            MatchKey::AppId => self.contains(&view.app_id, expected),
            MatchKey::Title => self.contains(&view.title, expected),
            MatchKey::OutputName => equals(&view.output_name, expected),
            MatchKey::Type => equals(&view.view_type, expected),
            MatchKey::Role => equals(&view.role, expected),
            MatchKey::Parent => equals(view.parent_kind().as_str(), expected),
        }
    }

    fn contains(&self, haystack: &str, needle: &str) -> bool {
        if needle.is_empty() {
            return self.empty_value_matches_all;
        }
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

fn equals(actual: &str, expected: &str) -> bool {
    actual.to_lowercase() == expected.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventName;
    use crate::rules::Action;

    fn rule(key: MatchKey, value: &str) -> Rule {
        Rule::new(key, value, EventName::ViewMapped, Action::Center)
    }

    #[test]
    fn test_app_id_substring_case_insensitive() {
        let matcher = Matcher::default();
        let view = ViewSnapshot::new(1, "Firefox");

        assert!(matcher.matches(&rule(MatchKey::AppId, "fire"), &view));
        assert!(matcher.matches(&rule(MatchKey::AppId, "FOX"), &view));
        assert!(!matcher.matches(&rule(MatchKey::AppId, "chrom"), &view));
    }

    #[test]
    fn test_title_substring() {
        let matcher = Matcher::default();
        let view = ViewSnapshot::new(1, "code").with_title("main.rs - Visual Studio Code");

        assert!(matcher.matches(&rule(MatchKey::Title, "visual studio"), &view));
        assert!(!matcher.matches(&rule(MatchKey::Title, "emacs"), &view));
    }

    #[test]
    fn test_exact_keys_do_not_match_substrings() {
        let matcher = Matcher::default();
        let view = ViewSnapshot::new(1, "app").with_role("popup").with_output("DP-1");

        assert!(!matcher.matches(&rule(MatchKey::Role, "Toplevel"), &view));
        assert!(matcher.matches(&rule(MatchKey::Role, "POPUP"), &view));
        assert!(matcher.matches(&rule(MatchKey::OutputName, "dp-1"), &view));
        assert!(!matcher.matches(&rule(MatchKey::OutputName, "DP"), &view));
    }

    #[test]
    fn test_type_key() {
        let matcher = Matcher::default();
        let view = ViewSnapshot::new(1, "waybar").with_type("panel");

        assert!(matcher.matches(&rule(MatchKey::Type, "panel"), &view));
        assert!(!matcher.matches(&rule(MatchKey::Type, "toplevel"), &view));
    }

    #[test]
    fn test_parent_classification() {
        let matcher = Matcher::default();
        let main = ViewSnapshot::new(1, "gimp").with_parent(-1);
        let dialog = ViewSnapshot::new(2, "gimp").with_parent(7);
        let main_rule = rule(MatchKey::Parent, "Main Window");
        let dialog_rule = rule(MatchKey::Parent, "Dialog or Popup");

        assert!(matcher.matches(&main_rule, &main));
        assert!(!matcher.matches(&main_rule, &dialog));
        assert!(matcher.matches(&dialog_rule, &dialog));
        assert!(!matcher.matches(&dialog_rule, &main));
        assert!(!matcher.matches(&rule(MatchKey::Parent, "Orphan"), &main));
    }

    #[test]
    fn test_empty_value_policy() {
        let view = ViewSnapshot::new(1, "anything").with_title("Any title");
        let empty_app_id = rule(MatchKey::AppId, "");
        let empty_title = rule(MatchKey::Title, "");

        let strict = Matcher::default();
        assert!(!strict.matches(&empty_app_id, &view));
        assert!(!strict.matches(&empty_title, &view));

        let permissive = Matcher::new(true);
        assert!(permissive.matches(&empty_app_id, &view));
        assert!(permissive.matches(&empty_title, &view));
    }

    #[test]
    fn test_unknown_match_key_never_reaches_matcher() {
        // Неизвестный ключ отбрасывается при разборе записи, совпадать нечему
        let raw = r#"{"match_key": "bogus", "match_value": "x", "event": "view-mapped", "action": "center"}"#;
        assert!(serde_json::from_str::<Rule>(raw).is_err());
    }
}
