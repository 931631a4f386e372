use super::{Rule, MatchKey};
use crate::error::{Result, RulesError};
use crate::{debug_if_enabled, rules_error};
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

/// Хранилище списка правил.
///
/// Во время оценки события движок берёт неизменяемый снимок (`Arc<Vec<Rule>>`),
/// сохранение заменяет список целиком.
pub struct RuleStore {
    path: Option<PathBuf>,
    rules: RwLock<Arc<Vec<Rule>>>,
    // mtime файла на момент последней загрузки
    loaded_at: Mutex<Option<SystemTime>>,
}

/// Запись, отброшенная при загрузке
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRecord {
    pub index: usize,
    pub reason: String,
}

/// Результат разбора файла правил
#[derive(Debug, Default)]
pub struct LoadReport {
    pub rules: Vec<Rule>,
    pub dropped: Vec<DroppedRecord>,
}

impl RuleStore {
    /// Хранилище без файла (dry-run, тесты)
    pub fn in_memory(rules: Vec<Rule>) -> Self {
        Self {
            path: None,
            rules: RwLock::new(Arc::new(rules)),
            loaded_at: Mutex::new(None),
        }
    }

    /// Открыть файл правил. Отсутствующий файл означает пустой список.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self {
            path: Some(path.as_ref().to_path_buf()),
            rules: RwLock::new(Arc::new(Vec::new())),
            loaded_at: Mutex::new(None),
        };
        store.reload()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Текущий список правил для одного прохода оценки
    pub fn snapshot(&self) -> Arc<Vec<Rule>> {
        self.rules.read().clone()
    }

    /// Заменить список в памяти, не трогая файл
    pub fn replace(&self, rules: Vec<Rule>) {
        info!("Список правил заменён: {} правил", rules.len());
        *self.rules.write() = Arc::new(rules);
    }

    /// Перечитать файл, если он изменился с последней загрузки.
    ///
    /// Возвращает `true`, если список был заменён. При ошибке чтения
    /// остаётся предыдущий снимок.
    pub fn refresh(&self) -> Result<bool> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };

        let modified = match fs::metadata(path) {
            Ok(metadata) => Some(metadata.modified()?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let unchanged = *self.loaded_at.lock() == modified;
        // файла нет и не было: пустой список уже загружен
        if unchanged && (modified.is_some() || self.snapshot().is_empty()) {
            return Ok(false);
        }

        debug_if_enabled!("Файл правил {:?} изменился, перечитываем", path);
        if let Err(e) = self.reload() {
            // повторная попытка только после следующего изменения файла
            *self.loaded_at.lock() = modified;
            return Err(e);
        }
        Ok(true)
    }

    /// Сохранить список целиком и заменить снимок в памяти
    pub fn save(&self, rules: Vec<Rule>) -> Result<()> {
        if let Some(path) = self.path.as_deref() {
            write_atomically(path, &serde_json::to_string_pretty(&rules)?)?;
            *self.loaded_at.lock() = fs::metadata(path).and_then(|m| m.modified()).ok();
            info!("Сохранено {} правил в {:?}", rules.len(), path);
        }
        self.replace(rules);
        Ok(())
    }

    fn reload(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let (content, modified) = match fs::read_to_string(path) {
            Ok(content) => (content, fs::metadata(path)?.modified().ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Файл правил {:?} не найден, список правил пуст", path);
                *self.loaded_at.lock() = None;
                self.replace(Vec::new());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let report = parse_records(&content)?;
        log_report(path, &report);

        *self.loaded_at.lock() = modified;
        self.replace(report.rules);
        Ok(())
    }
}

/// Разобрать JSON-массив правил, проверяя каждую запись отдельно.
///
/// Некорректная запись отбрасывается, остальные загружаются. Ошибкой
/// всего файла считается только невалидный JSON или не-массив.
pub fn parse_records(raw: &str) -> Result<LoadReport> {
    if raw.trim().is_empty() {
        return Ok(LoadReport::default());
    }

    let records: Vec<serde_json::Value> = match serde_json::from_str(raw)? {
        serde_json::Value::Array(records) => records,
        other => {
            return Err(rules_error!(
                config,
                "файл правил должен содержать массив, а не {}",
                json_kind(&other)
            ))
        }
    };

    let mut report = LoadReport::default();
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Rule>(record) {
            Ok(rule) => report.rules.push(rule),
            Err(e) => report.dropped.push(DroppedRecord {
                index,
                reason: e.to_string(),
            }),
        }
    }
    Ok(report)
}

fn log_report(path: &Path, report: &LoadReport) {
    for dropped in &report.dropped {
        warn!(
            "Правило #{} в {:?} отброшено: {}",
            dropped.index + 1,
            path,
            dropped.reason
        );
    }
    for (index, rule) in report.rules.iter().enumerate() {
        if rule.match_key.is_substring() && rule.match_value.is_empty() {
            warn!(
                "Правило {} имеет пустой match_value для {} (см. rules.empty_value_matches_all)",
                rule.label(index),
                rule.match_key
            );
        }
        if rule.match_key == MatchKey::Parent
            && !["main window", "dialog or popup"].contains(&rule.match_value.to_lowercase().as_str())
        {
            warn!(
                "Правило {}: значение parent '{}' никогда не совпадёт",
                rule.label(index),
                rule.match_value
            );
        }
    }
    info!(
        "Загружено {} правил из {:?} (отброшено: {})",
        report.rules.len(),
        path,
        report.dropped.len()
    );
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "число",
        serde_json::Value::String(_) => "строку",
        serde_json::Value::Array(_) => "массив",
        serde_json::Value::Object(_) => "объект",
    }
}

fn write_atomically(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        RulesError::Io(e)
    })
}
