use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod rules;
mod services;
mod utils;

use config::Config;
use events::EventName;
use rules::{Action, MatchKey, Rule, RuleStore};
use services::{create_compositor, create_event_source, EngineOptions, RuleEngine};

#[derive(Parser, Debug)]
#[command(name = "wf-rules")]
#[command(about = "Правила для окон Wayfire: действия по событиям view через IPC")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "wf-rules.toml", global = true)]
    config: String,

    /// Режим сухого запуска (без реальных действий)
    #[arg(long, global = true)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Запустить сервис правил (по умолчанию)
    Run,
    /// Проверить файл правил
    Check,
    /// Добавить правило для окна в фокусе
    Capture,
    /// Проверить плагины Wayfire
    Plugins {
        /// Включить отсутствующие плагины
        #[arg(long)]
        enable: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Arc::new(Config::load(&args.config)?);

    // Инициализация системы логирования
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск wf-rules v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - реальные действия отключены");
    }

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(config, args.dry_run).await,
        Command::Check => check(&config),
        Command::Capture => capture(&config, args.dry_run).await,
        Command::Plugins { enable } => plugins(&config, args.dry_run, enable).await,
    }
}

async fn run(config: Arc<Config>, dry_run: bool) -> Result<ExitCode> {
    let store = Arc::new(RuleStore::open(config.rules_path())?);
    let compositor = create_compositor(&config, dry_run).await?;

    if let Err(e) = utils::check_plugins(compositor.as_ref()).await {
        warn!("Не удалось проверить плагины Wayfire: {}", e);
    }

    let engine = RuleEngine::new(store, compositor, EngineOptions::from(&config.rules));
    let event_source = create_event_source(config.clone(), dry_run)?;

    info!("Все компоненты инициализированы");

    let (tx, rx) = mpsc::channel(config.events.channel_capacity);

    // Запуск сервисов
    let source_handle = tokio::spawn(async move {
        if let Err(e) = event_source.run(tx).await {
            error!("Ошибка в EventSource: {}", e);
        }
    });
    let mut engine_handle = tokio::spawn(async move {
        if let Err(e) = engine.run(rx).await {
            error!("Ошибка в RuleEngine: {}", e);
        }
    });

    info!("Все сервисы запущены");

    // Ожидание сигнала завершения
    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
            Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
        },
        _ = &mut engine_handle => {
            warn!("RuleEngine остановился раньше сигнала завершения");
        }
    }

    info!("Завершение работы...");

    // Остановка источника закрывает канал, движок отменяет таймеры и выходит
    source_handle.abort();

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = source_handle.await;
        if !engine_handle.is_finished() {
            let _ = engine_handle.await;
        }
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("wf-rules завершил работу");
    Ok(ExitCode::SUCCESS)
}

fn check(config: &Config) -> Result<ExitCode> {
    let path = config.rules_path();
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Файл правил {:?} не найден", path);
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Err(e).with_context(|| format!("Не удалось прочитать {:?}", path)),
    };

    let report = rules::store::parse_records(&raw).with_context(|| format!("Файл правил {:?} некорректен", path))?;

    for (index, rule) in report.rules.iter().enumerate() {
        info!("{} {}", rule.label(index), rule);
    }
    for dropped in &report.dropped {
        warn!("Запись #{} отброшена: {}", dropped.index + 1, dropped.reason);
    }
    info!(
        "Проверено {:?}: корректных правил {}, отброшено {}",
        path,
        report.rules.len(),
        report.dropped.len()
    );

    if report.dropped.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn capture(config: &Config, dry_run: bool) -> Result<ExitCode> {
    let store = RuleStore::open(config.rules_path())?;
    let compositor = create_compositor(config, dry_run).await?;

    let Some(view) = compositor.get_focused_view().await? else {
        warn!("Нет окна в фокусе, правило не добавлено");
        return Ok(ExitCode::FAILURE);
    };

    let rule = Rule::new(MatchKey::AppId, view.app_id.clone(), EventName::ViewMapped, Action::Center);
    info!("Добавляем правило для {}: {}", view, rule);

    let mut rules = store.snapshot().as_ref().clone();
    rules.push(rule);
    store.save(rules)?;

    Ok(ExitCode::SUCCESS)
}

async fn plugins(config: &Config, dry_run: bool, enable: bool) -> Result<ExitCode> {
    let compositor = create_compositor(config, dry_run).await?;

    let report = if enable {
        utils::enable_missing_plugins(compositor.as_ref()).await?
    } else {
        utils::check_plugins(compositor.as_ref()).await?
    };

    if report.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        "compact" => registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init(),
        _ => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }

    Ok(())
}
