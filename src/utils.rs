// ログ初期化とログファイル管理

use anyhow::Context;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config_manager::LogConfig;

/// ログ初期化
///
/// `RUST_LOG`が設定されていればそれを優先し、なければ設定のログレベルを使う。
/// ファイル出力が有効な場合は日毎にローテーションし、戻り値のガードを
/// 保持している間だけ書き込まれる。
pub fn init_logging(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("Invalid log level: {}", config.log_level))?;

    let mut removed = Vec::new();
    let (file_layer, guard) = if config.enable_file_logging {
        let log_dir = resolve_log_dir(config)?;

        if config.auto_cleanup_enabled {
            removed = cleanup_old_logs(
                &log_dir,
                &config.log_filename_pattern,
                config.max_log_files as usize,
            )?;
        }

        let appender = tracing_appender::rolling::daily(&log_dir, &config.log_file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true);

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .with(file_layer)
        .try_init()?;

    if !removed.is_empty() {
        info!("🧹 Removed {} old log files", removed.len());
    }

    Ok(guard)
}

/// ログディレクトリを決定して作成
pub fn resolve_log_dir(config: &LogConfig) -> anyhow::Result<PathBuf> {
    let log_dir = match &config.log_dir {
        Some(dir) => dir.clone(),
        None => ProjectDirs::from("dev", "breathe-free", "breathe-free")
            .context("Failed to get project directories")?
            .data_dir()
            .join("logs"),
    };

    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    Ok(log_dir)
}

/// パターンに一致するログファイルを新しい順に`max_files`件だけ残す
///
/// 削除したファイルのパスを返す。
pub fn cleanup_old_logs(
    log_dir: &Path,
    pattern: &str,
    max_files: usize,
) -> anyhow::Result<Vec<PathBuf>> {
    let full_pattern = log_dir.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let mut files: Vec<(PathBuf, SystemTime)> = glob::glob(&full_pattern)
        .with_context(|| format!("Invalid log file pattern: {}", pattern))?
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(UNIX_EPOCH);
            (path, modified)
        })
        .collect();

    // 新しい順（更新日時が同じ場合はファイル名の日付で判断）
    files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

    let mut removed = Vec::new();
    for (path, _) in files.into_iter().skip(max_files) {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) => warn!("⚠️ Failed to remove old log file {}: {}", path.display(), e),
        }
    }

    Ok(removed)
}
