//! アプリケーション設定管理モジュール
//!
//! XDGディレクトリを使用した設定ファイルの永続化と管理を提供します。

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::database::BreatheDatabase;
use crate::tracking::{Currency, HabitDraft};

/// コーチ（チャット）設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachConfig {
    /// ストリーミング応答エンドポイント
    pub endpoint: String,
    /// 接続タイムアウト（秒）
    pub timeout_secs: u64,
    /// falseの場合はオフライン応答のみ
    pub use_remote: bool,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:54321/functions/v1/chat".to_string(),
            timeout_secs: 30,
            use_remote: false,
        }
    }
}

/// 統計クロック設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// 再計算間隔（ミリ秒）
    pub tick_interval_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
        }
    }
}

/// ログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// カスタムログディレクトリ（Noneの場合はXDGデフォルト使用）
    pub log_dir: Option<PathBuf>,
    /// ログレベル (trace/debug/info/warn/error)
    pub log_level: String,
    /// ファイル出力有効化
    pub enable_file_logging: bool,
    /// 保存するログファイル数上限
    pub max_log_files: u32,
    /// 古いログファイル自動削除
    pub auto_cleanup_enabled: bool,
    /// ログファイル名の接頭辞（日付が付与される）
    pub log_file_prefix: String,
    /// 自動削除対象のファイル名パターン
    pub log_filename_pattern: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_level: "info".to_string(),
            enable_file_logging: false,
            max_log_files: 30,
            auto_cleanup_enabled: true,
            log_file_prefix: "breathe-free.log".to_string(),
            log_filename_pattern: "breathe-free.log.*".to_string(),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// オンボーディング時の通貨
    #[serde(default)]
    pub default_currency: Currency,

    /// データベースファイル名（Noneの場合はデフォルト）
    #[serde(default)]
    pub database_file: Option<String>,

    /// コーチ設定
    #[serde(default)]
    pub coach: CoachConfig,

    /// クロック設定
    #[serde(default)]
    pub clock: ClockConfig,

    /// ログ設定
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::default(),
            database_file: None,
            coach: CoachConfig::default(),
            clock: ClockConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn tick_interval(&self) -> std::time::Duration {
        // 0msのintervalはtokioがpanicする
        std::time::Duration::from_millis(self.clock.tick_interval_ms.max(1))
    }

    /// オンボーディングの初期値（設定された通貨を使用）
    pub fn habit_draft(&self) -> HabitDraft {
        HabitDraft::default().with_currency(self.default_currency)
    }

    /// XDGデータディレクトリのデータベースを開く
    pub fn open_database(&self) -> Result<BreatheDatabase> {
        BreatheDatabase::open_default(self.database_file.as_deref())
    }

    /// 指定ディレクトリのデータベースを開く
    pub fn open_database_in(&self, data_dir: &Path) -> Result<BreatheDatabase> {
        BreatheDatabase::open_in_dir(data_dir, self.database_file.as_deref())
    }
}

/// 設定管理マネージャー
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::with_path(config_path)
    }

    /// 任意のパスを使う設定マネージャーを作成
    pub fn with_path(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();

        // 設定ディレクトリを作成（存在しない場合）
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        Ok(Self { config_path })
    }

    /// XDGディレクトリに基づく設定ファイルパスを取得
    fn get_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("dev", "breathe-free", "breathe-free")
            .context("Failed to get project directories")?;

        let config_file = project_dirs.config_dir().join("config.toml");

        debug!("Config file path: {}", config_file.display());

        Ok(config_file)
    }

    /// 設定を読み込み（ファイルがなければデフォルト）
    pub fn load_config(&self) -> Result<AppConfig> {
        let path = &self.config_path;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📄 No config at {}, using defaults", path.display());
                return Ok(AppConfig::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file: {}", path.display()));
            }
        };

        let config = toml::from_str::<AppConfig>(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!(
            "✅ Config loaded: remote coach {}, tick {:?}",
            config.coach.use_remote,
            config.tick_interval()
        );
        Ok(config)
    }

    /// 設定を保存
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        let path = &self.config_path;
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!("💾 Config saved to {}", path.display());
        Ok(())
    }

    pub fn config_file_path(&self) -> &Path {
        &self.config_path
    }
}
