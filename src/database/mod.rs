pub mod crud;
pub mod journal;
pub mod models;

pub use models::*;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::Path;

use crate::error::BreatheResult;

const DATABASE_FILE_NAME: &str = "breathe-free.db";

/// breathe-free用データベース接続管理
pub struct BreatheDatabase {
    pub connection: rusqlite::Connection,
    pub schema_version: u32,
}

impl BreatheDatabase {
    /// 新しいデータベース接続を作成
    pub fn new<P: AsRef<Path>>(db_path: P) -> BreatheResult<Self> {
        let connection = rusqlite::Connection::open(db_path)?;
        let mut db = Self {
            connection,
            schema_version: 1,
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// インメモリデータベースを作成（テスト用）
    pub fn new_in_memory() -> BreatheResult<Self> {
        let connection = rusqlite::Connection::open_in_memory()?;
        let mut db = Self {
            connection,
            schema_version: 1,
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// XDGデータディレクトリ（または設定されたファイル名）で開く
    pub fn open_default(file_name: Option<&str>) -> Result<Self> {
        let project_dirs = ProjectDirs::from("dev", "breathe-free", "breathe-free")
            .ok_or_else(|| anyhow::anyhow!("Failed to get project directories"))?;
        Self::open_in_dir(project_dirs.data_dir(), file_name)
    }

    /// 指定ディレクトリ内のファイルで開く（ディレクトリがなければ作成）
    pub fn open_in_dir(data_dir: &Path, file_name: Option<&str>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(file_name.unwrap_or(DATABASE_FILE_NAME));
        let db = Self::new(&db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;
        tracing::debug!("Database connection opened: {:?}", db_path);
        Ok(db)
    }

    /// データベーススキーマを初期化
    fn initialize_schema(&mut self) -> BreatheResult<()> {
        self.connection.execute_batch(include_str!("schema.sql"))?;
        tracing::info!("Database schema initialized successfully");
        Ok(())
    }
}
