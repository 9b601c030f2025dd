//! 状態レイヤー設定
//!
//! XDG設定ディレクトリのTOMLファイルから読み込む。ファイルや
//! フィールドが無ければデフォルト値で動く。

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::store::RoomRenamePolicy;

/// バックエンド接続設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendSettings {
    pub base_url: String,
    pub api_key: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
        }
    }
}

/// fancast-state全体の設定
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StateConfig {
    /// 状態DBの置き場所（未指定ならXDGデータディレクトリ）
    pub data_dir: Option<PathBuf>,
    /// チャットルーム再有効化時の表示名の扱い
    pub room_rename_policy: RoomRenamePolicy,
    pub backend: BackendSettings,
}

impl StateConfig {
    /// 設定ファイルのパスを取得する
    pub fn config_path() -> StateResult<PathBuf> {
        let project_dirs = ProjectDirs::from("app", "fancast", "fancast")
            .ok_or_else(|| StateError::Config("Failed to get project directories".to_string()))?;
        Ok(project_dirs.config_dir().join("state.toml"))
    }

    /// 設定を読み込む（ファイルがなければデフォルト）
    pub async fn load() -> Self {
        let path = match Self::config_path() {
            Ok(path) => path,
            Err(e) => {
                warn!("Config path unavailable, using defaults: {}", e);
                return Self::default();
            }
        };
        Self::load_from(&path).await
    }

    /// 指定パスから設定を読み込む
    pub async fn load_from(path: &PathBuf) -> Self {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(_) => {
                debug!("No config file at {:?}, using defaults", path);
                return Self::default();
            }
        };

        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!("Invalid config file {:?}, using defaults: {}", path, e);
                Self::default()
            }
        }
    }

    /// 設定をデフォルトの場所へ書き出す
    pub async fn save(&self) -> StateResult<()> {
        let path = Self::config_path()?;
        self.save_to(&path).await
    }

    /// 設定を指定パスへ書き出す
    pub async fn save_to(&self, path: &PathBuf) -> StateResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let raw = toml::to_string_pretty(self)
            .map_err(|e| StateError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, raw)
            .await
            .map_err(|e| StateError::Config(format!("Failed to write config: {}", e)))?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    /// 状態DBファイルのパスを解決する
    pub fn storage_path(&self) -> StateResult<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.join("state.db")),
            None => crate::storage::SqliteKeyValueStorage::default_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_roundtrip_via_toml() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("state.toml");

        let config = StateConfig {
            data_dir: Some(PathBuf::from("/tmp/fancast")),
            room_rename_policy: RoomRenamePolicy::UpdateName,
            backend: BackendSettings {
                base_url: "https://backend.example.com".to_string(),
                api_key: "anon-key".to_string(),
            },
        };
        config.save_to(&path).await?;

        let restored = StateConfig::load_from(&path).await;
        assert_eq!(restored, config);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_fields_fall_back_to_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("state.toml");
        tokio::fs::write(&path, "[backend]\nbase_url = \"https://x.example\"\n").await?;

        let config = StateConfig::load_from(&path).await;
        assert_eq!(config.backend.base_url, "https://x.example");
        assert_eq!(config.backend.api_key, "");
        assert_eq!(config.room_rename_policy, RoomRenamePolicy::KeepExisting);
        assert_eq!(config.data_dir, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_yields_default() {
        let path = PathBuf::from("/nonexistent/fancast/state.toml");
        let config = StateConfig::load_from(&path).await;
        assert_eq!(config, StateConfig::default());
    }
}
