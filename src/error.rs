//! fancast-state共通エラー型

use thiserror::Error;

/// 状態レイヤー全体のエラー型
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unsupported snapshot version {found} (current: {current})")]
    UnsupportedVersion { found: u32, current: u32 },
}

/// fancast-state用Result型エイリアス
pub type StateResult<T> = Result<T, StateError>;

impl From<rusqlite::Error> for StateError {
    fn from(err: rusqlite::Error) -> Self {
        StateError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}
