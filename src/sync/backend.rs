//! バックエンド行アクセスクライアント
//!
//! マネージドBaaSの行単位REST API（`/rest/v1/{table}`）への薄い
//! 挿入・削除クライアント。スキーマやRLSはバックエンド側の責務。

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// プロバイダの一意制約違反コード（PostgreSQL: unique_violation）
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// バックエンド書き込みエラー
///
/// `code`はプロバイダのエラーコード（存在する場合）。フォロー同期は
/// これを見て一意制約違反を成功へ読み替える。
#[derive(Error, Debug, Clone)]
#[error("Backend request failed: {message}")]
pub struct BackendError {
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION_CODE)
    }
}

/// 行単位CRUDの抽象（テストではモック実装を注入する）
#[async_trait]
pub trait BackendRowClient: Send + Sync {
    /// 1行挿入する
    async fn insert_row(&self, table: &str, row: Value) -> Result<(), BackendError>;

    /// カラム=値の等値条件に一致する行を削除する
    async fn delete_rows(&self, table: &str, filters: &[(&str, &str)]) -> Result<(), BackendError>;
}

/// reqwestベースの実クライアント
pub struct HttpBackendClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpBackendClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// 非2xxレスポンスをプロバイダのエラー表現へ変換する
    async fn error_from_response(response: reqwest::Response) -> BackendError {
        let status = response.status();
        match response.json::<Value>().await {
            Ok(body) => {
                let code = body
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let message = body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                BackendError::new(code, format!("{} ({})", message, status))
            }
            Err(_) => BackendError::new(None, format!("HTTP {}", status)),
        }
    }
}

#[async_trait]
impl BackendRowClient for HttpBackendClient {
    async fn insert_row(&self, table: &str, row: Value) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&row)
            .send()
            .await
            .map_err(|e| BackendError::new(None, e.to_string()))?;

        if response.status().is_success() {
            debug!("Inserted row into {}", table);
            return Ok(());
        }
        Err(Self::error_from_response(response).await)
    }

    async fn delete_rows(&self, table: &str, filters: &[(&str, &str)]) -> Result<(), BackendError> {
        let query: Vec<(String, String)> = filters
            .iter()
            .map(|(column, value)| (column.to_string(), format!("eq.{}", value)))
            .collect();

        let response = self
            .client
            .delete(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await
            .map_err(|e| BackendError::new(None, e.to_string()))?;

        if response.status().is_success() {
            debug!("Deleted rows from {}", table);
            return Ok(());
        }
        Err(Self::error_from_response(response).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detection() {
        let conflict = BackendError::new(Some("23505".to_string()), "duplicate key value");
        assert!(conflict.is_unique_violation());

        let other = BackendError::new(Some("42501".to_string()), "permission denied");
        assert!(!other.is_unique_violation());

        let codeless = BackendError::new(None, "timeout");
        assert!(!codeless.is_unique_violation());
    }

    #[test]
    fn test_table_url_normalizes_trailing_slash() {
        let client = HttpBackendClient::new("https://backend.example.com/", "key");
        assert_eq!(
            client.table_url("streamer_followers"),
            "https://backend.example.com/rest/v1/streamer_followers"
        );
    }
}
