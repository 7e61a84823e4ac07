//! HTTP Clip Source - 通过 HTTP 获取片段
//!
//! 实现 ClipSourcePort trait；声音目录为 `http(s)://` URL 时使用

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::application::ports::{ClipError, ClipSourcePort};

/// HTTP 片段源配置
#[derive(Debug, Clone)]
pub struct HttpClipSourceConfig {
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpClipSourceConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// HTTP 片段源
pub struct HttpClipSource {
    client: Client,
}

impl HttpClipSource {
    pub fn new(config: HttpClipSourceConfig) -> Result<Self, ClipError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClipError::Network(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn with_default_config() -> Result<Self, ClipError> {
        Self::new(HttpClipSourceConfig::default())
    }
}

#[async_trait]
impl ClipSourcePort for HttpClipSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, ClipError> {
        let response = self.client.get(path).send().await.map_err(|e| {
            if e.is_timeout() {
                ClipError::Network(format!("Timed out fetching {}", path))
            } else if e.is_connect() {
                ClipError::Network(format!("Cannot connect for {}: {}", path, e))
            } else {
                ClipError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClipError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(ClipError::Network(format!("HTTP {} for {}", status, path)));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| ClipError::Network(format!("Failed to read body of {}: {}", path, e)))?;
        tracing::trace!(url = %path, size = data.len(), "Clip downloaded");
        Ok(data.to_vec())
    }
}
