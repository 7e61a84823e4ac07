//! Routing Clip Source - 按路径前缀选择 HTTP 或本地源

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::ports::{ClipError, ClipSourcePort};

use super::{FileClipSource, HttpClipSource};

/// `http://` / `https://` 路径交给 HTTP 源，其余读本地文件
pub struct RoutingClipSource {
    file: Arc<dyn ClipSourcePort>,
    http: Arc<dyn ClipSourcePort>,
}

impl RoutingClipSource {
    pub fn new(file: Arc<dyn ClipSourcePort>, http: Arc<dyn ClipSourcePort>) -> Self {
        Self { file, http }
    }

    pub fn with_defaults() -> Result<Self, ClipError> {
        Ok(Self::new(
            Arc::new(FileClipSource::new()),
            Arc::new(HttpClipSource::with_default_config()?),
        ))
    }
}

fn is_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

#[async_trait]
impl ClipSourcePort for RoutingClipSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, ClipError> {
        if is_url(path) {
            self.http.fetch(path).await
        } else {
            self.file.fetch(path).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::FakeClipSource;

    #[tokio::test]
    async fn test_routes_by_prefix() {
        let file = Arc::new(FakeClipSource::new().with_clip("local", 0.1, 0));
        let http = Arc::new(FakeClipSource::new().with_clip("remote", 0.1, 0));
        let source = RoutingClipSource::new(file, http);

        assert!(source.fetch("vox/local.mp3").await.is_ok());
        assert!(source.fetch("https://cdn.example/vox/remote.mp3").await.is_ok());
        assert!(matches!(
            source.fetch("https://cdn.example/vox/local.mp3").await,
            Err(ClipError::NotFound(_))
        ));
    }
}
