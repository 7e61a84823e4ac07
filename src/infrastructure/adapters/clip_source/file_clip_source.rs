//! File Clip Source - 本地目录片段读取
//!
//! 实现 ClipSourcePort trait

use async_trait::async_trait;
use std::io::ErrorKind;
use tokio::fs;

use crate::application::ports::{ClipError, ClipSourcePort};

/// 本地文件片段源
///
/// 路径即文件系统路径（`<voice 目录>/<clip_id>.mp3`）
#[derive(Debug, Clone, Default)]
pub struct FileClipSource;

impl FileClipSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ClipSourcePort for FileClipSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, ClipError> {
        match fs::read(path).await {
            Ok(data) => {
                tracing::trace!(path = %path, size = data.len(), "Clip read from disk");
                Ok(data)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ClipError::NotFound(path.to_string())),
            Err(e) => Err(ClipError::Io(format!("{}: {}", path, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_existing_and_missing_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.VIC.mid.mp3");
        std::fs::write(&path, b"ID3 fake").unwrap();

        let source = FileClipSource::new();
        let data = source.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(data, b"ID3 fake");

        let missing = dir.path().join("station.XXX.mid.mp3");
        let err = source.fetch(missing.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, ClipError::NotFound(_)));
    }
}
