//! Vox - 语音 Token 与声音描述

use serde::{Deserialize, Serialize};
use std::fmt;

/// 语音 Token：片段 ID 或静音时长（秒）
///
/// 每次生成产出一个有序、不可变的序列，由调度器从前往后消费
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VoxToken {
    Clip(String),
    Silence(f32),
}

impl VoxToken {
    pub fn clip(id: impl Into<String>) -> Self {
        VoxToken::Clip(id.into())
    }

    pub fn as_clip(&self) -> Option<&str> {
        match self {
            VoxToken::Clip(id) => Some(id),
            VoxToken::Silence(_) => None,
        }
    }
}

impl fmt::Display for VoxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoxToken::Clip(id) => write!(f, "{}", id),
            VoxToken::Silence(secs) => write!(f, "{}", secs),
        }
    }
}

impl From<&str> for VoxToken {
    fn from(id: &str) -> Self {
        VoxToken::Clip(id.to_string())
    }
}

impl From<f32> for VoxToken {
    fn from(secs: f32) -> Self {
        VoxToken::Silence(secs)
    }
}

/// 声音描述：名称、语言标签、片段目录（本地路径或 http(s) URL）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub language: String,
    pub base_path: String,
}

impl Voice {
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            base_path: base_path.into(),
        }
    }

    /// 片段路径 `<base_path>/<clip_id>.mp3`
    pub fn clip_path(&self, clip_id: &str) -> String {
        format!("{}/{}.mp3", self.base_path.trim_end_matches('/'), clip_id)
    }

    pub fn is_remote(&self) -> bool {
        self.base_path.starts_with("http://") || self.base_path.starts_with("https://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_path() {
        let voice = Voice::new("Roy", "en-GB", "data/vox/");
        assert_eq!(voice.clip_path("station.VIC.mid"), "data/vox/station.VIC.mid.mp3");
        assert!(!voice.is_remote());
        assert!(Voice::new("Roy", "en-GB", "https://cdn.example/vox").is_remote());
    }

    #[test]
    fn test_token_json_shape() {
        let tokens = vec![VoxToken::Silence(0.1), VoxToken::clip("station.VIC.mid")];
        let json = serde_json::to_string(&tokens).unwrap();
        assert_eq!(json, r#"[0.1,"station.VIC.mid"]"#);
    }
}
