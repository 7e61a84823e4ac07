//! 参考数据库
//!
//! 只读数据：延误原因、具名列车、运营线路、车站代码与名称

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to read database: {0}")]
    Io(String),

    #[error("Failed to parse database: {0}")]
    Parse(String),

    #[error("Database list '{0}' is empty")]
    EmptyList(&'static str),
}

/// 参考数据库
///
/// 不变量:
/// - 所有列表非空（由 `validate` 保证）
/// - 车站按代码有序，保证固定种子下抽取结果可复现
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceDatabase {
    #[serde(default)]
    pub excuses: Vec<String>,
    #[serde(default)]
    pub named: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub stations: BTreeMap<String, String>,
}

impl ReferenceDatabase {
    pub fn from_json(json: &str) -> Result<Self, DatabaseError> {
        let database: Self =
            serde_json::from_str(json).map_err(|e| DatabaseError::Parse(e.to_string()))?;
        database.validate()?;
        tracing::debug!(
            excuses = database.excuses.len(),
            named = database.named.len(),
            services = database.services.len(),
            stations = database.stations.len(),
            "Reference database loaded"
        );
        Ok(database)
    }

    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DatabaseError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.excuses.is_empty() {
            return Err(DatabaseError::EmptyList("excuses"));
        }
        if self.named.is_empty() {
            return Err(DatabaseError::EmptyList("named"));
        }
        if self.services.is_empty() {
            return Err(DatabaseError::EmptyList("services"));
        }
        if self.stations.is_empty() {
            return Err(DatabaseError::EmptyList("stations"));
        }
        Ok(())
    }

    /// 车站名称；未知代码时返回带标记的占位文本
    pub fn station_name(&self, code: &str) -> String {
        self.stations
            .get(code)
            .cloned()
            .unwrap_or_else(|| format!("UNKNOWN STATION: {}", code))
    }

    pub fn station_codes(&self) -> Vec<String> {
        self.stations.keys().cloned().collect()
    }

    /// 随机抽取一个车站代码
    pub fn pick_station(&self, rng: &mut fastrand::Rng) -> Option<String> {
        if self.stations.is_empty() {
            return None;
        }
        let idx = rng.usize(..self.stations.len());
        self.stations.keys().nth(idx).cloned()
    }

    /// 抽取 min..=max 个互不相同的车站代码
    pub fn pick_stations(&self, rng: &mut fastrand::Rng, min: usize, max: usize) -> Vec<String> {
        let mut codes = self.station_codes();
        let max = max.min(codes.len());
        let min = min.min(max);
        let count = rng.usize(min..=max);
        rng.shuffle(&mut codes);
        codes.truncate(count);
        codes
    }
}

/// 从列表中均匀抽取
pub fn pick<'a>(rng: &mut fastrand::Rng, list: &'a [String]) -> Option<&'a String> {
    if list.is_empty() {
        None
    } else {
        list.get(rng.usize(..list.len()))
    }
}
