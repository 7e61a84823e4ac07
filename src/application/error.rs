//! 应用层错误定义
//!
//! 汇总模板加载、生成与解析各环节的错误

use thiserror::Error;

use crate::application::engine::GenerateError;
use crate::application::resolver::ResolveError;
use crate::domain::database::DatabaseError;
use crate::domain::grammar::GrammarError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 模板文档无效
    #[error("Template error: {0}")]
    Template(#[from] GrammarError),

    /// 参考数据库无效
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// 展开失败
    #[error("Generation failed: {0}")]
    Generate(#[from] GenerateError),

    /// Token 解析失败
    #[error("Resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ApplicationError {
    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}
