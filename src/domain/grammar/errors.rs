//! Grammar - Errors

use thiserror::Error;

use super::NodeKind;

/// 模板配置错误
///
/// 表示模板本身已损坏，整次生成必须中止
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("Failed to parse template document: {0}")]
    Parse(String),

    #[error("Unknown element type: {0}")]
    UnknownKind(String),

    #[error("<{kind}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        kind: NodeKind,
        attribute: &'static str,
    },

    #[error("<{kind}> has invalid value '{value}' for attribute '{attribute}'")]
    InvalidAttribute {
        kind: NodeKind,
        attribute: &'static str,
        value: String,
    },

    #[error("Phraseset '{0}' has no phrases")]
    EmptyPhraseset(String),

    #[error("Duplicate definition id: {0}")]
    DuplicateId(String),
}
