//! Grammar - 播报模板语法
//!
//! 职责:
//! - 模板文档解析
//! - 语法节点与属性访问

mod document;
mod errors;
mod node;

pub use document::TemplateDocument;
pub use errors::GrammarError;
pub use node::{Attributes, GrammarElement, GrammarNode, NodeKind};
