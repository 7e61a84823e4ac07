//! Domain Layer - 领域层
//!
//! 纯数据与规则，不含 I/O:
//! - grammar: 播报模板语法
//! - database: 参考数据库
//! - context: 上下文状态
//! - announcement: 具体播报树
//! - vox: 语音 Token 与声音描述

pub mod announcement;
pub mod context;
pub mod database;
pub mod grammar;
pub mod text;
pub mod vox;

pub use announcement::{Announcement, AnnouncementNode, ResolvedValue, CALLING_CONTEXT};
pub use context::{context_key, ContextState, ContextValue, Platform};
pub use database::{DatabaseError, ReferenceDatabase};
pub use grammar::{Attributes, GrammarElement, GrammarError, GrammarNode, NodeKind, TemplateDocument};
pub use vox::{Voice, VoxToken};
