//! Announcement - 具体播报树
//!
//! 模板展开的产物。与语法树同构，附带已解析的值与折叠标记。
//! 纯数据，不包含任何展示层逻辑；折叠切换通过上下文状态完成后重新展开。

use chrono::NaiveTime;

use super::context::{format_time, Platform};
use super::text;

/// 已解析的动态值
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Coach(char),
    Excuse(String),
    Integer {
        value: i64,
        singular: Option<String>,
        plural: Option<String>,
        words: bool,
    },
    Named(String),
    Platform(Platform),
    Service(String),
    Station {
        code: String,
        name: String,
    },
    StationList {
        codes: Vec<String>,
        names: Vec<String>,
    },
    Time(NaiveTime),
}

impl ResolvedValue {
    /// 显示文本
    pub fn display(&self, context: &str) -> String {
        match self {
            ResolvedValue::Coach(c) => c.to_string(),
            ResolvedValue::Excuse(s) | ResolvedValue::Named(s) | ResolvedValue::Service(s) => {
                s.clone()
            }
            ResolvedValue::Integer {
                value,
                singular,
                plural,
                words,
            } => {
                let mut out = if *words {
                    text::integer_to_words(*value)
                } else {
                    value.to_string()
                };
                let suffix = if *value == 1 { singular } else { plural };
                if let Some(suffix) = suffix {
                    out.push(' ');
                    out.push_str(suffix);
                }
                out
            }
            ResolvedValue::Platform(p) => p.to_string(),
            ResolvedValue::Station { name, .. } => name.clone(),
            ResolvedValue::StationList { names, .. } => {
                text::station_list_phrase(names, context == CALLING_CONTEXT)
            }
            ResolvedValue::Time(t) => format_time(*t),
        }
    }
}

/// 使用 "only" 后缀的车站列表上下文
pub const CALLING_CONTEXT: &str = "calling";

/// 具体播报树节点
#[derive(Debug, Clone, PartialEq)]
pub enum AnnouncementNode {
    Text(String),
    Phrase {
        reference: String,
        children: Vec<AnnouncementNode>,
    },
    Phraseset {
        reference: String,
        choice: usize,
        children: Vec<AnnouncementNode>,
    },
    /// 可折叠子树；折叠后保留在树中但不产生文本与语音
    Optional {
        key: String,
        collapsed: bool,
        children: Vec<AnnouncementNode>,
    },
    /// 未知引用的可见占位
    Unknown { reference: String },
    Value {
        context: String,
        value: ResolvedValue,
    },
}

impl AnnouncementNode {
    fn write_text(&self, out: &mut String) {
        match self {
            AnnouncementNode::Text(t) => out.push_str(t),
            AnnouncementNode::Phrase { children, .. }
            | AnnouncementNode::Phraseset { children, .. } => {
                children.iter().for_each(|c| c.write_text(out));
            }
            AnnouncementNode::Optional {
                collapsed,
                children,
                ..
            } => {
                if !collapsed {
                    children.iter().for_each(|c| c.write_text(out));
                }
            }
            AnnouncementNode::Unknown { reference } => {
                out.push_str(&format!(" (UNKNOWN REFERENCE: {}) ", reference));
            }
            AnnouncementNode::Value { context, value } => out.push_str(&value.display(context)),
        }
    }

    fn collect_optional_keys<'a>(&'a self, out: &mut Vec<(&'a str, bool)>) {
        match self {
            AnnouncementNode::Optional {
                key,
                collapsed,
                children,
            } => {
                out.push((key, *collapsed));
                children.iter().for_each(|c| c.collect_optional_keys(out));
            }
            AnnouncementNode::Phrase { children, .. }
            | AnnouncementNode::Phraseset { children, .. } => {
                children.iter().for_each(|c| c.collect_optional_keys(out));
            }
            _ => {}
        }
    }
}

/// 一次生成的完整播报
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub root: AnnouncementNode,
}

impl Announcement {
    pub fn new(root: AnnouncementNode) -> Self {
        Self { root }
    }

    /// 渲染为可读文本（折叠子树不输出）
    pub fn to_text(&self) -> String {
        let mut raw = String::new();
        self.root.write_text(&mut raw);
        text::clean_sentence(&raw)
    }

    /// 所有可折叠子树的 key 及当前折叠状态，供展示层使用
    pub fn optional_keys(&self) -> Vec<(&str, bool)> {
        let mut keys = Vec::new();
        self.root.collect_optional_keys(&mut keys);
        keys
    }
}
