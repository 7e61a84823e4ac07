//! Token Resolver - 语音 Token 解析器
//!
//! 将具体播报树展平为有序的语音 Token 序列:
//! 1. 展平：只保留 phrase / phraseset 正文文本与动态值节点，跳过折叠子树与结构包装
//! 2. 解析：逐项映射为片段 ID 与静音，动态值按前瞻结果选择句中 / 句末读法
//!
//! 连续的静音不在此合并，由调度器累加。

use thiserror::Error;

use crate::domain::announcement::{Announcement, AnnouncementNode, ResolvedValue, CALLING_CONTEXT};
use crate::domain::context::{format_time, ContextState};
use crate::domain::text;
use crate::domain::vox::VoxToken;

/// 句号前后的停顿（秒）
pub const FULL_STOP_SILENCE: f32 = 0.5;

/// 动态值两侧的短停顿（秒）
pub const SHORT_SILENCE: f32 = 0.1;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// 引擎尚未写入的上下文值被读取，属于调用约定被破坏
    #[error("{kind} value for context '{context}' requested before it was generated")]
    MissingContext {
        kind: &'static str,
        context: String,
    },
}

/// 句中 / 句末读法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inflection {
    Mid,
    End,
}

impl Inflection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Inflection::Mid => "mid",
            Inflection::End => "end",
        }
    }
}

/// 展平后的可朗读单元
#[derive(Debug)]
enum Part<'t> {
    Text {
        /// 形如 `phrase.<ref>` 或 `phrase.<ref>.<choice>`
        owner: String,
        /// 在所属正文中的位置，折叠包装内的文本带上包装的位置前缀
        position: String,
        text: &'t str,
    },
    Value {
        context: &'t str,
        value: &'t ResolvedValue,
    },
}

impl Part<'_> {
    fn starts_with_full_stop(&self) -> bool {
        match self {
            Part::Text { text, .. } => text.trim().starts_with('.'),
            Part::Value { .. } => false,
        }
    }
}

fn flatten<'t>(node: &'t AnnouncementNode, owner: &str, position: &str, out: &mut Vec<Part<'t>>) {
    match node {
        AnnouncementNode::Text(text) => out.push(Part::Text {
            owner: owner.to_string(),
            position: position.to_string(),
            text,
        }),
        AnnouncementNode::Phrase {
            reference,
            children,
        } => {
            let owner = format!("phrase.{}", reference);
            for (idx, child) in children.iter().enumerate() {
                flatten(child, &owner, &idx.to_string(), out);
            }
        }
        AnnouncementNode::Phraseset {
            reference,
            choice,
            children,
        } => {
            let owner = format!("phrase.{}.{}", reference, choice);
            for (idx, child) in children.iter().enumerate() {
                flatten(child, &owner, &idx.to_string(), out);
            }
        }
        AnnouncementNode::Optional {
            collapsed,
            children,
            ..
        } => {
            if *collapsed {
                return;
            }
            for (idx, child) in children.iter().enumerate() {
                flatten(child, owner, &format!("{}.{}", position, idx), out);
            }
        }
        AnnouncementNode::Unknown { .. } => {}
        AnnouncementNode::Value { context, value } => out.push(Part::Value { context, value }),
    }
}

fn missing(kind: &'static str, context: &str) -> ResolveError {
    ResolveError::MissingContext {
        kind,
        context: context.to_string(),
    }
}

/// 语音 Token 解析器
///
/// 动态值从上下文状态读取，与模板引擎写入的 key 一致
pub struct TokenResolver<'a> {
    state: &'a ContextState,
}

impl<'a> TokenResolver<'a> {
    pub fn new(state: &'a ContextState) -> Self {
        Self { state }
    }

    /// 解析整段播报
    pub fn resolve(&self, announcement: &Announcement) -> Result<Vec<VoxToken>, ResolveError> {
        let mut parts = Vec::new();
        flatten(&announcement.root, "", "", &mut parts);

        let mut tokens = Vec::new();
        for (idx, part) in parts.iter().enumerate() {
            let inflection = match parts.get(idx + 1) {
                Some(next) if next.starts_with_full_stop() => Inflection::End,
                _ => Inflection::Mid,
            };
            self.resolve_part(part, inflection, &mut tokens)?;
        }

        tracing::debug!(parts = parts.len(), tokens = tokens.len(), "Announcement resolved");
        Ok(tokens)
    }

    fn resolve_part(
        &self,
        part: &Part<'_>,
        inflection: Inflection,
        out: &mut Vec<VoxToken>,
    ) -> Result<(), ResolveError> {
        match part {
            Part::Text {
                owner,
                position,
                text,
            } => {
                resolve_text(owner, position, text, out);
                Ok(())
            }
            Part::Value { context, value } => self.resolve_value(context, value, inflection, out),
        }
    }

    fn resolve_value(
        &self,
        context: &str,
        value: &ResolvedValue,
        inflection: Inflection,
        out: &mut Vec<VoxToken>,
    ) -> Result<(), ResolveError> {
        let inflect = inflection.as_str();
        match value {
            ResolvedValue::Coach(_) => {
                let coach = self.state.coach(context).ok_or_else(|| missing("coach", context))?;
                bracket(out, format!("letter.{}.{}", coach, inflect));
            }
            ResolvedValue::Excuse(_) => {
                let excuse = self.state.excuse(context).ok_or_else(|| missing("excuse", context))?;
                bracket(out, format!("excuse.{}.{}", text::filename(excuse), inflect));
            }
            ResolvedValue::Named(_) => {
                let named = self.state.named(context).ok_or_else(|| missing("named", context))?;
                bracket(out, format!("named.{}.mid", text::filename(named)));
            }
            ResolvedValue::Service(_) => {
                let service = self.state.service(context).ok_or_else(|| missing("service", context))?;
                bracket(out, format!("service.{}.mid", text::filename(service)));
            }
            ResolvedValue::Platform(_) => {
                let platform = self
                    .state
                    .platform(context)
                    .ok_or_else(|| missing("platform", context))?;
                bracket(out, format!("number.{}.{}", platform, inflect));
            }
            ResolvedValue::Station { .. } => {
                let code = self.state.station(context).ok_or_else(|| missing("station", context))?;
                bracket(out, format!("station.{}.{}", code, inflect));
            }
            ResolvedValue::Integer {
                singular, plural, ..
            } => {
                let n = self.state.integer(context).ok_or_else(|| missing("integer", context))?;
                out.push(VoxToken::Silence(SHORT_SILENCE));
                out.push(VoxToken::Clip(format!("number.{}.mid", n)));
                let suffix = if n == 1 { singular } else { plural };
                if let Some(word) = suffix {
                    out.push(VoxToken::Silence(SHORT_SILENCE));
                    out.push(VoxToken::Clip(format!("number.suffix.{}.end", text::filename(word))));
                }
                out.push(VoxToken::Silence(SHORT_SILENCE));
            }
            ResolvedValue::StationList { .. } => {
                let list = self
                    .state
                    .station_list(context)
                    .ok_or_else(|| missing("stationlist", context))?;
                resolve_station_list(list, context == CALLING_CONTEXT, inflection, out);
            }
            ResolvedValue::Time(_) => {
                let time = self.state.time(context).ok_or_else(|| missing("time", context))?;
                resolve_time(&format_time(time), out);
            }
        }
        Ok(())
    }
}

/// 短停顿 + 片段 + 短停顿
fn bracket(out: &mut Vec<VoxToken>, clip: String) {
    out.push(VoxToken::Silence(SHORT_SILENCE));
    out.push(VoxToken::Clip(clip));
    out.push(VoxToken::Silence(SHORT_SILENCE));
}

fn resolve_text(owner: &str, position: &str, raw: &str, out: &mut Vec<VoxToken>) {
    let cleaned = text::clean(raw);

    if cleaned == "." {
        out.push(VoxToken::Silence(FULL_STOP_SILENCE));
        return;
    }
    if cleaned.starts_with('.') {
        out.push(VoxToken::Silence(FULL_STOP_SILENCE));
    }
    if !text::has_words(&cleaned) {
        return;
    }

    out.push(VoxToken::Clip(format!("{}.{}", owner, position)));

    if cleaned.ends_with('.') {
        out.push(VoxToken::Silence(FULL_STOP_SILENCE));
    }
}

fn resolve_station_list(codes: &[String], calling: bool, inflection: Inflection, out: &mut Vec<VoxToken>) {
    out.push(VoxToken::Silence(SHORT_SILENCE));

    let Some((last, head)) = codes.split_last() else {
        return;
    };

    for code in head {
        out.push(VoxToken::Clip(format!("station.{}.mid", code)));
        out.push(VoxToken::Silence(SHORT_SILENCE));
    }

    if head.is_empty() && calling {
        // 单站 calling 列表以 "only" 结尾，不再追加停顿
        out.push(VoxToken::Clip(format!("station.{}.mid", last)));
        out.push(VoxToken::Silence(SHORT_SILENCE));
        out.push(VoxToken::clip("station.parts.only.end"));
        return;
    }

    if !head.is_empty() {
        out.push(VoxToken::clip("station.parts.and.mid"));
    }
    out.push(VoxToken::Clip(format!("station.{}.{}", last, inflection.as_str())));
    out.push(VoxToken::Silence(SHORT_SILENCE));
}

fn resolve_time(hhmm: &str, out: &mut Vec<VoxToken>) {
    out.push(VoxToken::Silence(SHORT_SILENCE));

    let (hour, minute) = hhmm.split_once(':').unwrap_or((hhmm, "00"));
    if hour == "00" && minute == "00" {
        out.push(VoxToken::clip("number.0000.mid"));
        out.push(VoxToken::Silence(SHORT_SILENCE));
        return;
    }

    out.push(VoxToken::Clip(format!("number.{}.begin", hour)));
    out.push(VoxToken::Silence(SHORT_SILENCE));
    if minute == "00" {
        out.push(VoxToken::clip("number.hundred.mid"));
    } else {
        out.push(VoxToken::Clip(format!("number.{}.mid", minute)));
    }
    out.push(VoxToken::Silence(SHORT_SILENCE));
}
