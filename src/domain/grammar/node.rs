//! Grammar - 语法节点
//!
//! 模板文档中的不可变节点。属性以原始字符串保存，
//! 在展开时按节点类型解析，解析失败即为配置错误。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::GrammarError;

/// 语法节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Phrase,
    Phraseset,
    Optional,
    Coach,
    Excuse,
    Integer,
    Named,
    Platform,
    Service,
    Station,
    StationList,
    Time,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Phrase => "phrase",
            NodeKind::Phraseset => "phraseset",
            NodeKind::Optional => "optional",
            NodeKind::Coach => "coach",
            NodeKind::Excuse => "excuse",
            NodeKind::Integer => "integer",
            NodeKind::Named => "named",
            NodeKind::Platform => "platform",
            NodeKind::Service => "service",
            NodeKind::Station => "station",
            NodeKind::StationList => "stationlist",
            NodeKind::Time => "time",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "phrase" => Ok(NodeKind::Phrase),
            "phraseset" => Ok(NodeKind::Phraseset),
            "optional" => Ok(NodeKind::Optional),
            "coach" => Ok(NodeKind::Coach),
            "excuse" => Ok(NodeKind::Excuse),
            "integer" => Ok(NodeKind::Integer),
            "named" => Ok(NodeKind::Named),
            "platform" => Ok(NodeKind::Platform),
            "service" => Ok(NodeKind::Service),
            "station" => Ok(NodeKind::Station),
            "stationlist" => Ok(NodeKind::StationList),
            "time" => Ok(NodeKind::Time),
            _ => Err(GrammarError::UnknownKind(s.to_string())),
        }
    }
}

/// 节点属性（ref, id, chance, min, max, singular, plural, words, context）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
    }

    /// 必填字符串属性
    pub fn required(&self, kind: NodeKind, name: &'static str) -> Result<&str, GrammarError> {
        self.get(name).ok_or(GrammarError::MissingAttribute {
            kind,
            attribute: name,
        })
    }

    /// 必填整数属性
    pub fn required_int(&self, kind: NodeKind, name: &'static str) -> Result<i64, GrammarError> {
        let raw = self.required(kind, name)?;
        parse_number(kind, name, raw)
    }

    /// 可选数值属性，存在但无法解析时报错
    pub fn optional_num<T: FromStr>(
        &self,
        kind: NodeKind,
        name: &'static str,
    ) -> Result<Option<T>, GrammarError> {
        self.get(name)
            .map(|raw| parse_number(kind, name, raw))
            .transpose()
    }

    /// 布尔标志，仅 "true" 视为开启
    pub fn flag(&self, name: &str) -> bool {
        self.get(name)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn parse_number<T: FromStr>(kind: NodeKind, name: &'static str, raw: &str) -> Result<T, GrammarError> {
    raw.trim()
        .parse()
        .map_err(|_| GrammarError::InvalidAttribute {
            kind,
            attribute: name,
            value: raw.to_string(),
        })
}

/// 语法元素：类型 + 属性 + 有序子节点
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarElement {
    pub kind: NodeKind,
    pub attrs: Attributes,
    pub children: Vec<GrammarNode>,
}

impl GrammarElement {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name, value);
        self
    }

    pub fn child(mut self, node: impl Into<GrammarNode>) -> Self {
        self.children.push(node.into());
        self
    }

    /// 上下文 key，缺省时使用节点类型名
    pub fn context(&self) -> &str {
        self.attrs.get("context").unwrap_or(self.kind.as_str())
    }
}

/// 语法节点
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarNode {
    Text(String),
    Element(GrammarElement),
}

impl GrammarNode {
    pub fn text(text: impl Into<String>) -> Self {
        GrammarNode::Text(text.into())
    }
}

impl From<GrammarElement> for GrammarNode {
    fn from(element: GrammarElement) -> Self {
        GrammarNode::Element(element)
    }
}

impl From<&str> for GrammarNode {
    fn from(text: &str) -> Self {
        GrammarNode::Text(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("stationlist".parse::<NodeKind>().unwrap(), NodeKind::StationList);
        assert_eq!("Phraseset".parse::<NodeKind>().unwrap(), NodeKind::Phraseset);
        assert!(matches!(
            "marquee".parse::<NodeKind>(),
            Err(GrammarError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_required_int() {
        let attrs = Attributes::new().with("min", "3").with("max", "x");
        assert_eq!(attrs.required_int(NodeKind::Integer, "min").unwrap(), 3);
        assert!(matches!(
            attrs.required_int(NodeKind::Integer, "max"),
            Err(GrammarError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            attrs.required_int(NodeKind::Integer, "chance"),
            Err(GrammarError::MissingAttribute { attribute: "chance", .. })
        ));
    }

    #[test]
    fn test_flag_and_context() {
        let element = GrammarElement::new(NodeKind::Integer).attr("words", "TRUE");
        assert!(element.attrs.flag("words"));
        assert_eq!(element.context(), "integer");

        let element = element.attr("context", "delayed");
        assert_eq!(element.context(), "delayed");
    }
}
