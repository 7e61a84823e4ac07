//! Grammar - 模板文档
//!
//! JSON 格式:
//!
//! ```json
//! {
//!   "phrases": {
//!     "root": ["The ", {"type": "station", "context": "destination"}, " train."]
//!   },
//!   "phrasesets": {
//!     "apology": [["We are sorry."], ["We apologise."]]
//!   }
//! }
//! ```
//!
//! 文本子节点为字符串，元素子节点为带 `type` 的对象，
//! 其余字段为属性，`children` 为子节点列表。

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::{Attributes, GrammarElement, GrammarError, GrammarNode, NodeKind};

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    phrases: BTreeMap<String, Vec<RawNode>>,
    #[serde(default)]
    phrasesets: BTreeMap<String, Vec<Vec<RawNode>>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNode {
    Text(String),
    Element(RawElement),
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    children: Vec<RawNode>,
    #[serde(flatten)]
    attrs: BTreeMap<String, Value>,
}

impl RawNode {
    fn into_node(self) -> Result<GrammarNode, GrammarError> {
        match self {
            RawNode::Text(text) => Ok(GrammarNode::Text(text)),
            RawNode::Element(raw) => {
                let kind: NodeKind = raw.kind.parse()?;
                let mut attrs = Attributes::new();
                for (name, value) in raw.attrs {
                    let value = match value {
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        other => {
                            return Err(GrammarError::Parse(format!(
                                "attribute '{}' of <{}> must be a scalar, got {}",
                                name, kind, other
                            )))
                        }
                    };
                    attrs.insert(name, value);
                }
                let children = raw
                    .children
                    .into_iter()
                    .map(RawNode::into_node)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(GrammarNode::Element(GrammarElement {
                    kind,
                    attrs,
                    children,
                }))
            }
        }
    }
}

fn convert_body(body: Vec<RawNode>) -> Result<Vec<GrammarNode>, GrammarError> {
    body.into_iter().map(RawNode::into_node).collect()
}

/// 模板文档：具名 phrase / phraseset 定义
///
/// 不变量:
/// - phrase 与 phraseset 共享同一 id 命名空间
/// - 每个 phraseset 至少包含一个 phrase
#[derive(Debug, Clone, Default)]
pub struct TemplateDocument {
    phrases: HashMap<String, Vec<GrammarNode>>,
    phrasesets: HashMap<String, Vec<Vec<GrammarNode>>>,
}

impl TemplateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文本解析
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        let raw: RawDocument =
            serde_json::from_str(json).map_err(|e| GrammarError::Parse(e.to_string()))?;

        let mut document = Self::new();
        for (id, body) in raw.phrases {
            document.add_phrase(id, convert_body(body)?)?;
        }
        for (id, phrases) in raw.phrasesets {
            let phrases = phrases
                .into_iter()
                .map(convert_body)
                .collect::<Result<Vec<_>, _>>()?;
            document.add_phraseset(id, phrases)?;
        }

        tracing::debug!(
            phrases = document.phrases.len(),
            phrasesets = document.phrasesets.len(),
            "Template document parsed"
        );
        Ok(document)
    }

    /// 从文件加载
    pub fn load(path: &Path) -> Result<Self, GrammarError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| GrammarError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn add_phrase(
        &mut self,
        id: impl Into<String>,
        body: Vec<GrammarNode>,
    ) -> Result<(), GrammarError> {
        let id = id.into();
        self.ensure_unique(&id)?;
        self.phrases.insert(id, body);
        Ok(())
    }

    pub fn add_phraseset(
        &mut self,
        id: impl Into<String>,
        phrases: Vec<Vec<GrammarNode>>,
    ) -> Result<(), GrammarError> {
        let id = id.into();
        self.ensure_unique(&id)?;
        if phrases.is_empty() {
            return Err(GrammarError::EmptyPhraseset(id));
        }
        self.phrasesets.insert(id, phrases);
        Ok(())
    }

    fn ensure_unique(&self, id: &str) -> Result<(), GrammarError> {
        if self.phrases.contains_key(id) || self.phrasesets.contains_key(id) {
            return Err(GrammarError::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    pub fn phrase(&self, id: &str) -> Option<&[GrammarNode]> {
        self.phrases.get(id).map(Vec::as_slice)
    }

    pub fn phraseset(&self, id: &str) -> Option<&[Vec<GrammarNode>]> {
        self.phrasesets.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.phrases.len() + self.phrasesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let doc = TemplateDocument::from_json(
            r#"{
                "phrases": {
                    "root": [
                        "The ",
                        {"type": "integer", "context": "delayed", "min": 5, "max": "60", "words": true},
                        {"type": "optional", "chance": 30, "children": ["hello"]}
                    ]
                },
                "phrasesets": { "apology": [["Sorry."], ["Apologies."]] }
            }"#,
        )
        .unwrap();

        let root = doc.phrase("root").unwrap();
        assert_eq!(root.len(), 3);
        match &root[1] {
            GrammarNode::Element(e) => {
                assert_eq!(e.kind, NodeKind::Integer);
                assert_eq!(e.attrs.get("min"), Some("5"));
                assert!(e.attrs.flag("words"));
            }
            other => panic!("unexpected node {:?}", other),
        }
        match &root[2] {
            GrammarNode::Element(e) => assert_eq!(e.children.len(), 1),
            other => panic!("unexpected node {:?}", other),
        }
        assert_eq!(doc.phraseset("apology").unwrap().len(), 2);
        assert!(doc.phrase("apology").is_none());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = TemplateDocument::from_json(r#"{"phrases": {"a": [{"type": "blink"}]}}"#);
        assert!(matches!(result, Err(GrammarError::UnknownKind(_))));
    }

    #[test]
    fn test_empty_phraseset_is_rejected() {
        let result = TemplateDocument::from_json(r#"{"phrasesets": {"a": []}}"#);
        assert!(matches!(result, Err(GrammarError::EmptyPhraseset(_))));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let result = TemplateDocument::from_json(
            r#"{"phrases": {"a": ["x"]}, "phrasesets": {"a": [["y"]]}}"#,
        );
        assert!(matches!(result, Err(GrammarError::DuplicateId(_))));
    }
}
