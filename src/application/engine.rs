//! Template Expansion Engine - 模板展开引擎
//!
//! 深度优先递归展开语法树，生成具体播报树。
//! 所有随机抽取的值都缓存在上下文状态中，重复展开时复用。

use chrono::NaiveTime;
use thiserror::Error;

use crate::domain::announcement::{Announcement, AnnouncementNode, ResolvedValue};
use crate::domain::context::{ContextState, Platform};
use crate::domain::database::{self, ReferenceDatabase};
use crate::domain::grammar::{GrammarElement, GrammarError, GrammarNode, NodeKind, TemplateDocument};

/// 最大递归深度，超过即视为模板自引用
pub const MAX_DEPTH: usize = 20;

/// 可折叠节点的默认出现概率（百分比）
pub const DEFAULT_CHANCE: u32 = 50;

/// 站台号为 1-16 的概率（百分比），否则为 0
pub const PLATFORM_NONZERO_CHANCE: u32 = 98;

/// 站台号带字母后缀的概率（百分比）
pub const PLATFORM_LETTER_CHANCE: u32 = 10;

pub const DEFAULT_STATIONLIST_MIN: usize = 1;
pub const DEFAULT_STATIONLIST_MAX: usize = 16;

/// 生成错误；均为致命错误，中止本次生成
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Invalid template: {0}")]
    Configuration(#[from] GrammarError),

    #[error("Recursion limit ({limit}) exceeded at '{reference}', template is self-referential")]
    RecursionLimit { reference: String, limit: usize },

    #[error("Reference database has no {0}")]
    EmptyDatabase(&'static str),
}

/// 模板展开引擎
///
/// 借用会话中的文档、数据库、上下文状态与随机源，单次展开后即丢弃
pub struct TemplateEngine<'a> {
    document: &'a TemplateDocument,
    database: &'a ReferenceDatabase,
    state: &'a mut ContextState,
    rng: &'a mut fastrand::Rng,
}

impl<'a> TemplateEngine<'a> {
    pub fn new(
        document: &'a TemplateDocument,
        database: &'a ReferenceDatabase,
        state: &'a mut ContextState,
        rng: &'a mut fastrand::Rng,
    ) -> Self {
        Self {
            document,
            database,
            state,
            rng,
        }
    }

    /// 从根引用展开（phrase 优先，其次 phraseset）
    pub fn expand(&mut self, root: &str) -> Result<Announcement, GenerateError> {
        let node = if self.document.phrase(root).is_some() {
            self.expand_phrase(root, 0)?
        } else if self.document.phraseset(root).is_some() {
            self.expand_phraseset(root, 0)?
        } else {
            tracing::warn!(reference = %root, "Unknown root reference");
            AnnouncementNode::Unknown {
                reference: root.to_string(),
            }
        };
        Ok(Announcement::new(node))
    }

    fn check_depth(reference: &str, depth: usize) -> Result<(), GenerateError> {
        if depth > MAX_DEPTH {
            return Err(GenerateError::RecursionLimit {
                reference: reference.to_string(),
                limit: MAX_DEPTH,
            });
        }
        Ok(())
    }

    fn expand_phrase(&mut self, reference: &str, depth: usize) -> Result<AnnouncementNode, GenerateError> {
        Self::check_depth(reference, depth)?;
        let document = self.document;
        let Some(body) = document.phrase(reference) else {
            tracing::warn!(reference = %reference, "Unknown phrase reference");
            return Ok(AnnouncementNode::Unknown {
                reference: reference.to_string(),
            });
        };

        let children = self.expand_children(body, depth + 1, reference)?;
        Ok(AnnouncementNode::Phrase {
            reference: reference.to_string(),
            children,
        })
    }

    fn expand_phraseset(&mut self, reference: &str, depth: usize) -> Result<AnnouncementNode, GenerateError> {
        Self::check_depth(reference, depth)?;
        let document = self.document;
        let Some(phrases) = document.phraseset(reference) else {
            tracing::warn!(reference = %reference, "Unknown phraseset reference");
            return Ok(AnnouncementNode::Unknown {
                reference: reference.to_string(),
            });
        };

        let choice = match self.state.choice(reference) {
            Some(idx) if idx < phrases.len() => idx,
            _ => {
                let idx = self.rng.usize(..phrases.len());
                self.state.set_choice(reference, idx);
                idx
            }
        };

        let path = format!("{}.{}", reference, choice);
        let children = self.expand_children(&phrases[choice], depth + 1, &path)?;
        Ok(AnnouncementNode::Phraseset {
            reference: reference.to_string(),
            choice,
            children,
        })
    }

    fn expand_children(
        &mut self,
        nodes: &[GrammarNode],
        depth: usize,
        path: &str,
    ) -> Result<Vec<AnnouncementNode>, GenerateError> {
        nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| self.expand_node(node, depth, &format!("{}/{}", path, idx)))
            .collect()
    }

    fn expand_node(
        &mut self,
        node: &GrammarNode,
        depth: usize,
        path: &str,
    ) -> Result<AnnouncementNode, GenerateError> {
        let element = match node {
            GrammarNode::Text(text) => return Ok(AnnouncementNode::Text(text.clone())),
            GrammarNode::Element(element) => element,
        };

        let context = element.context().to_string();
        let node = match element.kind {
            NodeKind::Phrase | NodeKind::Phraseset => return self.expand_reference(element, depth),
            NodeKind::Optional => {
                let key = element.attrs.get("context").unwrap_or(path).to_string();
                let collapsed = self.collapsed(element, &key)?;
                let children = self.expand_children(&element.children, depth + 1, path)?;
                AnnouncementNode::Optional {
                    key,
                    collapsed,
                    children,
                }
            }
            NodeKind::Coach => value(context.clone(), ResolvedValue::Coach(self.coach(&context))),
            NodeKind::Excuse => {
                let excuse = self.excuse(&context)?;
                value(context, ResolvedValue::Excuse(excuse))
            }
            NodeKind::Integer => {
                let resolved = self.integer(element, &context)?;
                value(context, resolved)
            }
            NodeKind::Named => {
                let named = self.named(&context)?;
                value(context, ResolvedValue::Named(named))
            }
            NodeKind::Platform => {
                let platform = self.platform(&context);
                value(context, ResolvedValue::Platform(platform))
            }
            NodeKind::Service => {
                let service = self.service(&context)?;
                value(context, ResolvedValue::Service(service))
            }
            NodeKind::Station => {
                let code = self.station(&context)?;
                let name = self.database.station_name(&code);
                value(context, ResolvedValue::Station { code, name })
            }
            NodeKind::StationList => {
                let codes = self.station_list(element, &context)?;
                let names = codes.iter().map(|c| self.database.station_name(c)).collect();
                value(context, ResolvedValue::StationList { codes, names })
            }
            NodeKind::Time => {
                let time = self.time(&context);
                value(context, ResolvedValue::Time(time))
            }
        };
        Ok(node)
    }

    /// phrase / phraseset 引用；带 chance 属性时包裹为可折叠子树
    fn expand_reference(&mut self, element: &GrammarElement, depth: usize) -> Result<AnnouncementNode, GenerateError> {
        let reference = element.attrs.required(element.kind, "ref")?.to_string();
        let chance = element.attrs.optional_num::<u32>(element.kind, "chance")?;

        // 引用自身不占层级，被引用的正文展开时计一层
        let inner = match element.kind {
            NodeKind::Phraseset => self.expand_phraseset(&reference, depth)?,
            _ => self.expand_phrase(&reference, depth)?,
        };

        if chance.is_none() {
            return Ok(inner);
        }

        let key = element.attrs.get("context").unwrap_or(&reference).to_string();
        let collapsed = self.collapsed(element, &key)?;
        Ok(AnnouncementNode::Optional {
            key,
            collapsed,
            children: vec![inner],
        })
    }

    fn collapsed(&mut self, element: &GrammarElement, key: &str) -> Result<bool, GenerateError> {
        let chance = element
            .attrs
            .optional_num::<u32>(element.kind, "chance")?
            .unwrap_or(DEFAULT_CHANCE);
        if chance > 100 {
            return Err(GrammarError::InvalidAttribute {
                kind: element.kind,
                attribute: "chance",
                value: chance.to_string(),
            }
            .into());
        }

        if let Some(collapsed) = self.state.collapsed(key) {
            return Ok(collapsed);
        }
        let collapsed = !self.chance(chance);
        self.state.set_collapsed(key, collapsed);
        Ok(collapsed)
    }

    /// 伯努利试验：以 percent% 的概率返回 true
    fn chance(&mut self, percent: u32) -> bool {
        self.rng.u32(0..100) < percent
    }

    fn coach(&mut self, context: &str) -> char {
        if let Some(coach) = self.state.coach(context) {
            return coach;
        }
        let coach = self.rng.char('A'..='Z');
        self.state.set_coach(context, coach);
        coach
    }

    fn excuse(&mut self, context: &str) -> Result<String, GenerateError> {
        if let Some(excuse) = self.state.excuse(context) {
            return Ok(excuse.to_string());
        }
        let excuse = database::pick(&mut *self.rng, &self.database.excuses)
            .cloned()
            .ok_or(GenerateError::EmptyDatabase("excuses"))?;
        self.state.set_excuse(context, excuse.clone());
        Ok(excuse)
    }

    fn named(&mut self, context: &str) -> Result<String, GenerateError> {
        if let Some(named) = self.state.named(context) {
            return Ok(named.to_string());
        }
        let named = database::pick(&mut *self.rng, &self.database.named)
            .cloned()
            .ok_or(GenerateError::EmptyDatabase("named trains"))?;
        self.state.set_named(context, named.clone());
        Ok(named)
    }

    fn service(&mut self, context: &str) -> Result<String, GenerateError> {
        if let Some(service) = self.state.service(context) {
            return Ok(service.to_string());
        }
        let service = database::pick(&mut *self.rng, &self.database.services)
            .cloned()
            .ok_or(GenerateError::EmptyDatabase("services"))?;
        self.state.set_service(context, service.clone());
        Ok(service)
    }

    fn station(&mut self, context: &str) -> Result<String, GenerateError> {
        if let Some(code) = self.state.station(context) {
            return Ok(code.to_string());
        }
        let code = self
            .database
            .pick_station(&mut *self.rng)
            .ok_or(GenerateError::EmptyDatabase("stations"))?;
        self.state.set_station(context, code.clone());
        Ok(code)
    }

    fn station_list(&mut self, element: &GrammarElement, context: &str) -> Result<Vec<String>, GenerateError> {
        let kind = element.kind;
        let min = element
            .attrs
            .optional_num::<usize>(kind, "min")?
            .unwrap_or(DEFAULT_STATIONLIST_MIN);
        let max = element
            .attrs
            .optional_num::<usize>(kind, "max")?
            .unwrap_or(DEFAULT_STATIONLIST_MAX);
        if min == 0 || min > max {
            return Err(GrammarError::InvalidAttribute {
                kind,
                attribute: "min",
                value: format!("{} (max {})", min, max),
            }
            .into());
        }

        if let Some(list) = self.state.station_list(context) {
            return Ok(list.to_vec());
        }
        if self.database.stations.is_empty() {
            return Err(GenerateError::EmptyDatabase("stations"));
        }
        let codes = self.database.pick_stations(&mut *self.rng, min, max);
        self.state.set_station_list(context, codes.clone());
        Ok(codes)
    }

    fn integer(&mut self, element: &GrammarElement, context: &str) -> Result<ResolvedValue, GenerateError> {
        let kind = element.kind;
        let min = element.attrs.required_int(kind, "min")?;
        let max = element.attrs.required_int(kind, "max")?;
        if min > max {
            return Err(GrammarError::InvalidAttribute {
                kind,
                attribute: "max",
                value: max.to_string(),
            }
            .into());
        }

        let value = match self.state.integer(context) {
            Some(value) => value,
            None => {
                let value = self.rng.i64(min..=max);
                self.state.set_integer(context, value);
                value
            }
        };

        Ok(ResolvedValue::Integer {
            value,
            singular: element.attrs.get("singular").map(str::to_string),
            plural: element.attrs.get("plural").map(str::to_string),
            words: element.attrs.flag("words"),
        })
    }

    fn platform(&mut self, context: &str) -> Platform {
        if let Some(platform) = self.state.platform(context) {
            return platform;
        }
        let number = if self.chance(PLATFORM_NONZERO_CHANCE) {
            self.rng.u8(1..=16)
        } else {
            0
        };
        let letter = if self.chance(PLATFORM_LETTER_CHANCE) {
            Some(self.rng.char('A'..='C'))
        } else {
            None
        };
        let platform = Platform::new(number, letter);
        self.state.set_platform(context, platform);
        platform
    }

    fn time(&mut self, context: &str) -> NaiveTime {
        if let Some(time) = self.state.time(context) {
            return time;
        }
        let hour = self.rng.u32(0..24);
        let minute = self.rng.u32(0..60);
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        self.state.set_time(context, time);
        time
    }
}

fn value(context: String, value: ResolvedValue) -> AnnouncementNode {
    AnnouncementNode::Value { context, value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> ReferenceDatabase {
        ReferenceDatabase::from_json(
            r#"{
                "excuses": ["a signal failure", "leaves on the line"],
                "named": ["The Flying Scotsman"],
                "services": ["Southern", "Thameslink"],
                "stations": {"VIC": "London Victoria", "BTN": "Brighton", "CLJ": "Clapham Junction", "GTW": "Gatwick Airport"}
            }"#,
        )
        .unwrap()
    }

    fn expand(doc: &TemplateDocument, state: &mut ContextState, seed: u64) -> Result<Announcement, GenerateError> {
        let db = database();
        let mut rng = fastrand::Rng::with_seed(seed);
        TemplateEngine::new(doc, &db, state, &mut rng).expand("root")
    }

    fn single(element: GrammarElement) -> TemplateDocument {
        let mut doc = TemplateDocument::new();
        doc.add_phrase("root", vec![element.into()]).unwrap();
        doc
    }

    fn root_children(announcement: &Announcement) -> &[AnnouncementNode] {
        match &announcement.root {
            AnnouncementNode::Phrase { children, .. } => children,
            other => panic!("unexpected root {:?}", other),
        }
    }

    #[test]
    fn test_integer_within_bounds() {
        let doc = single(
            GrammarElement::new(NodeKind::Integer)
                .attr("context", "delayed")
                .attr("min", "5")
                .attr("max", "9"),
        );
        for seed in 0..500 {
            let mut state = ContextState::new();
            expand(&doc, &mut state, seed).unwrap();
            let n = state.integer("delayed").unwrap();
            assert!((5..=9).contains(&n), "{} out of range", n);
        }
    }

    #[test]
    fn test_coach_named_service_draws() {
        let mut doc = TemplateDocument::new();
        doc.add_phrase(
            "root",
            vec![
                GrammarElement::new(NodeKind::Coach).into(),
                GrammarElement::new(NodeKind::Named).into(),
                GrammarElement::new(NodeKind::Service).into(),
            ],
        )
        .unwrap();
        let db = database();

        for seed in 0..500 {
            let mut state = ContextState::new();
            expand(&doc, &mut state, seed).unwrap();
            let coach = state.coach("coach").unwrap();
            assert!(coach.is_ascii_uppercase(), "coach {}", coach);
            assert!(db.named.iter().any(|n| Some(n.as_str()) == state.named("named")));
            assert!(db.services.iter().any(|s| Some(s.as_str()) == state.service("service")));
        }
    }

    #[test]
    fn test_time_within_day() {
        use chrono::Timelike;

        let doc = single(GrammarElement::new(NodeKind::Time).attr("context", "main"));
        let mut hours = std::collections::HashSet::new();
        for seed in 0..2_000 {
            let mut state = ContextState::new();
            expand(&doc, &mut state, seed).unwrap();
            let time = state.time("main").unwrap();
            assert!(time.hour() <= 23);
            assert!(time.minute() <= 59);
            assert_eq!(time.second(), 0);
            hours.insert(time.hour());
        }
        // 所有小时都能抽到
        assert_eq!(hours.len(), 24);
    }

    #[test]
    fn test_integer_missing_max_is_fatal() {
        let doc = single(GrammarElement::new(NodeKind::Integer).attr("min", "5"));
        let result = expand(&doc, &mut ContextState::new(), 1);
        assert!(matches!(
            result,
            Err(GenerateError::Configuration(GrammarError::MissingAttribute { attribute: "max", .. }))
        ));
    }

    #[test]
    fn test_optional_chance_extremes() {
        let always = single(GrammarElement::new(NodeKind::Optional).attr("chance", "100").child("x"));
        let never = single(GrammarElement::new(NodeKind::Optional).attr("chance", "0").child("x"));

        for seed in 0..200 {
            let a = expand(&always, &mut ContextState::new(), seed).unwrap();
            assert!(matches!(root_children(&a)[0], AnnouncementNode::Optional { collapsed: false, .. }));
            let b = expand(&never, &mut ContextState::new(), seed).unwrap();
            assert!(matches!(root_children(&b)[0], AnnouncementNode::Optional { collapsed: true, .. }));
        }
    }

    #[test]
    fn test_platform_zero_probability() {
        let doc = single(GrammarElement::new(NodeKind::Platform));
        let trials = 20_000;
        let mut zeros = 0;
        let mut rng = fastrand::Rng::with_seed(42);
        let db = database();

        for _ in 0..trials {
            let mut state = ContextState::new();
            TemplateEngine::new(&doc, &db, &mut state, &mut rng).expand("root").unwrap();
            let platform = state.platform("platform").unwrap();
            assert!(platform.number <= 16);
            if let Some(letter) = platform.letter {
                assert!(('A'..='C').contains(&letter));
            }
            if platform.number == 0 {
                zeros += 1;
            }
        }

        let ratio = zeros as f64 / trials as f64;
        assert!((0.01..0.03).contains(&ratio), "zero ratio {}", ratio);
    }

    #[test]
    fn test_cached_values_are_reused() {
        let doc = single(GrammarElement::new(NodeKind::Station).attr("context", "destination"));
        let mut state = ContextState::new();
        state.set_station("destination", "BTN");
        let a = expand(&doc, &mut state, 3).unwrap();
        let b = expand(&doc, &mut state, 99).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_text(), "Brighton");
    }

    #[test]
    fn test_unknown_reference_is_recovered() {
        let doc = single(GrammarElement::new(NodeKind::Phrase).attr("ref", "nowhere"));
        let a = expand(&doc, &mut ContextState::new(), 1).unwrap();
        assert!(matches!(&root_children(&a)[0], AnnouncementNode::Unknown { reference } if reference == "nowhere"));
    }

    #[test]
    fn test_self_reference_hits_recursion_limit() {
        let doc = single(GrammarElement::new(NodeKind::Phrase).attr("ref", "root"));
        let result = expand(&doc, &mut ContextState::new(), 1);
        assert!(matches!(result, Err(GenerateError::RecursionLimit { .. })));
    }

    /// root → p1 → … → p<n> → "leaf"
    fn chain(n: usize) -> TemplateDocument {
        let mut doc = TemplateDocument::new();
        doc.add_phrase("root", vec![GrammarElement::new(NodeKind::Phrase).attr("ref", "p1").into()])
            .unwrap();
        for i in 1..n {
            let next = format!("p{}", i + 1);
            doc.add_phrase(
                &format!("p{}", i),
                vec![GrammarElement::new(NodeKind::Phrase).attr("ref", next.as_str()).into()],
            )
            .unwrap();
        }
        doc.add_phrase(&format!("p{}", n), vec!["leaf".into()]).unwrap();
        doc
    }

    #[test]
    fn test_nesting_depth_counts_references() {
        let a = expand(&chain(MAX_DEPTH), &mut ContextState::new(), 1).unwrap();
        assert_eq!(a.to_text(), "Leaf");

        let result = expand(&chain(MAX_DEPTH + 1), &mut ContextState::new(), 1);
        assert!(matches!(
            result,
            Err(GenerateError::RecursionLimit { ref reference, limit: MAX_DEPTH }) if reference == "p21"
        ));
    }

    #[test]
    fn test_phraseset_choice_recorded() {
        let mut doc = TemplateDocument::new();
        doc.add_phrase("root", vec![GrammarElement::new(NodeKind::Phraseset).attr("ref", "greeting").into()])
            .unwrap();
        doc.add_phraseset("greeting", vec![vec!["hello".into()], vec!["good morning".into()]])
            .unwrap();

        let mut state = ContextState::new();
        state.set_choice("greeting", 1);
        let a = expand(&doc, &mut state, 5).unwrap();
        assert_eq!(a.to_text(), "Good morning");

        state.forget("choice:greeting");
        expand(&doc, &mut state, 5).unwrap();
        assert!(state.choice("greeting").is_some());
    }

    #[test]
    fn test_stationlist_distinct_within_bounds() {
        let doc = single(
            GrammarElement::new(NodeKind::StationList)
                .attr("context", "calling")
                .attr("min", "2")
                .attr("max", "3"),
        );
        for seed in 0..100 {
            let mut state = ContextState::new();
            expand(&doc, &mut state, seed).unwrap();
            let list = state.station_list("calling").unwrap().to_vec();
            assert!((2..=3).contains(&list.len()));
            let mut dedup = list.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), list.len());
        }
    }

    #[test]
    fn test_chance_on_reference_wraps_optional() {
        let mut doc = TemplateDocument::new();
        doc.add_phrase(
            "root",
            vec![GrammarElement::new(NodeKind::Phrase).attr("ref", "extra").attr("chance", "100").into()],
        )
        .unwrap();
        doc.add_phrase("extra", vec!["mind the gap".into()]).unwrap();

        let a = expand(&doc, &mut ContextState::new(), 1).unwrap();
        assert!(matches!(
            &root_children(&a)[0],
            AnnouncementNode::Optional { key, collapsed: false, .. } if key == "extra"
        ));
        assert_eq!(a.to_text(), "Mind the gap");
    }
}
