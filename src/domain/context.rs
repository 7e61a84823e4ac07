//! Context State - 上下文状态
//!
//! context-key → 最近一次选取的值。
//! 由模板引擎写入，由 Token 解析器读取，外部选择器可覆盖。
//! 同一 key 的多次引用保持一致。

use chrono::NaiveTime;
use std::collections::HashMap;
use std::fmt;

/// 站台号：数字 0-16，可带 A-C 后缀
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Platform {
    pub number: u8,
    pub letter: Option<char>,
}

impl Platform {
    pub fn new(number: u8, letter: Option<char>) -> Self {
        Self { number, letter }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.letter {
            Some(letter) => write!(f, "{}{}", self.number, letter),
            None => write!(f, "{}", self.number),
        }
    }
}

/// 上下文值
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Coach(char),
    Excuse(String),
    Integer(i64),
    Named(String),
    Platform(Platform),
    Service(String),
    Station(String),
    StationList(Vec<String>),
    Time(NaiveTime),
    /// phraseset 选中的 phrase 下标
    Choice(usize),
    /// 可折叠子树是否折叠
    Collapsed(bool),
}

/// 上下文状态
///
/// key 的命名空间由值类型决定，例如 `station:destination`、`choice:apology`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextState {
    values: HashMap<String, ContextValue>,
}

pub mod namespace {
    pub const COACH: &str = "coach";
    pub const EXCUSE: &str = "excuse";
    pub const INTEGER: &str = "integer";
    pub const NAMED: &str = "named";
    pub const PLATFORM: &str = "platform";
    pub const SERVICE: &str = "service";
    pub const STATION: &str = "station";
    pub const STATION_LIST: &str = "stationlist";
    pub const TIME: &str = "time";
    pub const CHOICE: &str = "choice";
    pub const COLLAPSED: &str = "collapsed";
}

/// 组合完整 key
pub fn context_key(namespace: &str, context: &str) -> String {
    format!("{}:{}", namespace, context)
}

impl ContextState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: ContextValue) {
        let key = key.into();
        tracing::trace!(key = %key, value = ?value, "Context value set");
        self.values.insert(key, value);
    }

    /// 遗忘一个 key，下次展开时重新抽取
    pub fn forget(&mut self, key: &str) -> Option<ContextValue> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn lookup(&self, ns: &str, context: &str) -> Option<&ContextValue> {
        self.values.get(&context_key(ns, context))
    }

    // Typed accessors

    pub fn coach(&self, context: &str) -> Option<char> {
        match self.lookup(namespace::COACH, context) {
            Some(ContextValue::Coach(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn set_coach(&mut self, context: &str, coach: char) {
        self.set(context_key(namespace::COACH, context), ContextValue::Coach(coach));
    }

    pub fn excuse(&self, context: &str) -> Option<&str> {
        match self.lookup(namespace::EXCUSE, context) {
            Some(ContextValue::Excuse(s)) => Some(s),
            _ => None,
        }
    }

    pub fn set_excuse(&mut self, context: &str, excuse: impl Into<String>) {
        self.set(
            context_key(namespace::EXCUSE, context),
            ContextValue::Excuse(excuse.into()),
        );
    }

    pub fn integer(&self, context: &str) -> Option<i64> {
        match self.lookup(namespace::INTEGER, context) {
            Some(ContextValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn set_integer(&mut self, context: &str, value: i64) {
        self.set(context_key(namespace::INTEGER, context), ContextValue::Integer(value));
    }

    pub fn named(&self, context: &str) -> Option<&str> {
        match self.lookup(namespace::NAMED, context) {
            Some(ContextValue::Named(s)) => Some(s),
            _ => None,
        }
    }

    pub fn set_named(&mut self, context: &str, named: impl Into<String>) {
        self.set(
            context_key(namespace::NAMED, context),
            ContextValue::Named(named.into()),
        );
    }

    pub fn platform(&self, context: &str) -> Option<Platform> {
        match self.lookup(namespace::PLATFORM, context) {
            Some(ContextValue::Platform(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn set_platform(&mut self, context: &str, platform: Platform) {
        self.set(
            context_key(namespace::PLATFORM, context),
            ContextValue::Platform(platform),
        );
    }

    pub fn service(&self, context: &str) -> Option<&str> {
        match self.lookup(namespace::SERVICE, context) {
            Some(ContextValue::Service(s)) => Some(s),
            _ => None,
        }
    }

    pub fn set_service(&mut self, context: &str, service: impl Into<String>) {
        self.set(
            context_key(namespace::SERVICE, context),
            ContextValue::Service(service.into()),
        );
    }

    pub fn station(&self, context: &str) -> Option<&str> {
        match self.lookup(namespace::STATION, context) {
            Some(ContextValue::Station(s)) => Some(s),
            _ => None,
        }
    }

    pub fn set_station(&mut self, context: &str, code: impl Into<String>) {
        self.set(
            context_key(namespace::STATION, context),
            ContextValue::Station(code.into()),
        );
    }

    pub fn station_list(&self, context: &str) -> Option<&[String]> {
        match self.lookup(namespace::STATION_LIST, context) {
            Some(ContextValue::StationList(list)) => Some(list),
            _ => None,
        }
    }

    pub fn set_station_list(&mut self, context: &str, codes: Vec<String>) {
        self.set(
            context_key(namespace::STATION_LIST, context),
            ContextValue::StationList(codes),
        );
    }

    pub fn time(&self, context: &str) -> Option<NaiveTime> {
        match self.lookup(namespace::TIME, context) {
            Some(ContextValue::Time(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn set_time(&mut self, context: &str, time: NaiveTime) {
        self.set(context_key(namespace::TIME, context), ContextValue::Time(time));
    }

    pub fn choice(&self, reference: &str) -> Option<usize> {
        match self.lookup(namespace::CHOICE, reference) {
            Some(ContextValue::Choice(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn set_choice(&mut self, reference: &str, index: usize) {
        self.set(context_key(namespace::CHOICE, reference), ContextValue::Choice(index));
    }

    pub fn collapsed(&self, key: &str) -> Option<bool> {
        match self.lookup(namespace::COLLAPSED, key) {
            Some(ContextValue::Collapsed(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn set_collapsed(&mut self, key: &str, collapsed: bool) {
        self.set(
            context_key(namespace::COLLAPSED, key),
            ContextValue::Collapsed(collapsed),
        );
    }

    /// 切换折叠状态（展示层点击入口）；从未抽取过的 key 视为展开
    pub fn toggle_collapsed(&mut self, key: &str) -> bool {
        let collapsed = !self.collapsed(key).unwrap_or(false);
        self.set_collapsed(key, collapsed);
        collapsed
    }
}

/// 格式化为 "HH:MM"
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
