//! Announcement Session - 播报会话
//!
//! 显式会话对象：持有模板文档、参考数据库、上下文状态与随机源，
//! 以引用方式交给模板引擎与 Token 解析器，不依赖任何全局状态。

use std::path::Path;
use std::sync::Arc;

use crate::domain::announcement::Announcement;
use crate::domain::context::ContextState;
use crate::domain::database::ReferenceDatabase;
use crate::domain::grammar::TemplateDocument;
use crate::domain::vox::VoxToken;

use super::engine::{GenerateError, TemplateEngine};
use super::error::ApplicationError;
use super::resolver::TokenResolver;

/// 播报会话
pub struct AnnouncementSession {
    document: Arc<TemplateDocument>,
    database: Arc<ReferenceDatabase>,
    root: String,
    state: ContextState,
    rng: fastrand::Rng,
    current: Option<Announcement>,
}

impl AnnouncementSession {
    pub fn new(
        document: Arc<TemplateDocument>,
        database: Arc<ReferenceDatabase>,
        root: impl Into<String>,
    ) -> Self {
        Self::with_rng(document, database, root, fastrand::Rng::new())
    }

    /// 固定种子，生成结果可复现
    pub fn with_seed(
        document: Arc<TemplateDocument>,
        database: Arc<ReferenceDatabase>,
        root: impl Into<String>,
        seed: u64,
    ) -> Self {
        Self::with_rng(document, database, root, fastrand::Rng::with_seed(seed))
    }

    /// 从文件加载模板文档与参考数据库；`seed` 为 None 时使用随机种子
    pub fn from_files(
        document: &Path,
        database: &Path,
        root: impl Into<String>,
        seed: Option<u64>,
    ) -> Result<Self, ApplicationError> {
        let document = Arc::new(TemplateDocument::load(document)?);
        let database = Arc::new(ReferenceDatabase::load(database)?);
        tracing::info!(
            definitions = document.len(),
            stations = database.stations.len(),
            "Templates loaded"
        );

        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Ok(Self::with_rng(document, database, root, rng))
    }

    fn with_rng(
        document: Arc<TemplateDocument>,
        database: Arc<ReferenceDatabase>,
        root: impl Into<String>,
        rng: fastrand::Rng,
    ) -> Self {
        Self {
            document,
            database,
            root: root.into(),
            state: ContextState::new(),
            rng,
            current: None,
        }
    }

    /// 清空上下文后重新生成
    pub fn generate(&mut self) -> Result<&Announcement, GenerateError> {
        self.state.clear();
        self.refresh()
    }

    /// 按当前上下文重新展开；已缓存的值全部复用
    pub fn refresh(&mut self) -> Result<&Announcement, GenerateError> {
        let announcement =
            TemplateEngine::new(&self.document, &self.database, &mut self.state, &mut self.rng)
                .expand(&self.root)?;
        tracing::debug!(root = %self.root, context_keys = self.state.len(), "Announcement expanded");
        Ok(self.current.insert(announcement))
    }

    /// 遗忘一个上下文 key 并重新展开，其余选择保持不变
    pub fn reroll(&mut self, key: &str) -> Result<&Announcement, GenerateError> {
        if self.state.forget(key).is_none() {
            tracing::debug!(key = %key, "Re-roll of a key that was never generated");
        }
        self.refresh()
    }

    /// 切换可折叠子树并重新展开
    pub fn toggle(&mut self, key: &str) -> Result<&Announcement, GenerateError> {
        self.state.toggle_collapsed(key);
        self.refresh()
    }

    /// 解析当前播报为语音 Token
    pub fn tokens(&self) -> Result<Vec<VoxToken>, ApplicationError> {
        let announcement = self
            .current
            .as_ref()
            .ok_or_else(|| ApplicationError::invalid_state("nothing has been generated yet"))?;
        Ok(TokenResolver::new(&self.state).resolve(announcement)?)
    }

    pub fn announcement(&self) -> Option<&Announcement> {
        self.current.as_ref()
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    /// 供外部选择器直接修改上下文；修改后需调用 `refresh`
    pub fn state_mut(&mut self) -> &mut ContextState {
        &mut self.state
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}
