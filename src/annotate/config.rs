//! 标注管道配置模块
//!
//! 提供批次大小、轮询间隔、跳过标签等所有可调参数，支持TOML文件
//! 加载和环境变量覆盖。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::annotate::error::{AnnotateError, AnnotateResult};

/// 配置常量
pub mod constants {
    /// 单个批次允许的最大候选词数量
    pub const BATCH_SIZE: usize = 100;
    /// 队列空闲时两次处理周期之间的间隔（毫秒）
    pub const PROCESS_INTERVAL_MS: u64 = 1000;
    /// 批次提交失败后的最大额外重试次数
    pub const MAX_RETRY_ATTEMPTS: usize = 3;
    /// 网关单次请求超时（秒）
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    /// 默认分类网关地址
    pub const DEFAULT_API_URL: &str = "https://localhost:5001";
    /// 悬停多久后弹出提示气泡（毫秒）
    pub const HOVER_DWELL_MS: u64 = 700;
    /// 离开术语和气泡后多久隐藏气泡（毫秒）
    pub const HIDE_DELAY_MS: u64 = 300;
    /// 单词定义结果缓存条目上限
    pub const DEFINITION_CACHE_SIZE: usize = 256;

    /// 不参与文本扫描的标签
    pub const SKIP_TAGS: &[&str] = &[
        "script", "style", "noscript", "iframe", "meta", "input", "textarea", "svg", "select",
    ];

    /// 已入队文本节点父元素的标记属性
    pub const ENQUEUED_ATTR: &str = "data-fin-enqueued";
    /// 已渲染术语元素的标记属性
    pub const MARKED_ATTR: &str = "data-fin-tooltipped";
    /// 术语元素的class名
    pub const TERM_CLASS: &str = "fin-term";

    /// 标注器自身UI区域的元素id，扫描时整体排除
    pub const UI_REGION_IDS: &[&str] = &[
        "finmark-toolbar",
        "finmark-tooltip-bubble",
        "finmark-tooltip-result-modal",
        "finmark-capture-modal",
        "finmark-menu-finder-modal",
        "finmark-overlay-style",
        "finmark-overlay-script",
    ];
}

// 串行化读写 FINMARK_* 环境变量的测试
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// 标注管道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateConfig {
    /// 分类网关基础地址
    pub api_url: String,
    /// 单个批次的最大候选词数量
    pub batch_size: usize,
    /// 空闲周期间隔（毫秒）
    pub process_interval_ms: u64,
    /// 批次失败后的最大额外重试次数
    pub max_retry_attempts: usize,
    /// 网关请求超时（秒）
    pub request_timeout_secs: u64,
    /// 悬停触发延迟（毫秒）
    pub hover_dwell_ms: u64,
    /// 气泡隐藏延迟（毫秒）
    pub hide_delay_ms: u64,
    /// 不扫描的标签
    pub skip_tags: Vec<String>,
    /// 扫描时排除的UI区域元素id
    pub ui_region_ids: Vec<String>,
    /// 单词定义缓存条目上限
    pub definition_cache_size: usize,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            api_url: constants::DEFAULT_API_URL.to_string(),
            batch_size: constants::BATCH_SIZE,
            process_interval_ms: constants::PROCESS_INTERVAL_MS,
            max_retry_attempts: constants::MAX_RETRY_ATTEMPTS,
            request_timeout_secs: constants::REQUEST_TIMEOUT_SECS,
            hover_dwell_ms: constants::HOVER_DWELL_MS,
            hide_delay_ms: constants::HIDE_DELAY_MS,
            skip_tags: constants::SKIP_TAGS.iter().map(|s| s.to_string()).collect(),
            ui_region_ids: constants::UI_REGION_IDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            definition_cache_size: constants::DEFINITION_CACHE_SIZE,
        }
    }
}

impl AnnotateConfig {
    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> AnnotateResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AnnotateError::Config(format!("读取配置文件失败 {}: {e}", path.as_ref().display()))
        })?;
        let config: AnnotateConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 加载配置：默认值 → 可选TOML文件 → 环境变量覆盖
    pub fn load(config_path: Option<&Path>) -> AnnotateResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 应用 FINMARK_* 环境变量覆盖
    pub fn apply_env_overrides(&mut self) -> AnnotateResult<()> {
        if let Ok(api_url) = std::env::var("FINMARK_API_URL") {
            self.api_url = api_url;
        }
        if let Ok(batch_size) = std::env::var("FINMARK_BATCH_SIZE") {
            self.batch_size = batch_size
                .parse()
                .map_err(|_| AnnotateError::Config(format!("无效的批次大小: {batch_size}")))?;
        }
        if let Ok(interval) = std::env::var("FINMARK_PROCESS_INTERVAL_MS") {
            self.process_interval_ms = interval
                .parse()
                .map_err(|_| AnnotateError::Config(format!("无效的周期间隔: {interval}")))?;
        }
        if let Ok(timeout) = std::env::var("FINMARK_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout
                .parse()
                .map_err(|_| AnnotateError::Config(format!("无效的请求超时: {timeout}")))?;
        }
        Ok(())
    }

    /// 校验配置取值
    pub fn validate(&self) -> AnnotateResult<()> {
        if self.batch_size == 0 {
            return Err(AnnotateError::Config("批次大小必须大于0".to_string()));
        }
        if self.api_url.trim().is_empty() {
            return Err(AnnotateError::Config("网关地址不能为空".to_string()));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| AnnotateError::Config(format!("无效的网关地址 {}: {e}", self.api_url)))?;
        Ok(())
    }

    /// 空闲周期间隔
    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms)
    }

    /// 网关请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 标签是否在跳过列表中
    pub fn is_skip_tag(&self, tag_name: &str) -> bool {
        self.skip_tags.iter().any(|t| t == tag_name)
    }

    /// 元素id是否属于标注器自身的UI区域
    pub fn is_ui_region(&self, element_id: &str) -> bool {
        self.ui_region_ids.iter().any(|id| id == element_id)
    }
}
