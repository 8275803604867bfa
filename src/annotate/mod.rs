//! 金融术语标注管道
//!
//! 面向银行页面文档的标注流水线：扫描文本节点、按词切分、凑批
//! 提交远端分类、把金融术语替换为带提示标记的元素，最后注入悬浮
//! 层样式与脚本。各阶段拆成独立子模块，由 [`Annotator`] 驱动。

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod overlay;
pub mod queue;
pub mod renderer;
pub mod scanner;
pub mod tokenizer;

use std::sync::Arc;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::time::sleep;

pub use cache::{CacheStats, DefinitionCache};
pub use config::AnnotateConfig;
pub use error::{AnnotateError, AnnotateResult};
pub use gateway::{
    ClassificationResult, Classifier, DefineResult, GatewayClient, MenuRecommendation,
    MenuSelection, encode_capture_image,
};
pub use overlay::inject_overlay;
pub use queue::{BatchPipeline, CycleOutcome, QueueStats};
pub use renderer::TooltipRenderer;
pub use scanner::{ScanEntry, ScanStats, TextNodeScanner};
pub use tokenizer::{Fragment, tokenize};

/// 一次标注运行的汇总统计
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotateStats {
    pub scan: ScanStats,
    pub queue: QueueStats,
    pub passes: usize,
}

/// 标注驱动器
///
/// 持有扫描器和批次管道，按「扫描、排空、等待」的节奏推进。对
/// 增量渲染的页面可以多跑几轮，已标记的子树在后续轮次被跳过。
pub struct Annotator<C: Classifier> {
    config: Arc<AnnotateConfig>,
    scanner: TextNodeScanner,
    pipeline: BatchPipeline<C>,
    passes: usize,
}

impl<C: Classifier> Annotator<C> {
    /// 用给定分类器创建标注器
    pub fn with_classifier(classifier: C, config: Arc<AnnotateConfig>) -> Self {
        Self {
            scanner: TextNodeScanner::new(config.clone()),
            pipeline: BatchPipeline::new(classifier, config.clone()),
            config,
            passes: 0,
        }
    }

    /// 扫描一棵子树并把结果入队，返回新发现的条目数
    pub fn scan(&mut self, root: &Handle) -> usize {
        let entries = self.scanner.scan(root);
        let found = entries.len();
        tracing::debug!(found, "扫描完成，条目入队");
        self.pipeline.enqueue_all(entries);
        found
    }

    /// 排空队列（处理循环运行到空闲为止）
    pub async fn drain(&mut self) {
        self.pipeline.run_until_idle().await;
    }

    /// 对子树执行最多 `max_passes` 轮「扫描+排空」
    ///
    /// 某一轮没有发现新条目时提前结束。轮与轮之间等待一个处理
    /// 周期间隔。
    pub async fn run(&mut self, root: &Handle, max_passes: usize) {
        for pass in 0..max_passes.max(1) {
            let found = self.scan(root);
            self.passes += 1;
            if found == 0 && !self.pipeline.has_backlog() {
                tracing::debug!(pass = pass + 1, "没有新的文本节点，标注结束");
                break;
            }
            self.drain().await;
            if pass + 1 < max_passes {
                sleep(self.config.process_interval()).await;
            }
        }
    }

    pub fn stats(&self) -> AnnotateStats {
        AnnotateStats {
            scan: self.scanner.stats(),
            queue: self.pipeline.stats(),
            passes: self.passes,
        }
    }
}

impl Annotator<GatewayClient> {
    /// 创建连接远端网关的标注器
    pub fn new(config: Arc<AnnotateConfig>) -> AnnotateResult<Self> {
        let classifier = GatewayClient::new(&config)?;
        Ok(Self::with_classifier(classifier, config))
    }
}

/// 术语释义服务：网关查询前挂一层LRU缓存
pub struct DefinitionService {
    gateway: GatewayClient,
    cache: DefinitionCache,
}

impl DefinitionService {
    pub fn new(config: &AnnotateConfig) -> AnnotateResult<Self> {
        Ok(Self {
            gateway: GatewayClient::new(config)?,
            cache: DefinitionCache::with_capacity(config.definition_cache_size),
        })
    }

    /// 查询术语释义，命中缓存时不发请求
    pub async fn define(&mut self, term: &str) -> AnnotateResult<DefineResult> {
        if let Some(cached) = self.cache.get(term) {
            tracing::debug!(term, "释义缓存命中");
            return Ok(cached);
        }
        let result = self.gateway.define_term_text(term).await?;
        self.cache.put(term.to_string(), result.clone());
        Ok(result)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// 对整个文档执行标注并注入悬浮层
///
/// 库内部的便捷入口；`annotate` 子命令最终走到这里。
pub async fn annotate_dom<C: Classifier>(
    dom: &RcDom,
    classifier: C,
    config: Arc<AnnotateConfig>,
    max_passes: usize,
    with_overlay: bool,
) -> AnnotateResult<AnnotateStats> {
    let body = crate::parsers::html::dom::find_nodes(&dom.document, vec!["html", "body"])
        .pop()
        .ok_or_else(|| AnnotateError::Render("文档缺少 body 节点".to_string()))?;

    let mut annotator = Annotator::with_classifier(classifier, config.clone());
    annotator.run(&body, max_passes).await;

    if with_overlay {
        inject_overlay(dom, &config)?;
    }

    Ok(annotator.stats())
}
