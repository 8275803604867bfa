//! 批次队列模块
//!
//! 扫描条目的FIFO队列和批次处理循环。每个处理周期从队首凑一个
//! 不超过批次上限的候选词批次提交分类，成功后按位置回填结果并
//! 渲染；失败时优先重试同一批次（最多3次、无退避），重试耗尽则
//! 放弃该批次。任一时刻只允许一个处理循环在运行。

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::time::sleep;

use crate::annotate::config::AnnotateConfig;
use crate::annotate::error::AnnotateError;
use crate::annotate::gateway::{ClassificationResult, Classifier};
use crate::annotate::renderer::TooltipRenderer;
use crate::annotate::scanner::ScanEntry;
use crate::parsers::html::dom::is_connected;

/// 队列处理统计
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    pub enqueued_entries: usize,
    pub submitted_batches: usize,
    pub submitted_terms: usize,
    pub retried_submissions: usize,
    pub abandoned_batches: usize,
    pub abandoned_entries: usize,
    pub rendered_entries: usize,
    pub marked_terms: usize,
    pub discarded_detached: usize,
}

impl QueueStats {
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

/// 凑好待提交/重试的批次
struct PendingBatch {
    entries: Vec<ScanEntry>,
    candidate_count: usize,
    attempts: usize,
}

/// 单个处理周期的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 队列为空，无事可做
    Idle,
    /// 批次已渲染完成
    Rendered { entries: usize, terms: usize },
    /// 提交失败，批次保留待重试
    Retrying { attempt: usize },
    /// 重试耗尽，批次被放弃（不渲染、不重新入队）
    Abandoned { entries: usize },
}

/// 批次处理管道
///
/// 队列和运行标志是管道仅有的共享可变状态，全部收在这个结构里，
/// 不依赖任何模块级变量。
pub struct BatchPipeline<C: Classifier> {
    classifier: C,
    renderer: TooltipRenderer,
    config: Arc<AnnotateConfig>,
    queue: VecDeque<ScanEntry>,
    pending: Option<PendingBatch>,
    running: bool,
    stats: QueueStats,
}

impl<C: Classifier> BatchPipeline<C> {
    /// 创建批次管道
    pub fn new(classifier: C, config: Arc<AnnotateConfig>) -> Self {
        Self {
            classifier,
            renderer: TooltipRenderer::new(),
            config,
            queue: VecDeque::new(),
            pending: None,
            running: false,
            stats: QueueStats::default(),
        }
    }

    /// 条目入队
    pub fn enqueue(&mut self, entry: ScanEntry) {
        self.stats.enqueued_entries += 1;
        self.queue.push_back(entry);
    }

    /// 批量入队
    pub fn enqueue_all(&mut self, entries: Vec<ScanEntry>) {
        for entry in entries {
            self.enqueue(entry);
        }
    }

    /// 队列长度
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// 队列是否为空
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// 是否还有待处理的工作（排队条目或待重试批次）
    pub fn has_backlog(&self) -> bool {
        !self.queue.is_empty() || self.pending.is_some()
    }

    /// 获取统计信息
    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    /// 运行处理循环直到队列排空
    ///
    /// 已有循环在运行时调用是无操作。积压批次背靠背处理；批次被
    /// 放弃后等待一个周期间隔再继续。
    pub async fn run_until_idle(&mut self) {
        if self.running {
            return;
        }
        self.running = true;

        loop {
            match self.process_cycle().await {
                CycleOutcome::Idle => break,
                // 重试同一批次，无退避
                CycleOutcome::Retrying { .. } => continue,
                CycleOutcome::Rendered { .. } => {
                    if !self.has_backlog() {
                        break;
                    }
                }
                CycleOutcome::Abandoned { .. } => {
                    if !self.has_backlog() {
                        break;
                    }
                    sleep(self.config.process_interval()).await;
                }
            }
        }

        self.running = false;
    }

    /// 执行一个处理周期：凑批次（或复用重试批次）、提交、回填、渲染
    pub async fn process_cycle(&mut self) -> CycleOutcome {
        // 待重试批次优先于新排队的条目
        let mut batch = match self.pending.take() {
            Some(pending) => pending,
            None => self.drain_batch(),
        };

        if batch.entries.is_empty() {
            return CycleOutcome::Idle;
        }

        if batch.candidate_count == 0 {
            // 纯填充条目无需分类，直接按原文渲染
            let (rendered, _) = self.render_entries(&batch.entries);
            return CycleOutcome::Rendered {
                entries: rendered,
                terms: 0,
            };
        }

        let terms: Vec<String> = batch
            .entries
            .iter()
            .flat_map(|entry| entry.fragments.iter())
            .filter(|fragment| fragment.is_candidate)
            .map(|fragment| fragment.text.clone())
            .collect();

        self.stats.submitted_batches += 1;
        self.stats.submitted_terms += terms.len();
        tracing::info!(
            terms = terms.len(),
            entries = batch.entries.len(),
            attempt = batch.attempts + 1,
            "提交分类批次"
        );

        let outcome = match self.classifier.classify_batch(&terms).await {
            Ok(results) if results.len() != terms.len() => Err(AnnotateError::ContractViolation {
                submitted: terms.len(),
                returned: results.len(),
            }),
            other => other,
        };

        match outcome {
            Ok(results) => {
                apply_results(&mut batch.entries, &results);
                let (rendered, marked) = self.render_entries(&batch.entries);
                tracing::info!(rendered, marked, "批次分类完成");
                CycleOutcome::Rendered {
                    entries: rendered,
                    terms: marked,
                }
            }
            Err(error) => {
                batch.attempts += 1;
                if batch.attempts > self.config.max_retry_attempts {
                    tracing::warn!(
                        error = %error,
                        entries = batch.entries.len(),
                        "批次重试次数耗尽，放弃本批次的分类"
                    );
                    self.stats.abandoned_batches += 1;
                    self.stats.abandoned_entries += batch.entries.len();
                    CycleOutcome::Abandoned {
                        entries: batch.entries.len(),
                    }
                } else {
                    tracing::warn!(
                        error = %error,
                        attempt = batch.attempts,
                        max = self.config.max_retry_attempts,
                        "批次分类失败，重试同一批次"
                    );
                    self.stats.retried_submissions += 1;
                    let attempt = batch.attempts;
                    self.pending = Some(batch);
                    CycleOutcome::Retrying { attempt }
                }
            }
        }
    }

    /// 从队首凑一个批次
    ///
    /// 父节点已脱离文档的条目在这里被静默丢弃。
    fn drain_batch(&mut self) -> PendingBatch {
        let mut entries = Vec::new();
        let mut candidate_count = 0;

        while candidate_count < self.config.batch_size {
            let Some(entry) = self.queue.pop_front() else {
                break;
            };
            if !is_connected(&entry.parent) {
                tracing::debug!("条目父节点已脱离文档，丢弃");
                self.stats.discarded_detached += 1;
                continue;
            }
            candidate_count += entry.candidate_count;
            entries.push(entry);
        }

        PendingBatch {
            entries,
            candidate_count,
            attempts: 0,
        }
    }

    fn render_entries(&mut self, entries: &[ScanEntry]) -> (usize, usize) {
        let mut rendered = 0;
        let mut marked = 0;
        for entry in entries {
            if self.renderer.render_entry(entry) {
                rendered += 1;
                marked += TooltipRenderer::count_marked(entry);
            }
        }
        self.stats.rendered_entries += rendered;
        self.stats.marked_terms += marked;
        (rendered, marked)
    }
}

/// 按位置把分类结果回填到候选片段上
///
/// 调用前必须已校验结果数量与候选数量一致；带错误标记的单项
/// 保持未分类。
fn apply_results(entries: &mut [ScanEntry], results: &[ClassificationResult]) {
    let mut result_iter = results.iter();
    for entry in entries.iter_mut() {
        for fragment in entry.fragments.iter_mut().filter(|f| f.is_candidate) {
            if let Some(result) = result_iter.next() {
                if result.error.is_none() {
                    fragment.is_financial = result.is_financial;
                }
            }
        }
    }
}
