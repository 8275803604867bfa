//! DOM文本扫描模块
//!
//! 递归遍历子树，找出所有符合条件的文本节点并切分为片段。扫描器在
//! 产出每个文本节点时立即给其父元素打上"已入队"标记，保证同一棵
//! 未修改的子树重复扫描不会产生重复条目，也防止并发的定时扫描重复
//! 调度同一节点。

use std::sync::Arc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::annotate::config::{constants, AnnotateConfig};
use crate::annotate::tokenizer::{candidate_count, tokenize, Fragment};
use crate::parsers::html::dom::{get_node_attr, get_parent_node, set_node_attr};

/// 一个文本节点的扫描结果
///
/// 生命周期：扫描时创建，被批次队列消费一次，渲染后丢弃。
/// `parent` 和 `original` 只是DOM的瞬态视图，使用前必须重新检查
/// 节点是否仍连接在文档上。
#[derive(Debug, Clone)]
pub struct ScanEntry {
    /// 文本节点的父元素
    pub parent: Handle,
    /// 原始文本节点，渲染时整体替换
    pub original: Handle,
    /// 按序排列的片段，拼接后等于原文
    pub fragments: Vec<Fragment>,
    /// 候选词片段数量
    pub candidate_count: usize,
}

/// 扫描统计信息
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanStats {
    pub nodes_visited: usize,
    pub text_nodes_found: usize,
    pub entries_produced: usize,
    pub skipped_marked: usize,
    pub skipped_empty: usize,
}

impl ScanStats {
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

/// 文本节点扫描器
pub struct TextNodeScanner {
    config: Arc<AnnotateConfig>,
    stats: ScanStats,
}

impl TextNodeScanner {
    /// 创建扫描器
    pub fn new(config: Arc<AnnotateConfig>) -> Self {
        Self {
            config,
            stats: ScanStats::default(),
        }
    }

    /// 扫描子树，返回本次新发现的扫描条目
    ///
    /// 每次调用都是一个完整的扫描趟；可以在定时器上反复调用同一个
    /// 根节点，已入队的区域会被标记跳过。
    pub fn scan(&mut self, root: &Handle) -> Vec<ScanEntry> {
        let mut entries = Vec::new();
        self.visit(root, &mut entries);

        tracing::debug!(
            entries = entries.len(),
            visited = self.stats.nodes_visited,
            "文本扫描趟完成"
        );

        entries
    }

    /// 获取统计信息
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn visit(&mut self, node: &Handle, entries: &mut Vec<ScanEntry>) {
        self.stats.nodes_visited += 1;

        match node.data {
            NodeData::Element { ref name, .. } => {
                let tag_name = name.local.as_ref();

                if self.config.is_skip_tag(tag_name) {
                    return;
                }
                if element_is_marked(node) {
                    self.stats.skipped_marked += 1;
                    return;
                }
                if let Some(id) = get_node_attr(node, "id") {
                    if self.config.is_ui_region(&id) {
                        return;
                    }
                }

                for child in node.children.borrow().iter() {
                    self.visit(child, entries);
                }
            }
            NodeData::Text { ref contents } => {
                self.stats.text_nodes_found += 1;

                let text = contents.borrow().to_string();
                if text.trim().is_empty() {
                    self.stats.skipped_empty += 1;
                    return;
                }

                let parent = match get_parent_node(node) {
                    Some(parent) => parent,
                    None => return,
                };

                // 父元素在本趟中刚被兄弟文本节点标记时也不再重复入队
                if element_is_marked(&parent) {
                    self.stats.skipped_marked += 1;
                    return;
                }

                let fragments = tokenize(&text);
                if fragments.is_empty() {
                    return;
                }
                let count = candidate_count(&fragments);

                // 先标记再产出，防止重入调度
                set_node_attr(&parent, constants::ENQUEUED_ATTR, Some("1".to_string()));

                entries.push(ScanEntry {
                    parent,
                    original: node.clone(),
                    fragments,
                    candidate_count: count,
                });
                self.stats.entries_produced += 1;
            }
            _ => {
                for child in node.children.borrow().iter() {
                    self.visit(child, entries);
                }
            }
        }
    }
}

/// 元素是否带有入队或已渲染标记
fn element_is_marked(element: &Handle) -> bool {
    get_node_attr(element, constants::ENQUEUED_ATTR).is_some()
        || get_node_attr(element, constants::MARKED_ATTR).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{find_nodes, html_to_dom};

    fn scan_body(html: &str) -> (Vec<ScanEntry>, TextNodeScanner, Handle) {
        let dom = html_to_dom(html.as_bytes(), "utf-8".to_string());
        let body = find_nodes(&dom.document, vec!["html", "body"])
            .pop()
            .unwrap();
        let mut scanner = TextNodeScanner::new(Arc::new(AnnotateConfig::default()));
        let entries = scanner.scan(&body);
        (entries, scanner, body)
    }

    #[test]
    fn test_collects_eligible_text_nodes() {
        let (entries, _, _) =
            scan_body("<html><body><p>Deposit rate</p><div>Loan terms</div></body></html>");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].candidate_count, 2);
    }

    #[test]
    fn test_skips_non_content_tags() {
        let (entries, _, _) = scan_body(
            "<html><body><script>var x = 1;</script><style>p {}</style><p>Interest</p></body></html>",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fragments[0].text, "Interest");
    }

    #[test]
    fn test_skips_whitespace_only_nodes() {
        let (entries, _, _) = scan_body("<html><body><p>   </p><p>Fund</p></body></html>");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let (entries, mut scanner, body) =
            scan_body("<html><body><p>Savings account</p></body></html>");
        assert_eq!(entries.len(), 1);

        // 同一子树再扫描一遍不产生重复条目
        let second = scanner.scan(&body);
        assert!(second.is_empty());
    }

    #[test]
    fn test_marks_parent_enqueued() {
        let (entries, _, _) = scan_body("<html><body><p>Bond yield</p></body></html>");
        assert_eq!(
            get_node_attr(&entries[0].parent, constants::ENQUEUED_ATTR),
            Some("1".to_string())
        );
    }

    #[test]
    fn test_skips_ui_regions() {
        let (entries, _, _) = scan_body(
            "<html><body><div id=\"finmark-tooltip-bubble\"><span>확인하기</span></div><p>Stock</p></body></html>",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fragments[0].text, "Stock");
    }

    #[test]
    fn test_skips_already_rendered_regions() {
        let (entries, _, _) = scan_body(
            "<html><body><p data-fin-tooltipped=\"1\">Already done</p><p>Fresh</p></body></html>",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fragments[0].text, "Fresh");
    }
}
