//! 提示渲染模块
//!
//! 把分类完成的扫描条目写回DOM：普通片段还原为文本节点，金融术语
//! 渲染为带标记属性的 `<mark>` 元素。所有替换节点先整体插入到原
//! 文本节点之前，再移除原节点，保持视觉顺序且不出现中间空态。

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::annotate::config::constants;
use crate::annotate::scanner::ScanEntry;
use crate::parsers::html::dom::{
    create_element_node, create_text_node, insert_before, is_connected, remove_node,
};

/// 提示渲染器
#[derive(Default)]
pub struct TooltipRenderer {
    term_sequence: AtomicUsize,
}

impl TooltipRenderer {
    /// 创建渲染器
    pub fn new() -> Self {
        Self {
            term_sequence: AtomicUsize::new(0),
        }
    }

    /// 渲染一个扫描条目，替换其原始文本节点
    ///
    /// 条目入队后DOM可能已被页面重排；父节点已脱离文档时跳过渲染
    /// 并返回 false。
    pub fn render_entry(&self, entry: &ScanEntry) -> bool {
        if !is_connected(&entry.parent) {
            tracing::debug!("父节点已脱离文档，跳过渲染");
            return false;
        }

        for fragment in &entry.fragments {
            let node = if fragment.is_marked() {
                self.make_term_node(&fragment.text)
            } else {
                create_text_node(&fragment.text)
            };
            insert_before(&entry.parent, &entry.original, node);
        }

        remove_node(&entry.original);
        true
    }

    /// 渲染出的金融术语数量
    pub fn count_marked(entry: &ScanEntry) -> usize {
        entry.fragments.iter().filter(|f| f.is_marked()).count()
    }

    /// 创建金融术语标记元素
    fn make_term_node(&self, text: &str) -> markup5ever_rcdom::Handle {
        let sequence = self.term_sequence.fetch_add(1, Ordering::Relaxed);
        let tooltip_id = format!("fin-term-tooltip-{sequence}");

        let node = create_element_node(
            "mark",
            vec![
                ("class", constants::TERM_CLASS),
                (constants::MARKED_ATTR, "1"),
                ("aria-describedby", tooltip_id.as_str()),
            ],
        );
        let text_node = create_text_node(text);
        text_node.parent.set(Some(std::rc::Rc::downgrade(&node)));
        node.children.borrow_mut().push(text_node);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::annotate::config::AnnotateConfig;
    use crate::annotate::scanner::TextNodeScanner;
    use crate::parsers::html::dom::{find_nodes, html_to_dom};
    use crate::parsers::html::serializer::serialize_document;

    fn render_with_flags(html: &str, flags: &[Option<bool>]) -> String {
        let dom = html_to_dom(html.as_bytes(), "utf-8".to_string());
        let body = find_nodes(&dom.document, vec!["html", "body"])
            .pop()
            .unwrap();

        let config = Arc::new(AnnotateConfig::default());
        let mut scanner = TextNodeScanner::new(config);
        let mut entries = scanner.scan(&body);

        let mut flag_iter = flags.iter();
        for entry in entries.iter_mut() {
            for fragment in entry.fragments.iter_mut().filter(|f| f.is_candidate) {
                fragment.is_financial = *flag_iter.next().expect("flag for every candidate");
            }
        }

        let renderer = TooltipRenderer::new();
        for entry in &entries {
            assert!(renderer.render_entry(entry));
        }

        String::from_utf8(serialize_document(dom, "utf-8".to_string())).unwrap()
    }

    #[test]
    fn test_financial_terms_become_marks() {
        let output = render_with_flags(
            "<html><body><p>Transfer 1,000 won!</p></body></html>",
            &[Some(true), Some(false), Some(false)],
        );

        assert!(output.contains("<mark"));
        assert!(output.contains(">Transfer</mark>"));
        // 非金融候选和填充保持普通文本
        assert!(!output.contains(">1,000</mark>"));
        assert!(!output.contains(">won</mark>"));
        assert!(output.contains("!"));
    }

    #[test]
    fn test_positional_flag_integrity() {
        let output = render_with_flags(
            "<html><body><p>A B C</p></body></html>",
            &[Some(true), Some(false), Some(true)],
        );

        assert!(output.contains(">A</mark>"));
        assert!(!output.contains(">B</mark>"));
        assert!(output.contains(">C</mark>"));
    }

    #[test]
    fn test_unclassified_candidates_stay_plain() {
        let output = render_with_flags(
            "<html><body><p>Loan today</p></body></html>",
            &[None, None],
        );
        assert!(!output.contains("<mark"));
        assert!(output.contains("Loan today"));
    }

    #[test]
    fn test_detached_parent_is_skipped() {
        let dom = html_to_dom(
            "<html><body><p>Detached fund</p></body></html>".as_bytes(),
            "utf-8".to_string(),
        );
        let body = find_nodes(&dom.document, vec!["html", "body"])
            .pop()
            .unwrap();

        let config = Arc::new(AnnotateConfig::default());
        let mut scanner = TextNodeScanner::new(config);
        let entries = scanner.scan(&body);

        // 页面重排：条目处理前其父节点被摘除
        remove_node(&entries[0].parent);

        let renderer = TooltipRenderer::new();
        assert!(!renderer.render_entry(&entries[0]));
    }

    #[test]
    fn test_term_mark_carries_marker_attr() {
        let output = render_with_flags(
            "<html><body><p>Bond</p></body></html>",
            &[Some(true)],
        );
        assert!(output.contains("data-fin-tooltipped=\"1\""));
        assert!(output.contains("class=\"fin-term\""));
        assert!(output.contains("aria-describedby="));
    }
}
