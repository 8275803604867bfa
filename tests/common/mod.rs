//! 集成测试公共工具
//!
//! 提供DOM解析/序列化辅助函数和可编程的模拟分类器。

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData, RcDom};

use finmark::annotate::error::{AnnotateError, AnnotateResult};
use finmark::annotate::gateway::{ClassificationResult, Classifier};
use finmark::parsers::html::{
    find_nodes, get_node_attr, get_node_name, html_to_dom, serialize_document,
};

/// 解析HTML为DOM
pub fn parse_html(html: &str) -> RcDom {
    html_to_dom(html.as_bytes(), "utf-8".to_string())
}

/// 获取body节点
pub fn body_handle(dom: &RcDom) -> Handle {
    find_nodes(&dom.document, vec!["html", "body"])
        .pop()
        .expect("文档应包含body节点")
}

/// 序列化DOM为UTF-8字符串
pub fn serialize_to_string(dom: RcDom) -> String {
    String::from_utf8(serialize_document(dom, "utf-8".to_string())).expect("序列化结果应为UTF-8")
}

/// 收集子树中所有指定class的mark元素的文本内容
pub fn collect_marked_terms(root: &Handle, class_name: &str) -> Vec<String> {
    let mut found = Vec::new();
    collect_marked_terms_into(root, class_name, &mut found);
    found
}

fn collect_marked_terms_into(node: &Handle, class_name: &str, found: &mut Vec<String>) {
    if get_node_name(node).as_deref() == Some("mark")
        && get_node_attr(node, "class").as_deref() == Some(class_name)
    {
        found.push(node_text(node));
    }
    for child in node.children.borrow().iter() {
        collect_marked_terms_into(child, class_name, found);
    }
}

/// 收集子树的完整文本内容（不含标签）
pub fn node_text(node: &Handle) -> String {
    let mut text = String::new();
    append_node_text(node, &mut text);
    text
}

fn append_node_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        append_node_text(child, out);
    }
}

/// 模拟分类器的单次失败行为
#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    /// 模拟网络故障
    Network,
    /// 模拟网关5xx
    Gateway,
    /// 返回的结果数比提交的词数少一个
    ShortResponse,
}

/// 可编程的模拟分类器
///
/// 记录每次提交的词表；`failures` 里排队的故障按次序消耗，耗尽后
/// 恢复正常响应。`financial` 集合里的词被判为金融术语（不区分大小
/// 写），`errored` 集合里的词返回单项错误标记。
#[derive(Clone, Default)]
pub struct MockClassifier {
    calls: Rc<RefCell<Vec<Vec<String>>>>,
    financial: Rc<RefCell<HashSet<String>>>,
    errored: Rc<RefCell<HashSet<String>>>,
    failures: Rc<RefCell<VecDeque<MockFailure>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把一组词标记为金融术语
    pub fn with_financial_terms(self, terms: &[&str]) -> Self {
        {
            let mut financial = self.financial.borrow_mut();
            for term in terms {
                financial.insert(term.to_lowercase());
            }
        }
        self
    }

    /// 把一组词标记为分类出错
    pub fn with_errored_terms(self, terms: &[&str]) -> Self {
        {
            let mut errored = self.errored.borrow_mut();
            for term in terms {
                errored.insert(term.to_lowercase());
            }
        }
        self
    }

    /// 排队若干次提交故障
    pub fn with_failures(self, failures: &[MockFailure]) -> Self {
        self.failures.borrow_mut().extend(failures.iter().copied());
        self
    }

    /// 所有已记录的提交批次
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// 提交次数
    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Classifier for MockClassifier {
    async fn classify_batch(&self, terms: &[String]) -> AnnotateResult<Vec<ClassificationResult>> {
        self.calls.borrow_mut().push(terms.to_vec());

        let failure = self.failures.borrow_mut().pop_front();
        if let Some(failure) = failure {
            return match failure {
                MockFailure::Network => {
                    Err(AnnotateError::Network("连接被拒绝".to_string()))
                }
                MockFailure::Gateway => Err(AnnotateError::Gateway {
                    status: 502,
                    message: "bad gateway".to_string(),
                }),
                MockFailure::ShortResponse => Ok(terms
                    .iter()
                    .skip(1)
                    .map(|_| ClassificationResult {
                        is_financial: Some(false),
                        error: None,
                    })
                    .collect()),
            };
        }

        let financial = self.financial.borrow();
        let errored = self.errored.borrow();
        Ok(terms
            .iter()
            .map(|term| {
                let key = term.to_lowercase();
                if errored.contains(&key) {
                    ClassificationResult {
                        is_financial: None,
                        error: Some("classification failed".to_string()),
                    }
                } else {
                    ClassificationResult {
                        is_financial: Some(financial.contains(&key)),
                        error: None,
                    }
                }
            })
            .collect())
    }
}
