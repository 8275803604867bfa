//! 文本分词模块
//!
//! 把文本节点内容切分为候选词片段和填充片段。候选词是连续的字母串
//! （允许撇号/连字符连接）或数字串（允许一组小数点/千分位），其余
//! 内容原样保留为填充片段，保证所有片段按序拼接后与原文完全一致。

use std::sync::OnceLock;

use regex::Regex;

/// 候选词匹配模式：字母串（可含撇号/连字符连接段）或数字串（可含一组 . / , 连接段）
const WORD_PATTERN: &str = r"\p{L}+(?:['’\-]\p{L}+)*|\p{N}+(?:[.,]\p{N}+)?";

fn word_regex() -> &'static Regex {
    static WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    WORD_REGEX.get_or_init(|| Regex::new(WORD_PATTERN).expect("invalid word pattern"))
}

/// 文本片段
///
/// 由分词器从一个文本节点派生；`is_financial` 仅在候选片段通过
/// 分类后才会被设置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// 是否为候选词（可提交分类）
    pub is_candidate: bool,
    /// 片段文本，与原文的对应子串逐字相同
    pub text: String,
    /// 分类结果；None 表示未分类或分类失败
    pub is_financial: Option<bool>,
}

impl Fragment {
    /// 创建候选词片段
    pub fn candidate(text: impl Into<String>) -> Self {
        Self {
            is_candidate: true,
            text: text.into(),
            is_financial: None,
        }
    }

    /// 创建填充片段
    pub fn filler(text: impl Into<String>) -> Self {
        Self {
            is_candidate: false,
            text: text.into(),
            is_financial: None,
        }
    }

    /// 片段是否被分类为金融术语
    pub fn is_marked(&self) -> bool {
        self.is_candidate && self.is_financial == Some(true)
    }
}

/// 将文本切分为有序片段序列
///
/// 空白或空输入返回空序列（调用方应直接跳过，不入队）。
/// 不变量：所有片段文本按序拼接等于输入。
pub fn tokenize(text: &str) -> Vec<Fragment> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut fragments = Vec::new();
    let mut cursor = 0;

    for token in word_regex().find_iter(text) {
        if token.start() > cursor {
            fragments.push(Fragment::filler(&text[cursor..token.start()]));
        }
        fragments.push(Fragment::candidate(token.as_str()));
        cursor = token.end();
    }

    if cursor < text.len() {
        fragments.push(Fragment::filler(&text[cursor..]));
    }

    fragments
}

/// 统计候选片段数量
pub fn candidate_count(fragments: &[Fragment]) -> usize {
    fragments.iter().filter(|f| f.is_candidate).count()
}
