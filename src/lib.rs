//! # Finmark Library
//!
//! 一个用于在银行网页HTML中标注金融术语的工具库：扫描文档文本节点，
//! 将候选词批量提交到远程分类服务，并把识别出的金融术语重写为带
//! 交互提示的标记元素。
//!
//! ## 模块组织
//!
//! - `core` - 核心功能和主要处理逻辑
//! - `parsers` - HTML解析和DOM操作
//! - `annotate` - 术语标注管道（扫描、分词、批次、渲染）

pub mod annotate;
pub mod core;
pub mod parsers;

// Re-export commonly used items for convenience
pub use crate::core::*;
pub use crate::parsers::*;
