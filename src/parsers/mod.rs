//! # 解析器模块
//!
//! 这个模块包含HTML文档解析和DOM操作相关的功能：
//!
//! - HTML解析和DOM构建
//! - DOM节点的查询、创建和修改
//! - 文档序列化
//!
//! # 模块组织
//!
//! - `html` - HTML文档解析、DOM操作、序列化

pub mod html;

// Re-export commonly used items for convenience
pub use html::{
    create_element_node, create_text_node, find_nodes, get_charset, get_child_node_by_name,
    get_node_attr, get_node_name, get_parent_node, get_title, html_to_dom, insert_before,
    is_connected, remove_node, serialize_document, set_node_attr, text_content,
};
