//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（解析、查询、节点创建与移动）
//! - `serializer`: 序列化功能

pub mod dom;
pub mod serializer;

// 重新导出主要的公共 API
pub use dom::{
    create_element_node, create_text_node, find_nodes, get_charset, get_child_node_by_name,
    get_node_attr, get_node_name, get_parent_node, get_title, html_to_dom, insert_before,
    is_connected, remove_node, set_node_attr, text_content,
};
pub use serializer::serialize_document;
