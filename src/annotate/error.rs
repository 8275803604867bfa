//! 标注模块统一错误处理
//!
//! 提供结构化错误类型和可重试性判定

use thiserror::Error;

use crate::core::FinmarkError;

/// 标注错误类型
#[derive(Error, Debug, Clone)]
pub enum AnnotateError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 网关返回非成功状态
    #[error("网关错误: HTTP {status}: {message}")]
    Gateway { status: u16, message: String },

    /// 响应结果数量与提交词数不一致
    #[error("结果数量不匹配: 提交 {submitted} 个词, 返回 {returned} 个结果")]
    ContractViolation { submitted: usize, returned: usize },

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 渲染错误
    #[error("渲染错误: {0}")]
    Render(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AnnotateError {
    /// 检查错误是否可重试
    ///
    /// 批次处理把网络故障、网关非2xx和结果数量不匹配一律当作
    /// 可重试故障，其余错误直接向上传播。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnnotateError::Network(_)
                | AnnotateError::Gateway { .. }
                | AnnotateError::ContractViolation { .. }
        )
    }
}

impl From<reqwest::Error> for AnnotateError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            AnnotateError::Gateway {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            AnnotateError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for AnnotateError {
    fn from(error: serde_json::Error) -> Self {
        AnnotateError::Serialization(format!("JSON序列化错误: {error}"))
    }
}

impl From<toml::de::Error> for AnnotateError {
    fn from(error: toml::de::Error) -> Self {
        AnnotateError::Config(format!("TOML解析错误: {error}"))
    }
}

impl From<url::ParseError> for AnnotateError {
    fn from(error: url::ParseError) -> Self {
        AnnotateError::Config(format!("URL解析错误: {error}"))
    }
}

impl From<AnnotateError> for FinmarkError {
    fn from(error: AnnotateError) -> Self {
        FinmarkError::new(&error.to_string())
    }
}

impl From<FinmarkError> for AnnotateError {
    fn from(error: FinmarkError) -> Self {
        AnnotateError::Internal(error.to_string())
    }
}

/// 错误结果类型别名
pub type AnnotateResult<T> = Result<T, AnnotateError>;
