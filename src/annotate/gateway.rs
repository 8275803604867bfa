//! 分类网关模块
//!
//! 封装远程分类/释义服务的HTTP契约。批量分类是核心管道的依赖，
//! 通过 [`Classifier`] trait 抽象，便于在测试中替换；单词释义、
//! 截图释义和菜单推荐是独立的简单流程，复用同一个客户端。

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::annotate::config::AnnotateConfig;
use crate::annotate::error::{AnnotateError, AnnotateResult};

/// 单个候选词的分类结果
///
/// 每一项要么带有金融标志，要么带有错误标记；带错误标记的词
/// 保持未分类状态。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassificationResult {
    /// 是否为金融术语
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_financial: Option<bool>,
    /// 单项错误标记
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 批量分类请求体
#[derive(Debug, Serialize)]
struct ClassifyBatchRequest<'a> {
    terms: &'a [String],
}

/// 批量分类响应体
#[derive(Debug, Deserialize)]
struct ClassifyBatchResponse {
    results: Vec<ClassificationResult>,
}

/// 单词释义结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefineResult {
    pub term: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// 菜单推荐结果
#[derive(Debug, Clone, Deserialize)]
pub struct MenuRecommendation {
    pub success: bool,
    #[serde(default)]
    pub result: Option<MenuSelection>,
}

/// 推荐出的菜单及候选
#[derive(Debug, Clone, Deserialize)]
pub struct MenuSelection {
    pub category: String,
    pub selected_menu: String,
    #[serde(default)]
    pub candidate_menus: Vec<String>,
    pub description: String,
}

/// 批量分类服务抽象
///
/// 契约：返回的结果数量和顺序必须与提交的词列表一一对应，
/// 由调用方在应用结果前校验。
pub trait Classifier {
    /// 批量分类一组候选词
    fn classify_batch(
        &self,
        terms: &[String],
    ) -> impl std::future::Future<Output = AnnotateResult<Vec<ClassificationResult>>>;
}

/// 分类网关HTTP客户端
///
/// 所有请求都不携带任何凭据。
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GatewayClient {
    /// 创建网关客户端
    pub fn new(config: &AnnotateConfig) -> AnnotateResult<Self> {
        // 基础地址规范化为带尾部斜杠，端点走相对拼接，
        // 这样带路径前缀的网关地址（如 /finapi）不会被吞掉
        let mut base_url = Url::parse(&config.api_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AnnotateError::Config(format!("构建HTTP客户端失败: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> AnnotateResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> AnnotateResult<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AnnotateError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<R>().await?)
    }

    /// 单词分类
    pub async fn classify_term(&self, term: &str) -> AnnotateResult<ClassificationResult> {
        self.post_json("classify", &serde_json::json!({ "term": term }))
            .await
    }

    /// 从文本请求术语释义
    pub async fn define_term_text(&self, term: &str) -> AnnotateResult<DefineResult> {
        self.post_json("define_term_text", &serde_json::json!({ "term": term }))
            .await
    }

    /// 从截图请求术语释义；`image` 为不带 data-URL 前缀的base64数据
    pub async fn define_term_image(&self, image: &str) -> AnnotateResult<DefineResult> {
        self.post_json("define_term_image", &serde_json::json!({ "image": image }))
            .await
    }

    /// 自然语言菜单推荐
    pub async fn recommend_menu(&self, request: &str) -> AnnotateResult<MenuRecommendation> {
        self.post_json("recommend_menu", &serde_json::json!({ "request": request }))
            .await
    }

    /// 查询内置词典中的术语定义
    pub async fn dictionary_definition(&self, term: &str) -> AnnotateResult<DefineResult> {
        let mut url = self.endpoint("fin_term_definition")?;
        url.query_pairs_mut().append_pair("term", term);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AnnotateError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        #[derive(Deserialize)]
        struct DictionaryResponse {
            results: DefineResult,
        }
        Ok(response.json::<DictionaryResponse>().await?.results)
    }
}

impl Classifier for GatewayClient {
    async fn classify_batch(&self, terms: &[String]) -> AnnotateResult<Vec<ClassificationResult>> {
        let response: ClassifyBatchResponse = self
            .post_json("classify_batch", &ClassifyBatchRequest { terms })
            .await?;
        Ok(response.results)
    }
}

/// 将截图字节编码为网关期望的base64字符串（不带 data-URL 前缀）
pub fn encode_capture_image(image_bytes: &[u8]) -> String {
    STANDARD.encode(image_bytes)
}
