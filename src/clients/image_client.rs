//! 图像生成客户端
//!
//! ## 职责
//! - 定义图像生成后端的统一接口 [`ImageGenerator`]
//! - 调用 Gemini `generateContent` 接口生成图片
//! - 将返回的 base64 图像解码后以 PNG 格式保存到输出目录

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ImageError;

/// 图像生成后端
///
/// 成功时返回已保存的图片路径 `{输出目录}/{image_name}.png`。
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// 按原始提示词生成图片
    async fn generate_image(&self, prompt: &str, image_name: &str)
        -> Result<PathBuf, ImageError>;

    /// 生成漫画封面海报
    async fn generate_comic_poster(
        &self,
        prompt: &str,
        image_name: &str,
    ) -> Result<PathBuf, ImageError> {
        self.generate_image(&poster_prompt(prompt), image_name).await
    }

    /// 生成指定画风的漫画分镜
    async fn generate_comic_panel(
        &self,
        prompt: &str,
        image_name: &str,
        character_style: &str,
    ) -> Result<PathBuf, ImageError> {
        self.generate_image(&panel_prompt(prompt, character_style), image_name)
            .await
    }
}

/// 封面提示词增强
pub fn poster_prompt(prompt: &str) -> String {
    format!(
        "Create a comic book style poster with vibrant colors and dynamic composition: {}. \
         Make it high quality digital art in professional comic book illustration style.",
        prompt
    )
}

/// 分镜提示词增强
pub fn panel_prompt(prompt: &str, character_style: &str) -> String {
    format!(
        "Create a {} style comic panel: {}. Use clean art style with bright colors \
         in comic book illustration format. Make it professional digital art.",
        character_style, prompt
    )
}

// ========== Gemini 响应结构 ==========

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

/// 从响应中取出第一张图片的原始字节
fn extract_image_bytes(response: GenerateContentResponse) -> Result<Vec<u8>, ImageError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(ImageError::NoCandidates)?;

    let inline = candidate
        .content
        .into_iter()
        .flat_map(|content| content.parts)
        .find_map(|part| part.inline_data)
        .ok_or(ImageError::NoImageData)?;

    debug!("图像 MIME 类型: {:?}", inline.mime_type);

    STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| ImageError::DecodeFailed {
            source: Box::new(e),
        })
}

/// 解码图片字节并保存为 PNG
fn save_as_png(bytes: &[u8], path: &Path) -> Result<(), ImageError> {
    let img = image::load_from_memory(bytes).map_err(|e| ImageError::DecodeFailed {
        source: Box::new(e),
    })?;
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| ImageError::SaveFailed {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}

/// Gemini 图像生成客户端
pub struct GeminiImageClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model_name: String,
    output_folder: PathBuf,
}

impl GeminiImageClient {
    /// 创建新的图像客户端
    pub fn new(config: &Config) -> Result<Self, ImageError> {
        if config.gemini_api_key.trim().is_empty() {
            return Err(ImageError::Unavailable);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ImageError::RequestFailed {
                model: config.image_model_name.clone(),
                source: Box::new(e),
            })?;

        Ok(Self {
            http,
            api_key: config.gemini_api_key.clone(),
            base_url: config.image_api_base_url.trim_end_matches('/').to_string(),
            model_name: config.image_model_name.clone(),
            output_folder: config.image_output_folder(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model_name)
    }

    fn request_failed(&self, e: reqwest::Error) -> ImageError {
        ImageError::RequestFailed {
            model: self.model_name.clone(),
            source: Box::new(e),
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageClient {
    async fn generate_image(
        &self,
        prompt: &str,
        image_name: &str,
    ) -> Result<PathBuf, ImageError> {
        debug!("调用图像 API，模型: {}，图片: {}", self.model_name, image_name);

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_failed(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::BadResponse {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| self.request_failed(e))?;
        let bytes = extract_image_bytes(parsed)?;

        tokio::fs::create_dir_all(&self.output_folder)
            .await
            .map_err(|e| ImageError::SaveFailed {
                path: self.output_folder.clone(),
                source: Box::new(e),
            })?;
        let path = self.output_folder.join(format!("{}.png", image_name));

        // 解码和 PNG 编码都是 CPU 计算
        let target = path.clone();
        tokio::task::spawn_blocking(move || save_as_png(&bytes, &target))
            .await
            .map_err(|e| ImageError::SaveFailed {
                path: path.clone(),
                source: Box::new(e),
            })??;

        info!("✅ 图片已保存: {}", path.display());
        Ok(path)
    }
}
