//! 文本生成客户端
//!
//! ## 职责
//! - 定义文本生成后端的统一接口 [`TextGenerator`]
//! - 通过 OpenAI 兼容接口调用 Gemini 文本模型
//! - 失败时按指数退避重试，重试耗尽后返回带最后一次错误的 [`LlmError::RetriesExhausted`]

use std::future::Future;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;

/// 文本生成后端
///
/// 实现者自行负责重试，调用方拿到的错误都是最终错误。
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 根据提示词生成文本
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// 基于 async-openai 的文本生成客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_retries: usize,
    base_delay: Duration,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.gemini_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            max_retries: config.max_retries.max(1),
            base_delay: Duration::from_secs(1),
        }
    }

    /// 单次调用，不重试
    async fn chat_once(&self, user_message: &str) -> Result<String, LlmError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| LlmError::RequestBuildFailed {
                source: Box::new(e),
            })?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(0.7)
            .top_p(0.9)
            .max_tokens(2048u32)
            .build()
            .map_err(|e| LlmError::RequestBuildFailed {
                source: Box::new(e),
            })?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::ApiCallFailed {
                model: self.model_name.clone(),
                source: Box::new(e),
            })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        debug!("LLM API 调用成功");
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        retry_with_backoff(self.max_retries, self.base_delay, || self.chat_once(prompt)).await
    }
}

/// 指数退避重试
///
/// 第 n 次失败后等待 `base_delay * 2^n`，共尝试 `max_attempts` 次。
pub(crate) async fn retry_with_backoff<F, Fut>(
    max_attempts: usize,
    base_delay: Duration,
    mut operation: F,
) -> Result<String, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, LlmError>>,
{
    let attempts = max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        match operation().await {
            Ok(text) => return Ok(text),
            Err(e) => {
                last_error = e.to_string();
                if attempt + 1 < attempts {
                    let delay = base_delay * 2u32.saturating_pow(attempt as u32);
                    warn!(
                        "⚠️ LLM 调用失败 (第 {}/{} 次)，{:?} 后重试: {}",
                        attempt + 1,
                        attempts,
                        delay,
                        last_error
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(LlmError::RetriesExhausted {
        attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn empty_error() -> LlmError {
        LlmError::EmptyContent {
            model: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = retry_with_backoff(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(empty_error())
                } else {
                    Ok("ok".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted_keeps_last_error() {
        let calls = AtomicUsize::new(0);
        let result = retry_with_backoff(2, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(empty_error()) }
        })
        .await;

        match result {
            Err(LlmError::RetriesExhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("test-model"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    #[ignore] // 需要真实的 GEMINI_API_KEY
    async fn test_live_generate() {
        let _ = tracing_subscriber::fmt::try_init();
        let config = Config::from_env().expect("GEMINI_API_KEY 未设置");
        let client = LlmClient::new(&config);
        let text = client.generate("Say hello in one word.").await.unwrap();
        assert!(!text.is_empty());
    }
}
