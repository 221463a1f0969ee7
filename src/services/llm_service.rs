//! LLM 服务 - 业务能力层
//!
//! 只负责"用文本模型完成某件事"，不关心流程顺序。
//! 每个方法构造一段固定格式的提示词，交给 [`TextGenerator`] 生成，
//! 需要结构化结果的再交给 [`script_parser`](crate::services::script_parser) 解析。

use std::sync::Arc;

use tracing::debug;

use crate::clients::TextGenerator;
use crate::config::language_name;
use crate::error::LlmError;
use crate::models::CharacterRegistry;
use crate::services::script_parser::{parse_bullet_list, parse_character_registry};
use crate::utils::truncate_text;

/// LLM 服务
///
/// 持有文本生成后端的共享句柄，可以廉价克隆给多个 Agent。
#[derive(Clone)]
pub struct LlmService {
    generator: Arc<dyn TextGenerator>,
}

impl LlmService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// 通用文本生成
    pub async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        debug!("提示词长度: {} 字符", prompt.len());
        let text = self.generator.generate(prompt).await?;
        debug!("模型回复预览: {}", truncate_text(&text, 80));
        Ok(text)
    }

    /// 生成六个场景的教学漫画剧本
    ///
    /// # 参数
    /// - `topic`: 教学主题
    /// - `age_group`: 目标年龄段
    /// - `language`: 语言代码，已知代码会展开为语言名称
    pub async fn generate_educational_content(
        &self,
        topic: &str,
        age_group: &str,
        language: &str,
    ) -> Result<String, LlmError> {
        let language = language_name(language).unwrap_or(language);
        let prompt = format!(
            r#"Create educational content about "{topic}" suitable for {age_group} audience in {language}.

Requirements:
1. Create a 6-scene comic story that teaches about the topic
2. Include 2-3 main characters with distinct personalities
3. Each scene should have dialogue and educational content
4. Make it engaging and age-appropriate
5. Include factual information naturally in the dialogue

Format your response as:
CHARACTERS:
[List each character with name and brief description]

SCENE 1:
Character Name: [Dialogue]

SCENE 2:
Character Name: [Dialogue]

[Continue for all 6 scenes]

EDUCATIONAL_SUMMARY:
[Key learning points covered]"#
        );

        self.generate_text(&prompt).await
    }

    /// 从剧本中抽取角色表
    pub async fn extract_character_info(
        &self,
        content: &str,
    ) -> Result<CharacterRegistry, LlmError> {
        let prompt = format!(
            r#"Extract character information from this content:

{content}

For each character mentioned, provide:
- Name
- Brief personality description
- Role in the story

Format as:
CHARACTER_1:
Name: [name]
Personality: [description]
Role: [role]

[Continue for all characters]"#
        );

        let response = self.generate_text(&prompt).await?;
        Ok(parse_character_registry(&response))
    }

    /// 为一句对白生成分镜画面提示词
    pub async fn generate_visual_prompt(
        &self,
        character: &str,
        dialogue: &str,
        scene_context: &str,
        visual_style: &str,
    ) -> Result<String, LlmError> {
        let prompt = format!(
            r#"Create a detailed visual prompt for generating a {visual_style} style comic panel.

Scene: {scene_context}
Character: {character}
Dialogue: "{dialogue}"

Generate a 60-word maximum prompt that includes:
- Character appearance and expression
- Setting/background details
- Visual style elements
- Mood and atmosphere
- Comic panel composition

Make it specific enough for image generation."#
        );

        self.generate_text(&prompt).await
    }

    /// 质量评估，返回原始报告文本
    ///
    /// 报告末尾包含 `APPROVAL: YES/NO`，由调用方解析。
    pub async fn analyze_content_quality(
        &self,
        content: &str,
        topic: &str,
        age_group: &str,
    ) -> Result<String, LlmError> {
        let prompt = format!(
            r#"Analyze this educational content for quality and appropriateness:

Topic: {topic}
Target Age Group: {age_group}
Content: {content}

Evaluate on:
1. Educational Value (1-10)
2. Age Appropriateness (1-10)
3. Engagement Level (1-10)
4. Factual Accuracy (1-10)
5. Cultural Sensitivity (1-10)

Provide scores and brief explanations.
Also suggest any improvements needed.

Format as:
SCORES:
Educational Value: X/10 - [explanation]
Age Appropriateness: X/10 - [explanation]
Engagement Level: X/10 - [explanation]
Factual Accuracy: X/10 - [explanation]
Cultural Sensitivity: X/10 - [explanation]

IMPROVEMENTS:
[List specific suggestions if any]

APPROVAL: [YES/NO - whether content meets standards]"#
        );

        self.generate_text(&prompt).await
    }

    /// 生成封面提示词
    pub async fn generate_comic_poster_prompt(
        &self,
        topic: &str,
        visual_style: &str,
        characters: &[String],
    ) -> Result<String, LlmError> {
        let characters = characters.join(", ");
        let prompt = format!(
            r#"Create a compelling visual prompt for a {visual_style} style comic book cover about "{topic}".

Characters to feature: {characters}

The prompt should describe:
- Dynamic composition suitable for a cover
- All main characters in action or characteristic poses
- Title placement area
- Background that represents the topic
- {visual_style} art style elements
- Exciting, eye-catching design

Maximum 60 words for image generation."#
        );

        self.generate_text(&prompt).await
    }

    /// 生成 3~5 条学习目标
    pub async fn generate_learning_objectives(
        &self,
        topic: &str,
        age_group: &str,
    ) -> Result<Vec<String>, LlmError> {
        let prompt = format!(
            r#"Generate 3-5 specific learning objectives for a {age_group} audience learning about "{topic}".

Each objective should:
1. Be measurable and specific
2. Use appropriate action verbs (understand, identify, explain, etc.)
3. Be age-appropriate for {age_group}
4. Focus on key concepts of {topic}

Format as a simple list:
- Objective 1
- Objective 2
- etc."#
        );

        let response = self.generate_text(&prompt).await?;
        Ok(parse_bullet_list(&response))
    }
}
