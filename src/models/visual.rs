use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 画面提示词类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    /// 封面海报，scene_number 固定为 0
    Poster,
    /// 分镜画面
    Scene,
}

/// 图像生成提示词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualPrompt {
    #[serde(rename = "type")]
    pub kind: PromptKind,
    pub scene_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    pub prompt: String,
    /// 检索到的相似角色模板数量（仅作参考）
    #[serde(default)]
    pub similar_templates: usize,
}

impl VisualPrompt {
    /// 封面提示词
    pub fn poster(prompt: impl Into<String>) -> Self {
        Self {
            kind: PromptKind::Poster,
            scene_number: 0,
            character: None,
            dialogue: None,
            prompt: prompt.into(),
            similar_templates: 0,
        }
    }

    /// 单句对白对应的分镜提示词
    pub fn scene(
        scene_number: u32,
        character: impl Into<String>,
        dialogue: impl Into<String>,
        prompt: impl Into<String>,
        similar_templates: usize,
    ) -> Self {
        Self {
            kind: PromptKind::Scene,
            scene_number,
            character: Some(character.into()),
            dialogue: Some(dialogue.into()),
            prompt: prompt.into(),
            similar_templates,
        }
    }
}

/// 已渲染的画面（0 号为封面）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPanel {
    pub scene_number: u32,
    pub file_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_serializes_type_tag() {
        let poster = serde_json::to_value(VisualPrompt::poster("cover")).unwrap();
        assert_eq!(poster["type"], "poster");
        assert_eq!(poster["scene_number"], 0);
        assert!(poster.get("character").is_none());

        let scene = serde_json::to_value(VisualPrompt::scene(2, "Max", "Hi", "panel", 1)).unwrap();
        assert_eq!(scene["type"], "scene");
        assert_eq!(scene["character"], "Max");
    }
}
