use serde::{Deserialize, Serialize};

/// 一次漫画生成请求
///
/// 每次调用只创建一次，之后不再修改，按值传入编排器。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default = "default_visual_style")]
    pub visual_style: String,
    #[serde(default = "default_age_group")]
    pub age_group: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_visual_style() -> String {
    "comic".to_string()
}

fn default_age_group() -> String {
    "child".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_user_id() -> String {
    "anonymous".to_string()
}

impl GenerationRequest {
    /// 使用默认的年龄段、语言和用户创建请求
    pub fn new(topic: impl Into<String>, visual_style: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            visual_style: visual_style.into(),
            age_group: default_age_group(),
            language: default_language(),
            user_id: default_user_id(),
        }
    }

    pub fn with_age_group(mut self, age_group: impl Into<String>) -> Self {
        self.age_group = age_group.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"topic": "Solar System and Planets"}"#).unwrap();
        assert_eq!(request.visual_style, "comic");
        assert_eq!(request.age_group, "child");
        assert_eq!(request.language, "en");
        assert_eq!(request.user_id, "anonymous");
    }

    #[test]
    fn test_builder() {
        let request = GenerationRequest::new("Volcanoes", "manga")
            .with_age_group("teen")
            .with_language("es")
            .with_user_id("system");
        assert_eq!(request.topic, "Volcanoes");
        assert_eq!(request.visual_style, "manga");
        assert_eq!(request.age_group, "teen");
        assert_eq!(request.language, "es");
        assert_eq!(request.user_id, "system");
    }
}
