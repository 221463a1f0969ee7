use std::path::{Path, PathBuf};
use std::str::FromStr;

use phf::phf_map;
use regex::Regex;
use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 支持的语言（语言代码 → 语言名称）
pub static SUPPORTED_LANGUAGES: phf::Map<&'static str, &'static str> = phf_map! {
    "en" => "English",
    "es" => "Spanish",
    "fr" => "French",
    "hi" => "Hindi",
    "ar" => "Arabic",
    "bn" => "Bengali",
    "te" => "Telugu",
    "mr" => "Marathi",
    "ta" => "Tamil",
    "ur" => "Urdu",
    "gu" => "Gujarati",
    "kn" => "Kannada",
    "or" => "Odia",
    "pa" => "Punjabi",
};

/// 根据语言代码获取语言名称，不支持时返回 None
pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES.get(code).copied()
}

/// 程序配置
///
/// 进程启动时构建一次，之后以引用的方式传入各个组件。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 文本生成（OpenAI 兼容接口）---
    pub gemini_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 文本生成失败时的最大尝试次数
    pub max_retries: usize,
    // --- 图像生成 ---
    pub image_api_base_url: String,
    pub image_model_name: String,
    /// 单次网络请求的超时时间（秒）
    pub request_timeout_secs: u64,
    // --- 数据存储 ---
    pub database_url: String,
    // --- 渲染 ---
    /// 同时渲染的分镜数量
    pub parallel_workers: usize,
    /// 静态资源根目录（图片、PDF、字体）
    pub static_folder: String,
    // --- 生成参数 ---
    pub default_age_group: String,
    pub language: String,
    // --- 日志 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
            max_retries: 3,
            image_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            image_model_name: "gemini-2.5-flash-image-preview".to_string(),
            request_timeout_secs: 120,
            database_url: "sqlite://static/edumate.sqlite".to_string(),
            parallel_workers: 3,
            static_folder: "static".to_string(),
            default_age_group: "child".to_string(),
            language: "en".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// `GEMINI_API_KEY` 是必填项，缺失时直接返回错误（启动即失败）。
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        let config = Self {
            gemini_api_key: required_env("GEMINI_API_KEY")?,
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            max_retries: parse_env("MAX_RETRIES", default.max_retries)?,
            image_api_base_url: std::env::var("IMAGE_API_BASE_URL").unwrap_or(default.image_api_base_url),
            image_model_name: std::env::var("GEMINI_IMAGE_MODEL").unwrap_or(default.image_model_name),
            request_timeout_secs: parse_env("AGENT_TIMEOUT_SECONDS", default.request_timeout_secs)?,
            database_url: std::env::var("DATABASE_URL").unwrap_or(default.database_url),
            parallel_workers: parse_env("PARALLEL_WORKERS", default.parallel_workers)?,
            static_folder: std::env::var("STATIC_FOLDER").unwrap_or(default.static_folder),
            default_age_group: std::env::var("DEFAULT_AGE_GROUP").unwrap_or(default.default_age_group),
            language: std::env::var("LANGUAGE_CODE").unwrap_or(default.language),
            verbose_logging: parse_env("VERBOSE_LOGGING", default.verbose_logging)?,
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        };
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置，未出现的字段取默认值
    ///
    /// 文件中没有写 `gemini_api_key` 时回退到环境变量。
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            AppError::File(crate::error::FileError::ReadFailed {
                path: path.display().to_string(),
                source,
            })
        })?;
        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })?;
        if config.gemini_api_key.is_empty() {
            config.gemini_api_key = required_env("GEMINI_API_KEY")?;
        }
        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "GEMINI_API_KEY".to_string(),
            });
        }
        if self.parallel_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "parallel_workers".to_string(),
                reason: "至少需要 1 个并发渲染任务".to_string(),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retries".to_string(),
                reason: "至少需要尝试 1 次".to_string(),
            });
        }
        if language_name(&self.language).is_none() {
            return Err(ConfigError::UnsupportedLanguage {
                code: self.language.clone(),
            });
        }
        Ok(())
    }

    /// PDF 输出目录
    pub fn pdf_output_folder(&self) -> PathBuf {
        Path::new(&self.static_folder).join("pdfs")
    }

    /// 图片输出目录
    pub fn image_output_folder(&self) -> PathBuf {
        Path::new(&self.static_folder).join("img").join("comic")
    }

    /// 字体目录
    pub fn font_folder(&self) -> PathBuf {
        Path::new(&self.static_folder).join("font")
    }

    /// 对白使用的字体文件
    pub fn font_path(&self) -> PathBuf {
        self.font_folder().join("animeace2_reg.ttf")
    }

    /// 创建运行所需的目录
    pub fn create_directories(&self) -> AppResult<()> {
        for dir in [
            self.pdf_output_folder(),
            self.image_output_folder(),
            self.font_folder(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| AppError::create_dir_failed(&dir, e))?;
        }
        Ok(())
    }

    /// 根据主题生成默认的 PDF 输出路径
    ///
    /// 取主题前 30 个字符，转小写，空格、连字符等非单词字符替换为下划线。
    pub fn default_output_path(&self, topic: &str) -> PathBuf {
        let mut stem: String = topic
            .chars()
            .take(30)
            .collect::<String>()
            .to_lowercase()
            .replace([' ', '-'], "_");
        if let Ok(re) = Regex::new(r"[^\w]") {
            stem = re.replace_all(&stem, "_").into_owned();
        }
        self.pdf_output_folder().join(format!("{}.pdf", stem))
    }
}

fn required_env(var_name: &str) -> Result<String, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::EnvVarNotFound {
            var_name: var_name.to_string(),
        }),
    }
}

fn parse_env<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value,
            expected_type: std::any::type_name::<T>().to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            gemini_api_key: "test-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EnvVarNotFound { .. })
        ));
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_language() {
        let config = Config {
            language: "xx".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedLanguage { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = Config {
            parallel_workers: 0,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_language_table() {
        assert_eq!(language_name("en"), Some("English"));
        assert_eq!(language_name("hi"), Some("Hindi"));
        assert_eq!(language_name("zz"), None);
    }

    #[test]
    fn test_default_output_path() {
        let config = valid_config();
        let path = config.default_output_path("Solar System and Planets");
        assert_eq!(
            path,
            Path::new("static").join("pdfs").join("solar_system_and_planets.pdf")
        );

        let long = config.default_output_path("Photo-synthesis in Green Plants and Algae");
        assert_eq!(
            long.file_name().and_then(|s| s.to_str()),
            Some("photo_synthesis_in_green_plant.pdf")
        );

        let odd = config.default_output_path("What/Why? Rain");
        assert_eq!(
            odd.file_name().and_then(|s| s.to_str()),
            Some("what_why__rain.pdf")
        );
    }

    #[test]
    fn test_toml_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            gemini_api_key = "abc"
            parallel_workers = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.parallel_workers, 5);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.language, "en");
        assert!(config.validate().is_ok());
    }
}
