//! 集成测试共用的假后端
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agentic_comic::clients::{ImageGenerator, TextGenerator};
use agentic_comic::config::Config;
use agentic_comic::error::{ImageError, LlmError};
use agentic_comic::infrastructure::SqliteStore;
use async_trait::async_trait;
use image::{Rgb, RgbImage};

/// 三个场景、两个角色的剧本
pub const SOLAR_SCRIPT: &str = "\
CHARACTERS:
Captain Cosmo - a brave space explorer
Luna - a curious student

SCENE 1:
Captain Cosmo: Welcome aboard Luna, today we explore the Solar System together.
Luna: Wow! How many planets are there?

SCENE 2:
Captain Cosmo: There are eight planets orbiting our Sun.

SCENE 3:
Luna: Jupiter is the biggest planet of them all!

EDUCATIONAL_SUMMARY:
The Solar System has eight planets and Jupiter is the largest.";

const CHARACTER_INFO: &str = "\
CHARACTER_1:
Name: Captain Cosmo
Personality: brave and kind
Role: guide

CHARACTER_2:
Name: Luna
Personality: curious
Role: student";

const APPROVED_ANALYSIS: &str = "\
SCORES:
Educational Value: 9/10 - clear facts

IMPROVEMENTS:
None needed

APPROVAL: YES";

const REJECTED_ANALYSIS: &str = "\
SCORES:
Educational Value: 5/10 - too thin

IMPROVEMENTS:
- Add more facts about Mars
- Simplify the vocabulary

APPROVAL: NO";

/// 按提示词内容返回固定回复的文本后端
pub struct ScriptedTextGenerator {
    script: String,
    approve: bool,
    fail_on: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTextGenerator {
    pub fn new() -> Self {
        Self {
            script: SOLAR_SCRIPT.to_string(),
            approve: true,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_script(mut self, script: &str) -> Self {
        self.script = script.to_string();
        self
    }

    /// 质检一律不通过
    pub fn rejecting(mut self) -> Self {
        self.approve = false;
        self
    }

    /// 提示词包含 `needle` 时返回错误
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, needle: &str) -> usize {
        self.calls().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl TextGenerator for ScriptedTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(prompt.to_string());

        if let Some(needle) = &self.fail_on {
            if prompt.contains(needle.as_str()) {
                return Err(LlmError::RetriesExhausted {
                    attempts: 3,
                    last_error: "scripted failure".to_string(),
                });
            }
        }

        let reply = if prompt.contains("Analyze this educational content") {
            if self.approve {
                APPROVED_ANALYSIS.to_string()
            } else {
                REJECTED_ANALYSIS.to_string()
            }
        } else if prompt.contains("Extract character information") {
            CHARACTER_INFO.to_string()
        } else if prompt.contains("Create educational content about") {
            self.script.clone()
        } else if prompt.contains("learning objectives") {
            "- Identify the eight planets\n- Explain what an orbit is\n- Compare planet sizes"
                .to_string()
        } else if prompt.contains("comic book cover") {
            "Captain Cosmo and Luna flying past Saturn on a bright cover".to_string()
        } else if prompt.contains("visual prompt") {
            "A bright superhero comic panel in outer space".to_string()
        } else {
            "OK".to_string()
        };
        Ok(reply)
    }
}

/// 永远失败的图像后端
pub struct FailingImages {
    pub calls: AtomicUsize,
}

impl FailingImages {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageGenerator for FailingImages {
    async fn generate_image(
        &self,
        _prompt: &str,
        _image_name: &str,
    ) -> Result<PathBuf, ImageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ImageError::Unavailable)
    }
}

/// 写出小尺寸纯色 PNG 的图像后端
pub struct PngImages {
    folder: PathBuf,
    pub prompts: Mutex<Vec<String>>,
}

impl PngImages {
    pub fn new(folder: &Path) -> Self {
        Self {
            folder: folder.to_path_buf(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageGenerator for PngImages {
    async fn generate_image(&self, prompt: &str, image_name: &str) -> Result<PathBuf, ImageError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        std::fs::create_dir_all(&self.folder).map_err(|e| ImageError::SaveFailed {
            path: self.folder.clone(),
            source: Box::new(e),
        })?;

        let path = self.folder.join(format!("{}.png", image_name));
        RgbImage::from_pixel(64, 48, Rgb([30, 60, 200]))
            .save(&path)
            .map_err(|e| ImageError::SaveFailed {
                path: path.clone(),
                source: Box::new(e),
            })?;
        Ok(path)
    }
}

/// 所有输出目录都指向临时目录的配置
pub fn test_config(root: &Path) -> Config {
    Config {
        gemini_api_key: "test-key".to_string(),
        static_folder: root.join("static").display().to_string(),
        output_log_file: root.join("output.txt").display().to_string(),
        parallel_workers: 2,
        ..Config::default()
    }
}

pub async fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::in_memory().await.unwrap())
}
