//! 画面合成
//!
//! ## 职责
//! - 对白换行（每 7 个词一行）
//! - 在画面顶部加 50px 白色留白并写入对白，再加 10px 黑色边框
//! - 图像后端全部失败时生成占位图
//!
//! 默认使用内置的 DejaVu Sans 字体，配置目录下的 TTF 只作为覆盖。
//!
//! 这里全是同步的 CPU 计算，调用方应放到 `spawn_blocking` 中执行。

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, warn};

use crate::error::RenderError;

/// 顶部对白留白高度
pub const TOP_PADDING: u32 = 50;
/// 边框宽度
pub const BORDER_WIDTH: u32 = 10;
/// 每行词数
pub const WORDS_PER_LINE: usize = 7;

const PLACEHOLDER_SIZE: u32 = 512;
const PLACEHOLDER_LINE_CHARS: usize = 45;
const PLACEHOLDER_MAX_LINES: usize = 8;
const PLACEHOLDER_TOP: i32 = 100;
const PLACEHOLDER_LINE_STEP: i32 = 30;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
/// 内置字体
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const BUNDLED_FONT_NAME: &str = "assets/fonts/DejaVuSans.ttf";

const LIGHT_BLUE: Rgb<u8> = Rgb([173, 216, 230]);
const DARK_BLUE: Rgb<u8> = Rgb([0, 0, 139]);

/// 每 7 个词插入一个换行，其余词之间用空格分隔
pub fn add_line_breaks(text: &str) -> String {
    let mut wrapped = String::with_capacity(text.len());
    for (i, word) in text.split_whitespace().enumerate() {
        if i > 0 {
            wrapped.push(if i % WORDS_PER_LINE == 0 { '\n' } else { ' ' });
        }
        wrapped.push_str(word);
    }
    wrapped
}

/// 按字符宽度折行，单个超长词独占一行
pub fn wrap_words(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed <= max_width || current.is_empty() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// 四周加纯色边框
pub fn add_border(img: &RgbImage, width: u32, color: Rgb<u8>) -> RgbImage {
    let mut framed = RgbImage::from_pixel(img.width() + 2 * width, img.height() + 2 * width, color);
    image::imageops::overlay(&mut framed, img, width as i64, width as i64);
    framed
}

/// 10 位随机字母数字图片名
pub fn random_image_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

fn io_failed(path: &Path, e: std::io::Error) -> RenderError {
    RenderError::bitmap(path, image::ImageError::IoError(e))
}

fn read_font(font_path: &Path) -> Result<FontVec, RenderError> {
    let bytes = std::fs::read(font_path).map_err(|e| RenderError::FontLoadFailed {
        path: font_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    FontVec::try_from_vec(bytes).map_err(|e| RenderError::FontLoadFailed {
        path: font_path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// 画面合成器
///
/// 没有字体时仍然会加留白和边框，只是不写字。
pub struct PanelComposer {
    font: Option<FontVec>,
}

impl PanelComposer {
    /// 使用内置字体
    pub fn bundled() -> Result<Self, RenderError> {
        let font = FontVec::try_from_vec(BUNDLED_FONT.to_vec()).map_err(|e| {
            RenderError::FontLoadFailed {
                path: PathBuf::from(BUNDLED_FONT_NAME),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { font: Some(font) })
    }

    /// 加载对白字体
    ///
    /// 自定义字体不存在或无法解析时改用内置字体。
    pub fn load(font_path: &Path) -> Result<Self, RenderError> {
        if !font_path.exists() {
            debug!("未找到自定义字体 {}，使用内置字体", font_path.display());
            return Self::bundled();
        }

        match read_font(font_path) {
            Ok(font) => {
                debug!("字体已加载: {}", font_path.display());
                Ok(Self { font: Some(font) })
            }
            Err(e) => {
                warn!("⚠️ {}，改用内置字体", e);
                Self::bundled()
            }
        }
    }

    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 生成 512x512 浅蓝色占位图，居中写入折行后的提示词（最多 8 行）
    pub fn create_placeholder(
        &self,
        folder: &Path,
        image_name: &str,
        prompt: &str,
    ) -> Result<PathBuf, RenderError> {
        std::fs::create_dir_all(folder).map_err(|e| io_failed(folder, e))?;

        let mut canvas = RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, LIGHT_BLUE);

        if let Some(font) = &self.font {
            let scale = PxScale::from(16.0);
            let mut y = PLACEHOLDER_TOP;
            for line in wrap_words(prompt, PLACEHOLDER_LINE_CHARS)
                .iter()
                .take(PLACEHOLDER_MAX_LINES)
            {
                let (width, _) = text_size(scale, font, line);
                let x = (PLACEHOLDER_SIZE.saturating_sub(width) / 2) as i32;
                draw_text_mut(&mut canvas, DARK_BLUE, x, y, scale, font, line);
                y += PLACEHOLDER_LINE_STEP;
            }
        }

        let path = folder.join(format!("{}.png", image_name));
        canvas
            .save(&path)
            .map_err(|e| RenderError::bitmap(&path, e))?;
        Ok(path)
    }

    /// 在画面顶部留白处写入对白并加边框，原地覆盖图片
    pub fn overlay_dialogue(&self, image_path: &Path, text: &str) -> Result<(), RenderError> {
        let img = image::open(image_path)
            .map_err(|e| RenderError::bitmap(image_path, e))?
            .to_rgb8();

        let mut canvas = RgbImage::from_pixel(img.width(), img.height() + TOP_PADDING, WHITE);
        image::imageops::overlay(&mut canvas, &img, 0, TOP_PADDING as i64);

        if let Some(font) = &self.font {
            let scale = PxScale::from(12.0);
            let (_, line_height) = text_size(scale, font, "Ag");
            let step = line_height.max(1) as i32 + 2;
            for (i, line) in text.lines().enumerate() {
                draw_text_mut(&mut canvas, BLACK, 10, i as i32 * step, scale, font, line);
            }
        }

        let framed = add_border(&canvas, BORDER_WIDTH, BLACK);
        framed
            .save(image_path)
            .map_err(|e| RenderError::bitmap(image_path, e))
    }
}
