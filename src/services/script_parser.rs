//! 剧本与分析文本解析
//!
//! 文本模型的输出格式并不稳定，这里的解析都是尽力而为：
//! 识别不了的行直接跳过，绝不报错。
//!
//! ## 职责
//! - 剧本 → 场景列表
//! - 角色抽取结果 → 角色表
//! - 列表行（`- xxx`）→ 学习目标
//! - 质检报告 → 是否通过 / 改进建议

use crate::models::{CharacterProfile, CharacterRegistry, DialogueLine, Scene};

/// 结构性标题行，本身不是对白
const SECTION_HEADERS: [&str; 2] = ["CHARACTERS:", "EDUCATIONAL_SUMMARY:"];

/// 去掉 Markdown 强调符号和首尾空白
fn strip_markup(s: &str) -> &str {
    s.trim().trim_matches('*').trim()
}

/// 场景标题，允许前面带 Markdown 标记，如 `**SCENE 1:**`、`## SCENE 2`
fn is_scene_header(line: &str) -> bool {
    line.trim_start_matches(['*', '#', ' ']).starts_with("SCENE")
}

fn is_section_header(line: &str) -> bool {
    let bare = strip_markup(line);
    SECTION_HEADERS.iter().any(|header| bare.starts_with(header))
}

/// 把剧本文本解析为场景列表
///
/// - 场景标题行开启新场景，编号为已解析场景数 + 1
/// - 场景内包含 `:` 的行按第一个冒号拆分为 角色 / 对白
/// - 第一个场景之前的内容和结构性标题行本身会被忽略，标题之后的对白仍归入当前场景
pub fn parse_scenes(script: &str) -> Vec<Scene> {
    let mut scenes: Vec<Scene> = Vec::new();
    let mut current: Option<Scene> = None;

    for raw in script.lines() {
        let line = raw.trim();

        if is_scene_header(line) {
            if let Some(scene) = current.take() {
                scenes.push(scene);
            }
            current = Some(Scene::new(scenes.len() as u32 + 1));
            continue;
        }

        if is_section_header(line) {
            continue;
        }

        let Some(scene) = current.as_mut() else {
            continue;
        };

        if let Some((character, dialogue)) = line.split_once(':') {
            let character = strip_markup(character);
            let dialogue = strip_markup(dialogue);
            if character.is_empty() {
                continue;
            }
            scene.dialogues.push(DialogueLine::new(character, dialogue));
        }
    }

    if let Some(scene) = current {
        scenes.push(scene);
    }

    scenes
}

/// 解析角色抽取结果
///
/// 格式：
/// ```text
/// CHARACTER_1:
/// Name: Max
/// Personality: curious
/// Role: explorer
/// ```
/// `Role:` 行结束一个角色；名字为空的角色丢弃，同名角色后者覆盖前者。
pub fn parse_character_registry(text: &str) -> CharacterRegistry {
    let mut registry = CharacterRegistry::new();
    let mut current: Option<CharacterProfile> = None;

    for raw in text.lines() {
        let line = strip_markup(raw);

        if line.starts_with("CHARACTER_") {
            current = Some(CharacterProfile::default());
            continue;
        }

        let Some(profile) = current.as_mut() else {
            continue;
        };

        if let Some(name) = line.strip_prefix("Name:") {
            profile.name = strip_markup(name).to_string();
        } else if let Some(personality) = line.strip_prefix("Personality:") {
            profile.personality = strip_markup(personality).to_string();
        } else if let Some(role) = line.strip_prefix("Role:") {
            profile.role = strip_markup(role).to_string();
            if let Some(done) = current.take() {
                if !done.name.is_empty() {
                    registry.insert(done.name.clone(), done);
                }
            }
        }
    }

    registry
}

/// 提取以 `-` 开头的列表行
pub fn parse_bullet_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-'))
        .map(|line| line.trim_matches(|c| c == '-' || c == ' ').trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// 质检报告中是否包含 `APPROVAL: YES`（不区分大小写）
pub fn is_approved(analysis: &str) -> bool {
    analysis.to_uppercase().contains("APPROVAL: YES")
}

/// 提取 `IMPROVEMENTS:` 段落中的非空行，直到 `APPROVAL:` 为止
pub fn extract_improvements(analysis: &str) -> Vec<String> {
    let mut improvements = Vec::new();
    let mut in_section = false;

    for line in analysis.lines() {
        let upper = line.to_uppercase();
        if upper.contains("IMPROVEMENTS:") {
            in_section = true;
            continue;
        }
        if !in_section || line.trim().is_empty() {
            continue;
        }
        if strip_markup(&upper).starts_with("APPROVAL:") {
            break;
        }
        improvements.push(line.trim().to_string());
    }

    improvements
}
