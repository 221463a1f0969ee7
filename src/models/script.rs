use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 一句对白
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub character: String,
    pub dialogue: String,
}

impl DialogueLine {
    pub fn new(character: impl Into<String>, dialogue: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            dialogue: dialogue.into(),
        }
    }
}

/// 剧本中的一个场景
///
/// `scene_number` 是下游所有组件的关联键，同一次生成内唯一，允许不连续。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_number: u32,
    #[serde(default)]
    pub dialogues: Vec<DialogueLine>,
}

impl Scene {
    pub fn new(scene_number: u32) -> Self {
        Self {
            scene_number,
            dialogues: Vec::new(),
        }
    }

    /// 拼接本场景全部对白，每句格式为 `角色: 对白`，以空格连接
    pub fn combined_dialogue(&self) -> String {
        self.dialogues
            .iter()
            .map(|d| format!("{}: {}", d.character, d.dialogue))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 角色信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub name: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub role: String,
}

/// 角色表（角色名 → 角色信息），按名称排序
pub type CharacterRegistry = BTreeMap<String, CharacterProfile>;
