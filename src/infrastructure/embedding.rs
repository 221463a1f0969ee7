//! 本地文本向量
//!
//! 词袋哈希到固定维度后做 L2 归一化，不依赖外部 API。
//! 相似度检索只作为参考信息使用，精度要求不高。

use std::collections::HashMap;

use crate::error::StoreError;

/// 默认向量维度
pub const EMBEDDING_DIMENSION: usize = 384;

/// 本地词袋向量
#[derive(Debug, Clone)]
pub struct LocalEmbedding {
    dimension: usize,
}

impl LocalEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// 计算文本向量
    ///
    /// 空文本返回错误；只包含单字符词的文本返回全零向量。
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::EmbeddingFailed {
                reason: "文本为空".to_string(),
            });
        }

        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1)
            .collect();

        if words.is_empty() {
            return Ok(vector);
        }

        let mut freq: HashMap<&str, f32> = HashMap::new();
        for &word in &words {
            *freq.entry(word).or_insert(0.0) += 1.0;
        }

        let total = words.len() as f32;
        for (word, count) in &freq {
            let tf = count / total;
            let bytes = word.as_bytes();
            vector[fnv1a(bytes, None) as usize % self.dimension] += tf;
            vector[fnv1a(bytes, Some(1)) as usize % self.dimension] += tf * 0.7;
            vector[fnv1a(bytes, Some(2)) as usize % self.dimension] += tf * 0.5;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }
}

impl Default for LocalEmbedding {
    fn default() -> Self {
        Self::new(EMBEDDING_DIMENSION)
    }
}

/// FNV-1a，可选追加一个盐字节
fn fnv1a(data: &[u8], salt: Option<u8>) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in data.iter().chain(salt.as_ref()) {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// 余弦相似度，任一向量为零或维度不一致时返回 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// 余弦距离（越小越相似）
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
