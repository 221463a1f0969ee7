//! 内容存储
//!
//! ## 职责
//! - 定义存储接口 [`ContentStore`]，Agent 和编排器只依赖该接口
//! - [`SqliteStore`]：基于 sqlx + SQLite 的实现
//!   - 教学内容与角色模板附带本地向量，检索时按余弦距离升序排序
//!   - 生成记录、Agent 执行日志只追加，状态在终止时更新
//!
//! 相似检索的结果只作为提示信息，检索失败不应中断生成流程。

use std::cmp::Ordering;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::infrastructure::embedding::{cosine_distance, LocalEmbedding};
use crate::models::{
    AgentLogEntry, AgentLogStatus, GenerationRecord, GenerationRequest, GenerationStatus,
};
use crate::utils::truncate_chars;

/// 执行日志中输入输出快照的最大字符数
pub const SNAPSHOT_MAX_CHARS: usize = 1000;

/// 教学内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Comic,
    Template,
    Curriculum,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Comic => "comic",
            ContentType::Template => "template",
            ContentType::Curriculum => "curriculum",
        }
    }
}

/// 相似内容检索结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarContent {
    pub id: i64,
    pub topic: String,
    pub content: String,
    pub content_type: String,
    pub age_group: String,
    pub subject: Option<String>,
    /// 余弦距离，越小越相似
    pub distance: f32,
}

/// 历史成功生成的模式
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationPattern {
    pub topic: String,
    pub comic_style: String,
    pub language: String,
    pub generation_time_seconds: Option<i64>,
    pub agent_steps: i64,
    pub avg_step_time_ms: Option<f64>,
}

/// 角色模板
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterTemplate {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub visual_style: String,
    pub personality_traits: String,
    pub distance: f32,
}

/// 生成记录的终止更新
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: GenerationStatus,
    pub output_path: Option<String>,
    pub generation_time_seconds: Option<i64>,
}

impl StatusUpdate {
    pub fn new(status: GenerationStatus) -> Self {
        Self {
            status,
            output_path: None,
            generation_time_seconds: None,
        }
    }

    pub fn with_output_path(mut self, output_path: impl Into<String>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    pub fn with_generation_time(mut self, seconds: i64) -> Self {
        self.generation_time_seconds = Some(seconds);
        self
    }
}

/// 存储接口
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// 保存教学内容（连同向量），返回行 ID
    async fn store_content(
        &self,
        topic: &str,
        content: &str,
        content_type: ContentType,
        age_group: &str,
    ) -> Result<i64, StoreError>;

    /// 按余弦距离检索相似内容
    async fn search_similar(
        &self,
        query: &str,
        content_type: Option<ContentType>,
        limit: usize,
    ) -> Result<Vec<SimilarContent>, StoreError>;

    /// 最近的成功生成记录及其执行统计
    async fn successful_patterns(&self, limit: usize)
        -> Result<Vec<GenerationPattern>, StoreError>;

    /// 保存角色模板
    async fn store_character_template(
        &self,
        name: &str,
        description: &str,
        visual_style: &str,
        personality_traits: &str,
    ) -> Result<i64, StoreError>;

    /// 检索角色模板，可按画风过滤
    async fn search_templates(
        &self,
        query: &str,
        visual_style: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CharacterTemplate>, StoreError>;

    /// 创建 `processing` 状态的生成记录，返回生成 ID
    async fn log_generation(&self, request: &GenerationRequest) -> Result<i64, StoreError>;

    /// 更新生成记录状态
    async fn update_status(&self, generation_id: i64, update: StatusUpdate)
        -> Result<(), StoreError>;

    /// 追加一条 Agent 执行日志
    async fn log_agent_execution(&self, entry: &AgentLogEntry) -> Result<(), StoreError>;

    /// 查询生成记录
    async fn get_generation(&self, generation_id: i64) -> Result<GenerationRecord, StoreError>;

    /// 查询某次生成的全部 Agent 日志（按步骤排序）
    async fn agent_logs(&self, generation_id: i64) -> Result<Vec<AgentLogEntry>, StoreError>;
}

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS educational_content (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        topic TEXT NOT NULL,
        content TEXT NOT NULL,
        content_type TEXT NOT NULL DEFAULT 'comic'
            CHECK (content_type IN ('comic', 'template', 'curriculum')),
        age_group TEXT NOT NULL DEFAULT 'child',
        subject TEXT,
        embedding TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comic_generations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        topic TEXT NOT NULL,
        comic_style TEXT NOT NULL DEFAULT '',
        language TEXT NOT NULL DEFAULT 'en',
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
        output_path TEXT,
        generation_time_seconds INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        completed_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS agent_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        generation_id INTEGER NOT NULL REFERENCES comic_generations(id),
        agent_name TEXT NOT NULL,
        step_number INTEGER NOT NULL,
        input_data TEXT,
        output_data TEXT,
        execution_time_ms INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'success' CHECK (status IN ('success', 'error')),
        error_message TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS character_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        visual_style TEXT NOT NULL DEFAULT '',
        personality_traits TEXT NOT NULL DEFAULT '',
        embedding TEXT NOT NULL,
        usage_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
];

/// SQLite 存储
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    embedding: LocalEmbedding,
}

impl SqliteStore {
    /// 连接数据库（文件不存在时自动创建）并建表
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let connection_failed = |source| StoreError::ConnectionFailed {
            url: database_url.to_string(),
            source,
        };

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(connection_failed)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(connection_failed)?;

        info!("📦 数据库已连接: {}", database_url);
        Self::with_pool(pool).await
    }

    /// 内存数据库，连接池只保留一个常驻连接
    pub async fn in_memory() -> Result<Self, StoreError> {
        let url = "sqlite::memory:";
        let connection_failed = |source| StoreError::ConnectionFailed {
            url: url.to_string(),
            source,
        };

        let options = SqliteConnectOptions::from_str(url)
            .map_err(connection_failed)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(connection_failed)?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| StoreError::query("create_schema", e))?;
        }
        debug!("数据表已就绪");

        Ok(Self {
            pool,
            embedding: LocalEmbedding::default(),
        })
    }

    fn embed_json(&self, text: &str) -> Result<String, StoreError> {
        let vector = self.embedding.embed(text)?;
        serde_json::to_string(&vector).map_err(|e| StoreError::EmbeddingFailed {
            reason: e.to_string(),
        })
    }

    /// 解析存储的向量；损坏的行按最远距离处理
    fn distance_to(&self, query: &[f32], stored: &str) -> f32 {
        match serde_json::from_str::<Vec<f32>>(stored) {
            Ok(vector) => cosine_distance(query, &vector),
            Err(e) => {
                warn!("⚠️ 向量数据损坏，已忽略: {}", e);
                f32::MAX
            }
        }
    }
}

fn by_distance(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn store_content(
        &self,
        topic: &str,
        content: &str,
        content_type: ContentType,
        age_group: &str,
    ) -> Result<i64, StoreError> {
        let embedding = self.embed_json(&format!("{} {}", topic, content))?;

        let result = sqlx::query(
            "INSERT INTO educational_content (topic, content, content_type, age_group, embedding)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(topic)
        .bind(content)
        .bind(content_type.as_str())
        .bind(age_group)
        .bind(embedding)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::query("store_content", e))?;

        Ok(result.last_insert_rowid())
    }

    async fn search_similar(
        &self,
        query: &str,
        content_type: Option<ContentType>,
        limit: usize,
    ) -> Result<Vec<SimilarContent>, StoreError> {
        let query_vector = self.embedding.embed(query)?;

        type Row = (i64, String, String, String, String, Option<String>, String);
        let rows: Vec<Row> = match content_type {
            Some(kind) => sqlx::query_as::<_, Row>(
                "SELECT id, topic, content, content_type, age_group, subject, embedding
                 FROM educational_content WHERE content_type = ?",
            )
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as::<_, Row>(
                "SELECT id, topic, content, content_type, age_group, subject, embedding
                 FROM educational_content",
            )
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| StoreError::query("search_similar", e))?;

        let mut results: Vec<SimilarContent> = rows
            .into_iter()
            .map(
                |(id, topic, content, content_type, age_group, subject, embedding)| {
                    SimilarContent {
                        distance: self.distance_to(&query_vector, &embedding),
                        id,
                        topic,
                        content,
                        content_type,
                        age_group,
                        subject,
                    }
                },
            )
            .collect();

        results.sort_by(|a, b| by_distance(a.distance, b.distance));
        results.truncate(limit);
        Ok(results)
    }

    async fn successful_patterns(
        &self,
        limit: usize,
    ) -> Result<Vec<GenerationPattern>, StoreError> {
        type Row = (String, String, String, Option<i64>, i64, Option<f64>);
        let rows: Vec<Row> = sqlx::query_as::<_, Row>(
            "SELECT cg.topic, cg.comic_style, cg.language, cg.generation_time_seconds,
                    COUNT(al.id) AS agent_steps,
                    AVG(al.execution_time_ms) AS avg_step_time
             FROM comic_generations cg
             LEFT JOIN agent_logs al ON cg.id = al.generation_id
             WHERE cg.status = 'completed'
             GROUP BY cg.id
             ORDER BY cg.created_at DESC, cg.id DESC
             LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::query("successful_patterns", e))?;

        Ok(rows
            .into_iter()
            .map(
                |(topic, comic_style, language, generation_time_seconds, agent_steps, avg)| {
                    GenerationPattern {
                        topic,
                        comic_style,
                        language,
                        generation_time_seconds,
                        agent_steps,
                        avg_step_time_ms: avg,
                    }
                },
            )
            .collect())
    }

    async fn store_character_template(
        &self,
        name: &str,
        description: &str,
        visual_style: &str,
        personality_traits: &str,
    ) -> Result<i64, StoreError> {
        let embedding =
            self.embed_json(&format!("{} {} {}", name, description, personality_traits))?;

        let result = sqlx::query(
            "INSERT INTO character_templates (name, description, visual_style, personality_traits, embedding)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(visual_style)
        .bind(personality_traits)
        .bind(embedding)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::query("store_character_template", e))?;

        Ok(result.last_insert_rowid())
    }

    async fn search_templates(
        &self,
        query: &str,
        visual_style: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CharacterTemplate>, StoreError> {
        let query_vector = self.embedding.embed(query)?;

        type Row = (i64, String, String, String, String, String);
        let rows: Vec<Row> = match visual_style {
            Some(style) => sqlx::query_as::<_, Row>(
                "SELECT id, name, description, visual_style, personality_traits, embedding
                 FROM character_templates WHERE visual_style = ?",
            )
            .bind(style)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as::<_, Row>(
                "SELECT id, name, description, visual_style, personality_traits, embedding
                 FROM character_templates",
            )
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| StoreError::query("search_templates", e))?;

        let mut results: Vec<CharacterTemplate> = rows
            .into_iter()
            .map(
                |(id, name, description, visual_style, personality_traits, embedding)| {
                    CharacterTemplate {
                        distance: self.distance_to(&query_vector, &embedding),
                        id,
                        name,
                        description,
                        visual_style,
                        personality_traits,
                    }
                },
            )
            .collect();

        results.sort_by(|a, b| by_distance(a.distance, b.distance));
        results.truncate(limit);
        Ok(results)
    }

    async fn log_generation(&self, request: &GenerationRequest) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO comic_generations (user_id, topic, comic_style, language, status)
             VALUES (?, ?, ?, ?, 'processing')",
        )
        .bind(&request.user_id)
        .bind(&request.topic)
        .bind(&request.visual_style)
        .bind(&request.language)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::query("log_generation", e))?;

        Ok(result.last_insert_rowid())
    }

    async fn update_status(
        &self,
        generation_id: i64,
        update: StatusUpdate,
    ) -> Result<(), StoreError> {
        let status = update.status.as_str();
        let result = sqlx::query(
            "UPDATE comic_generations
             SET status = ?,
                 output_path = COALESCE(?, output_path),
                 generation_time_seconds = COALESCE(?, generation_time_seconds),
                 updated_at = datetime('now'),
                 completed_at = CASE WHEN ? = 'completed' THEN datetime('now') ELSE completed_at END
             WHERE id = ?",
        )
        .bind(status)
        .bind(update.output_path)
        .bind(update.generation_time_seconds)
        .bind(status)
        .bind(generation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::query("update_status", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::GenerationNotFound { id: generation_id });
        }
        Ok(())
    }

    async fn log_agent_execution(&self, entry: &AgentLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO agent_logs
                (generation_id, agent_name, step_number, input_data, output_data,
                 execution_time_ms, status, error_message)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.generation_id)
        .bind(&entry.agent_name)
        .bind(entry.step_number as i64)
        .bind(
            entry
                .input_data
                .as_deref()
                .map(|s| truncate_chars(s, SNAPSHOT_MAX_CHARS)),
        )
        .bind(
            entry
                .output_data
                .as_deref()
                .map(|s| truncate_chars(s, SNAPSHOT_MAX_CHARS)),
        )
        .bind(entry.execution_time_ms)
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::query("log_agent_execution", e))?;

        Ok(())
    }

    async fn get_generation(&self, generation_id: i64) -> Result<GenerationRecord, StoreError> {
        type Row = (
            i64,
            String,
            String,
            String,
            String,
            String,
            Option<String>,
            Option<i64>,
            String,
            Option<String>,
        );
        let row: Option<Row> = sqlx::query_as::<_, Row>(
            "SELECT id, user_id, topic, comic_style, language, status, output_path,
                    generation_time_seconds, created_at, completed_at
             FROM comic_generations WHERE id = ?",
        )
        .bind(generation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::query("get_generation", e))?;

        let (
            id,
            user_id,
            topic,
            style,
            language,
            status,
            output_path,
            generation_time_seconds,
            created_at,
            completed_at,
        ) = row.ok_or(StoreError::GenerationNotFound { id: generation_id })?;

        let status = GenerationStatus::parse(&status).unwrap_or_else(|| {
            warn!("⚠️ 未知的生成状态 '{}'，按 pending 处理", status);
            GenerationStatus::Pending
        });

        Ok(GenerationRecord {
            id,
            user_id,
            topic,
            style,
            language,
            status,
            output_path,
            generation_time_seconds,
            created_at,
            completed_at,
        })
    }

    async fn agent_logs(&self, generation_id: i64) -> Result<Vec<AgentLogEntry>, StoreError> {
        type Row = (
            i64,
            String,
            i64,
            Option<String>,
            Option<String>,
            i64,
            String,
            Option<String>,
        );
        let rows: Vec<Row> = sqlx::query_as::<_, Row>(
            "SELECT generation_id, agent_name, step_number, input_data, output_data,
                    execution_time_ms, status, error_message
             FROM agent_logs WHERE generation_id = ?
             ORDER BY step_number, id",
        )
        .bind(generation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::query("agent_logs", e))?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    generation_id,
                    agent_name,
                    step_number,
                    input_data,
                    output_data,
                    execution_time_ms,
                    status,
                    error_message,
                )| AgentLogEntry {
                    generation_id,
                    agent_name,
                    step_number: step_number as u32,
                    input_data,
                    output_data,
                    execution_time_ms,
                    status: AgentLogStatus::parse(&status).unwrap_or(AgentLogStatus::Error),
                    error_message,
                },
            )
            .collect())
    }
}
