use std::path::{Path, PathBuf};

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文本生成（LLM）错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 图像生成错误
    #[error("图像生成错误: {0}")]
    Image(#[from] ImageError),
    /// 数据存储错误
    #[error("数据存储错误: {0}")]
    Store(#[from] StoreError),
    /// 渲染 / 合成错误
    #[error("渲染错误: {0}")]
    Render(#[from] RenderError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 请求构建失败
    #[error("LLM 请求构建失败: {source}")]
    RequestBuildFailed {
        #[source]
        source: BoxedSource,
    },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: BoxedSource,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 重试耗尽
    #[error("LLM 在 {attempts} 次尝试后仍然失败: {last_error}")]
    RetriesExhausted { attempts: usize, last_error: String },
}

/// 图像生成错误
#[derive(Debug, Error)]
pub enum ImageError {
    /// 网络请求失败
    #[error("图像 API 请求失败 (模型: {model}): {source}")]
    RequestFailed {
        model: String,
        #[source]
        source: BoxedSource,
    },
    /// API 返回错误响应
    #[error("图像 API 返回错误响应: status={status}, body={body}")]
    BadResponse { status: u16, body: String },
    /// 响应中没有任何候选
    #[error("图像 API 未返回任何候选结果")]
    NoCandidates,
    /// 候选中没有图像数据
    #[error("图像 API 响应中没有图像数据")]
    NoImageData,
    /// 图像数据解码失败
    #[error("图像数据解码失败: {source}")]
    DecodeFailed {
        #[source]
        source: BoxedSource,
    },
    /// 图像保存失败
    #[error("图像保存失败 ({}): {source}", .path.display())]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: BoxedSource,
    },
    /// 客户端未配置（缺少 API Key）
    #[error("图像生成客户端不可用")]
    Unavailable,
}

/// 数据存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 连接数据库失败
    #[error("无法连接数据库 ({url}): {source}")]
    ConnectionFailed {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    /// SQL 执行失败
    #[error("数据库操作 {operation} 失败: {source}")]
    QueryFailed {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    /// 无法计算向量
    #[error("无法计算文本向量: {reason}")]
    EmbeddingFailed { reason: String },
    /// 记录不存在
    #[error("生成记录不存在: {id}")]
    GenerationNotFound { id: i64 },
}

/// 渲染 / 合成错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 打开或保存位图失败
    #[error("位图处理失败 ({}): {source}", .path.display())]
    BitmapFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// 字体加载失败
    #[error("字体加载失败 ({}): {reason}", .path.display())]
    FontLoadFailed { path: PathBuf, reason: String },
    /// PDF 组装失败
    #[error("PDF 组装失败 ({}): {source}", .path.display())]
    PdfFailed {
        path: PathBuf,
        #[source]
        source: BoxedSource,
    },
    /// 没有任何图片生成成功
    #[error("没有任何图片生成成功 (no images generated)")]
    NoImagesGenerated,
    /// 后台任务异常退出
    #[error("渲染任务异常退出: {reason}")]
    TaskPanicked { reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 创建目录失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 不支持的语言
    #[error("不支持的语言代码: {code}")]
    UnsupportedLanguage { code: String },
    /// 取值非法
    #[error("配置项 {field} 取值非法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON 处理失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件写入错误
    pub fn file_write_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.as_ref().display().to_string(),
            source,
        })
    }

    /// 创建目录创建错误
    pub fn create_dir_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::CreateDirFailed {
            path: path.as_ref().display().to_string(),
            source,
        })
    }
}

impl RenderError {
    /// 创建位图处理错误
    pub fn bitmap(path: impl AsRef<Path>, source: image::ImageError) -> Self {
        RenderError::BitmapFailed {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// 创建 PDF 组装错误
    pub fn pdf(
        path: impl AsRef<Path>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RenderError::PdfFailed {
            path: path.as_ref().to_path_buf(),
            source: Box::new(source),
        }
    }
}

impl StoreError {
    /// 包装 SQL 执行错误
    pub fn query(operation: &'static str, source: sqlx::Error) -> Self {
        StoreError::QueryFailed { operation, source }
    }
}

/// Agent 边界上的错误
///
/// Agent 内部的任何失败都会被转换成 `AgentResult { success: false }`，
/// 不会越过编排器边界。
#[derive(Debug, Error)]
pub enum AgentError {
    /// 文本生成后端失败（已在客户端内部重试）
    #[error("{0}")]
    Llm(#[from] LlmError),
    /// 数据存储失败
    #[error("{0}")]
    Store(#[from] StoreError),
    /// 缺少上游 Agent 的输出
    #[error("缺少上游输出: {0}")]
    MissingUpstream(&'static str),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
