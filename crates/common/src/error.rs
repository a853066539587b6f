use thiserror::Error;

/// 工具箱统一错误类型
///
/// 第一个出现的错误会原样返回给调用方，不做部分接受。
#[derive(Error, Debug)]
pub enum BaccError {
    #[error("Invalid parameters: {0}")]
    Params(String),

    #[error("Malformed data: {0}")]
    Format(String),

    #[error("Proof verification failed: {0}")]
    Crypto(String),

    #[error("First entry is not bound to the expected name")]
    NameBinding,

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Certificate chain error: {0}")]
    CertChain(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Concurrency error: {0}")]
    Concurrency(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl BaccError {
    /// 稳定的错误名称，用于日志和命令行输出
    pub fn code(&self) -> &'static str {
        match self {
            BaccError::Params(_) => "ParamsError",
            BaccError::Format(_) => "FormatError",
            BaccError::Crypto(_) => "CryptoError",
            BaccError::NameBinding => "NameBindingError",
            BaccError::Signature(_) => "SignatureError",
            BaccError::CertChain(_) => "CertChainError",
            BaccError::Io(_) => "IOError",
            BaccError::Resource(_) => "ResourceError",
            BaccError::Concurrency(_) => "ConcurrencyError",
            BaccError::Config(_) => "ConfigError",
        }
    }
}

pub type Result<T> = std::result::Result<T, BaccError>;
