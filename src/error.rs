use crate::gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("signature extraction failed for {filename}: {source}")]
    ExtractionFailed {
        filename: String,
        #[source]
        source: GatewayError,
    },

    #[error("match lookup failed for line {line}: {source}")]
    LookupFailed {
        line: String,
        #[source]
        source: GatewayError,
    },

    #[error("finalize failed for line {line}: {source}")]
    FinalizeFailed {
        line: String,
        #[source]
        source: GatewayError,
    },

    #[error("invalid edit: {0}")]
    ValidationFailed(String),

    #[error("signature entry not found: {0}")]
    NotFound(String),

    #[error("no document is open")]
    NoDocument,

    /// 応答待ちの間に対象エントリが編集・削除された
    #[error("response discarded, entry changed while waiting: {0}")]
    Superseded(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("console error: {0}")]
    Console(String),
}

/// どの操作で失敗したか（表示層向け）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Extraction,
    Lookup,
    Finalize,
    Edit,
    Status,
    Other,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::Extraction => "extraction",
            OperationKind::Lookup => "lookup",
            OperationKind::Finalize => "finalize",
            OperationKind::Edit => "edit",
            OperationKind::Status => "status",
            OperationKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

impl ReviewError {
    pub fn kind(&self) -> OperationKind {
        match self {
            ReviewError::ExtractionFailed { .. } => OperationKind::Extraction,
            ReviewError::LookupFailed { .. } => OperationKind::Lookup,
            ReviewError::FinalizeFailed { .. } => OperationKind::Finalize,
            ReviewError::ValidationFailed(_) => OperationKind::Edit,
            ReviewError::NotFound(_) => OperationKind::Status,
            _ => OperationKind::Other,
        }
    }

    /// 同じ操作をそのままやり直せば成功しうるか
    pub fn is_retryable(&self) -> bool {
        match self {
            ReviewError::ExtractionFailed { source, .. }
            | ReviewError::LookupFailed { source, .. }
            | ReviewError::FinalizeFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;

impl From<dialoguer::Error> for ReviewError {
    fn from(e: dialoguer::Error) -> Self {
        ReviewError::Console(e.to_string())
    }
}
