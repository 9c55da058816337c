//! 照合サービスとの境界
//!
//! セッションは `MatchingGateway` 経由でのみ外部サービスを呼ぶ。
//! 呼び出しは最大1回で、リトライはしない。

mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use sig_review_common::{Ack, CandidateMatch, MatchResultSet, SignatureRecord};
use std::time::Duration;
use thiserror::Error;

/// 照合サービス呼び出しのエラー
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("server returned {0}: {1}")]
    Api(u16, String),

    #[error("{0}")]
    Remote(String),

    #[error("unexpected response: {0}")]
    Parse(String),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Timeout(_) | GatewayError::Network(_) => true,
            GatewayError::Api(status, _) => *status >= 500,
            GatewayError::Remote(_) | GatewayError::Parse(_) => false,
        }
    }
}

impl From<sig_review_common::Error> for GatewayError {
    fn from(e: sig_review_common::Error) -> Self {
        match e {
            sig_review_common::Error::Remote(msg) => GatewayError::Remote(msg),
            other => GatewayError::Parse(other.to_string()),
        }
    }
}

/// 抽出・照合・確定を行う外部サービス
#[async_trait]
pub trait MatchingGateway: Send + Sync {
    async fn extract_signatures(&self, filename: &str) -> Result<Vec<SignatureRecord>, GatewayError>;

    async fn lookup_matches(&self, record: &SignatureRecord) -> Result<MatchResultSet, GatewayError>;

    async fn finalize(
        &self,
        filename: &str,
        record: &SignatureRecord,
        candidate: &CandidateMatch,
    ) -> Result<Ack, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GatewayError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(GatewayError::Network("connection refused".into()).is_retryable());
        assert!(GatewayError::Api(503, String::new()).is_retryable());
        assert!(!GatewayError::Api(400, String::new()).is_retryable());
        assert!(!GatewayError::Remote("No such file".into()).is_retryable());
    }

    #[test]
    fn test_from_common_error() {
        let remote: GatewayError = sig_review_common::Error::Remote("bad file".into()).into();
        assert_eq!(remote, GatewayError::Remote("bad file".into()));

        let parse: GatewayError = sig_review_common::Error::Parse("no results".into()).into();
        assert!(matches!(parse, GatewayError::Parse(_)));
    }
}
