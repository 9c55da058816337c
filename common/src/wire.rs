//! 照合サービスとのリクエスト/レスポンス形式
//!
//! すべてJSON。レスポンスに `error` があればHTTPステータスに関係なく失敗扱い。

use crate::types::{CandidateMatch, MatchResultSet, SignatureRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 抽出エンドポイント
pub const EXTRACT_PATH: &str = "/api/trigger_processing";
/// 照合エンドポイント
pub const DETAILS_PATH: &str = "/api/signature_details";
/// 確定エンドポイント
pub const FINALIZE_PATH: &str = "/api/select_candidate";

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRequest<'a> {
    pub filename: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailsRequest<'a> {
    pub signature: &'a SignatureRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalizeRequest<'a> {
    pub filename: &'a str,
    pub signature: &'a SignatureRecord,
    pub candidate: &'a CandidateMatch,
}

/// `{signatures: [{signature: {...}}], error?}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractResponse {
    #[serde(default)]
    pub signatures: Option<Vec<ExtractedEntry>>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedEntry {
    pub signature: SignatureRecord,
}

/// `{results: {...4 lists}, error?}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailsResponse {
    #[serde(default)]
    pub results: Option<MatchResultSet>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// 確定レスポンスは `error` 以外の内容を規定しない
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinalizeResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// `error` フィールドをメッセージ文字列にする
pub(crate) fn error_message(error: &Option<Value>) -> Option<String> {
    match error {
        None | Some(Value::Null) => None,
        Some(Value::Bool(false)) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}
