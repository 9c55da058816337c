//! APIレスポンスパーサー
//!
//! 照合サービスのレスポンス本文をパースし、`error` フィールドを
//! `Error::Remote` に変換する

use crate::error::{Error, Result};
use crate::types::{Ack, MatchResultSet, SignatureRecord};
use crate::wire::{error_message, DetailsResponse, ExtractResponse, FinalizeResponse};

/// 抽出レスポンスをパース
///
/// `signatures` が無い・空の場合は空のVecを返す（エラーではない）
///
/// # Examples
/// ```
/// use sig_review_common::parse_extraction_response;
///
/// let body = r#"{"signatures": [{"signature": {"signature_line": "1", "date": "3/1", "first_name": "A", "last_name": "B"}}]}"#;
/// let records = parse_extraction_response(body).unwrap();
/// assert_eq!(records[0].signature_line, "1");
/// ```
pub fn parse_extraction_response(body: &str) -> Result<Vec<SignatureRecord>> {
    let response: ExtractResponse = serde_json::from_str(body.trim())
        .map_err(|e| Error::Parse(format!("extraction response: {}", e)))?;

    if let Some(message) = error_message(&response.error) {
        return Err(Error::Remote(message));
    }

    Ok(response
        .signatures
        .unwrap_or_default()
        .into_iter()
        .map(|entry| entry.signature)
        .collect())
}

/// 照合レスポンスをパース
///
/// 各候補の `method` はリスト名から設定する
pub fn parse_details_response(body: &str) -> Result<MatchResultSet> {
    let response: DetailsResponse = serde_json::from_str(body.trim())
        .map_err(|e| Error::Parse(format!("details response: {}", e)))?;

    if let Some(message) = error_message(&response.error) {
        return Err(Error::Remote(message));
    }

    let mut results = response
        .results
        .ok_or_else(|| Error::Parse("details response has no results".into()))?;
    results.tag_methods();
    Ok(results)
}

/// 確定レスポンスをパース
pub fn parse_finalize_response(body: &str) -> Result<Ack> {
    let response: FinalizeResponse = serde_json::from_str(body.trim())
        .map_err(|e| Error::Parse(format!("finalize response: {}", e)))?;

    if let Some(message) = error_message(&response.error) {
        return Err(Error::Remote(message));
    }

    Ok(Ack {
        message: response.message,
    })
}
