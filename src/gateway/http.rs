//! HTTP版ゲートウェイ（reqwest）

use super::{GatewayError, MatchingGateway};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use sig_review_common::wire::{
    DetailsRequest, ExtractRequest, FinalizeRequest, DETAILS_PATH, EXTRACT_PATH, FINALIZE_PATH,
};
use sig_review_common::{
    parse_details_response, parse_extraction_response, parse_finalize_response, Ack,
    CandidateMatch, MatchResultSet, SignatureRecord,
};
use std::time::Duration;

const USER_AGENT: &str = concat!("sig-review/", env!("CARGO_PKG_VERSION"));

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, String), GatewayError> {
        let url = self.url(path);
        tracing::debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(e))?;
        Ok((status, text))
    }

    fn classify(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

/// 本文の `error` を優先し、なければHTTPステータスで判定
fn interpret<T>(
    status: StatusCode,
    text: &str,
    parse: fn(&str) -> sig_review_common::Result<T>,
) -> Result<T, GatewayError> {
    match (parse(text), status.is_success()) {
        (Err(sig_review_common::Error::Remote(msg)), _) => Err(GatewayError::Remote(msg)),
        (_, false) => Err(GatewayError::Api(status.as_u16(), text.to_string())),
        (parsed, true) => parsed.map_err(Into::into),
    }
}

#[async_trait]
impl MatchingGateway for HttpGateway {
    async fn extract_signatures(&self, filename: &str) -> Result<Vec<SignatureRecord>, GatewayError> {
        let (status, text) = self.post(EXTRACT_PATH, &ExtractRequest { filename }).await?;
        interpret(status, &text, parse_extraction_response)
    }

    async fn lookup_matches(&self, record: &SignatureRecord) -> Result<MatchResultSet, GatewayError> {
        let (status, text) = self
            .post(DETAILS_PATH, &DetailsRequest { signature: record })
            .await?;
        interpret(status, &text, parse_details_response)
    }

    async fn finalize(
        &self,
        filename: &str,
        record: &SignatureRecord,
        candidate: &CandidateMatch,
    ) -> Result<Ack, GatewayError> {
        let request = FinalizeRequest {
            filename,
            signature: record,
            candidate,
        };
        let (status, text) = self.post(FINALIZE_PATH, &request).await?;
        interpret(status, &text, parse_finalize_response)
    }
}
