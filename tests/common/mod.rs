//! テスト用ゲートウェイ
//!
//! 応答を事前に設定でき、呼び出し回数を数える。
//! ゲートを設定すると、その呼び出しは通知が来るまで止まる。

#![allow(dead_code)]

use async_trait::async_trait;
use sig_review::gateway::{GatewayError, MatchingGateway};
use sig_review::session::ReviewSession;
use sig_review_common::{Ack, CandidateMatch, MatchMethod, MatchResultSet, SignatureRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
pub struct ScriptedGateway {
    pub signatures: Mutex<Option<Result<Vec<SignatureRecord>, GatewayError>>>,
    /// signature_line → 応答
    pub details: Mutex<HashMap<String, Result<MatchResultSet, GatewayError>>>,
    pub finalize_result: Mutex<Option<Result<Ack, GatewayError>>>,
    /// 照合用ゲート
    pub gate: Mutex<Option<Arc<Notify>>>,
    pub extract_gate: Mutex<Option<Arc<Notify>>>,
    pub finalize_gate: Mutex<Option<Arc<Notify>>>,
    pub extract_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub finalize_calls: AtomicUsize,
    pub looked_up: Mutex<Vec<SignatureRecord>>,
    pub finalized: Mutex<Vec<(String, SignatureRecord, CandidateMatch)>>,
}

impl ScriptedGateway {
    pub fn with_signatures(records: Vec<SignatureRecord>) -> Self {
        let gateway = Self::default();
        gateway.set_signatures(Ok(records));
        gateway
    }

    pub fn set_signatures(&self, response: Result<Vec<SignatureRecord>, GatewayError>) {
        *self.signatures.lock().unwrap() = Some(response);
    }

    pub fn set_details(&self, line: &str, response: Result<MatchResultSet, GatewayError>) {
        self.details.lock().unwrap().insert(line.to_string(), response);
    }

    pub fn set_finalize(&self, response: Result<Ack, GatewayError>) {
        *self.finalize_result.lock().unwrap() = Some(response);
    }

    /// 照合呼び出しを止めるゲートを設置
    pub fn install_gate(&self) -> Arc<Notify> {
        install(&self.gate)
    }

    /// 以降の照合呼び出しは止めない
    pub fn remove_gate(&self) {
        *self.gate.lock().unwrap() = None;
    }

    pub fn install_extract_gate(&self) -> Arc<Notify> {
        install(&self.extract_gate)
    }

    pub fn remove_extract_gate(&self) {
        *self.extract_gate.lock().unwrap() = None;
    }

    pub fn install_finalize_gate(&self) -> Arc<Notify> {
        install(&self.finalize_gate)
    }

    pub fn lookups(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn finalizes(&self) -> usize {
        self.finalize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchingGateway for ScriptedGateway {
    async fn extract_signatures(&self, _filename: &str) -> Result<Vec<SignatureRecord>, GatewayError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        pass_gate(&self.extract_gate).await;
        self.signatures
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn lookup_matches(&self, record: &SignatureRecord) -> Result<MatchResultSet, GatewayError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.looked_up.lock().unwrap().push(record.clone());

        pass_gate(&self.gate).await;

        self.details
            .lock()
            .unwrap()
            .get(&record.signature_line)
            .cloned()
            .unwrap_or_else(|| Ok(MatchResultSet::default()))
    }

    async fn finalize(
        &self,
        filename: &str,
        record: &SignatureRecord,
        candidate: &CandidateMatch,
    ) -> Result<Ack, GatewayError> {
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);
        self.finalized
            .lock()
            .unwrap()
            .push((filename.to_string(), record.clone(), candidate.clone()));
        pass_gate(&self.finalize_gate).await;
        self.finalize_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Ack::default()))
    }
}

fn install(slot: &Mutex<Option<Arc<Notify>>>) -> Arc<Notify> {
    let notify = Arc::new(Notify::new());
    *slot.lock().unwrap() = Some(notify.clone());
    notify
}

/// ゲートがあれば通知まで待つ（ロックは待つ前に離す）
async fn pass_gate(slot: &Mutex<Option<Arc<Notify>>>) {
    let gate = slot.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

pub fn record(line: &str) -> SignatureRecord {
    SignatureRecord {
        signature_line: line.into(),
        date: "03/01/2024".into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        address_number: Some("12".into()),
        address_name: Some("Main St".into()),
    }
}

pub fn candidate(method: MatchMethod, first: &str, last: &str) -> CandidateMatch {
    CandidateMatch::new(method)
        .with(CandidateMatch::FIRST_NAME, first)
        .with(CandidateMatch::LAST_NAME, last)
        .with(CandidateMatch::STREET_NAME, "MAIN ST")
}

/// 完全一致の候補を `n` 件持つ結果
pub fn exact_results(n: usize) -> MatchResultSet {
    MatchResultSet {
        exact: (0..n)
            .map(|i| candidate(MatchMethod::Exact, "ADA", &format!("LOVELACE{}", i)))
            .collect(),
        ..Default::default()
    }
}

pub fn session(gateway: ScriptedGateway) -> ReviewSession<ScriptedGateway> {
    ReviewSession::new(gateway, Duration::from_secs(5))
}
