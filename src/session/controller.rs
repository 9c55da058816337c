//! レビューセッション
//!
//! 抽出 → 照合 → 編集 → 確定/該当なし の流れを管理する。
//!
//! - 状態（ストア・キャッシュ）はMutexの内側にあり、`.await` をまたいで保持しない
//! - ゲートウェイ呼び出しの後、対象エントリがまだ同じ版かを確認してから反映する
//! - 同じエントリへの同時照合は1回のゲートウェイ呼び出しにまとめる

use super::cache::MatchResultCache;
use super::events::{EventSink, SessionEvent};
use super::store::{EntryId, ReviewSummary, SignatureEntry, SignatureEntryStore};
use crate::error::{ReviewError, Result};
use crate::gateway::{GatewayError, MatchingGateway};
use sig_review_common::{CandidateMatch, MatchResultSet, ReviewStatus, SignatureRecord};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// 確定・該当なしなどの操作に対するオペレータの確認結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

/// 確認付き操作の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Applied,
    Cancelled,
}

/// 文書を開いた結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    Loaded(usize),
    /// 抽出は成功したが署名が0件
    NoSignatures,
}

/// 相乗りした照合の待機者へ渡す失敗
#[derive(Debug, Clone)]
enum LookupFailure {
    Gateway(GatewayError),
    Superseded,
}

type LookupOutcome = std::result::Result<MatchResultSet, LookupFailure>;

enum LookupPlan {
    Cached(MatchResultSet),
    Join(oneshot::Receiver<LookupOutcome>),
    Lead { record: SignatureRecord, revision: u32 },
}

#[derive(Default)]
struct SessionState {
    filename: Option<String>,
    /// 文書を開く・閉じるたびに増える
    generation: u64,
    store: SignatureEntryStore,
    cache: MatchResultCache,
    /// (エントリ, 版) ごとの照合待ち
    pending: HashMap<(EntryId, u32), Vec<oneshot::Sender<LookupOutcome>>>,
    events: EventSink,
}

impl SessionState {
    fn reset(&mut self, filename: Option<String>) -> u64 {
        self.generation += 1;
        self.filename = filename;
        self.store.clear(&mut self.cache);
        // 送信側を捨てると待機者は Superseded になる
        self.pending.clear();
        self.generation
    }
}

/// 先導する照合の待ち枠
///
/// 照合が完了する前に先導者の future が破棄されたら、枠を取り除く。
/// 送信側も一緒に捨てられるので、相乗りしていた待機者は `Superseded` になる。
struct PendingSlot<'a> {
    state: &'a Mutex<SessionState>,
    key: (EntryId, u32),
    armed: bool,
}

impl PendingSlot<'_> {
    /// 枠の後始末は呼び出し側がロック内で行う
    fn release(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(waiters) = state.pending.remove(&self.key) {
            warn!(id = %self.key.0, waiters = waiters.len(), "lookup abandoned before completion");
        }
    }
}

pub struct ReviewSession<G> {
    gateway: G,
    timeout: Duration,
    state: Mutex<SessionState>,
}

impl<G: MatchingGateway> ReviewSession<G> {
    pub fn new(gateway: G, timeout: Duration) -> Self {
        Self {
            gateway,
            timeout,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// イベントの受信口を作る（以前の受信口は無効になる）
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.state().events.subscribe()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = std::result::Result<T, GatewayError>>,
    ) -> std::result::Result<T, GatewayError> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        }
    }

    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!(kind = %e.kind(), error = %e, "operation failed");
            self.state().events.emit(SessionEvent::OperationFailed {
                kind: e.kind(),
                message: e.to_string(),
            });
        }
        result
    }

    // =============================================
    // 文書
    // =============================================

    /// 文書の署名を抽出してストアに読み込む
    pub async fn open_document(&self, filename: &str) -> Result<DocumentOutcome> {
        let result = self.open_document_inner(filename).await;
        self.report(result)
    }

    async fn open_document_inner(&self, filename: &str) -> Result<DocumentOutcome> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(ReviewError::ValidationFailed("filename is empty".into()));
        }

        let generation = self.state().reset(Some(filename.to_string()));
        info!(filename, "extracting signatures");

        let response = self.call(self.gateway.extract_signatures(filename)).await;

        let mut state = self.state();
        if state.generation != generation {
            warn!(filename, "extraction response arrived after document changed, discarding");
            return Err(ReviewError::Superseded(filename.to_string()));
        }

        let records = response.map_err(|source| ReviewError::ExtractionFailed {
            filename: filename.to_string(),
            source,
        })?;

        if records.is_empty() {
            info!(filename, "no signatures extracted");
            state.events.emit(SessionEvent::NoSignatures {
                filename: filename.to_string(),
            });
            return Ok(DocumentOutcome::NoSignatures);
        }

        let state = &mut *state;
        let entries = state.store.load(records, &mut state.cache).to_vec();
        info!(filename, count = entries.len(), "signatures loaded");
        let count = entries.len();
        state.events.emit(SessionEvent::DocumentLoaded {
            filename: filename.to_string(),
            entries,
        });
        Ok(DocumentOutcome::Loaded(count))
    }

    /// 現在の文書で抽出をやり直す
    pub async fn reprocess(&self, confirmation: Confirmation) -> Result<Option<DocumentOutcome>> {
        if confirmation == Confirmation::Declined {
            return Ok(None);
        }
        let filename = self.state().filename.clone();
        match filename {
            Some(filename) => self.open_document(&filename).await.map(Some),
            None => self.report(Err(ReviewError::NoDocument)),
        }
    }

    /// 文書を閉じる。処理中の応答はすべて破棄される
    pub fn close_document(&self) {
        let mut state = self.state();
        state.reset(None);
        state.events.emit(SessionEvent::DocumentClosed);
        info!("document closed");
    }

    // =============================================
    // 照合
    // =============================================

    /// 照合結果を取得（キャッシュ優先）
    pub async fn fetch_details(&self, id: EntryId) -> Result<MatchResultSet> {
        let result = self.fetch_details_inner(id).await;
        self.report(result)
    }

    async fn fetch_details_inner(&self, id: EntryId) -> Result<MatchResultSet> {
        let (plan, line) = {
            let mut state = self.state();
            let entry = state
                .store
                .get(id)
                .ok_or_else(|| ReviewError::NotFound(id.to_string()))?;
            let record = entry.record.clone();
            let revision = entry.revision;
            let line = record.signature_line.clone();

            let cached = state.cache.get(id).cloned();
            let plan = if let Some(hit) = cached {
                debug!(%id, line = %line, "details cache hit");
                LookupPlan::Cached(hit)
            } else {
                match state.pending.entry((id, revision)) {
                    Entry::Occupied(mut waiting) => {
                        debug!(%id, line = %line, "joining in-flight lookup");
                        let (tx, rx) = oneshot::channel();
                        waiting.get_mut().push(tx);
                        LookupPlan::Join(rx)
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(Vec::new());
                        LookupPlan::Lead { record, revision }
                    }
                }
            };

            if let LookupPlan::Cached(results) = &plan {
                state.events.emit(SessionEvent::DetailsLoaded {
                    id,
                    signature_line: line.clone(),
                    results: results.clone(),
                });
            }
            (plan, line)
        };

        let outcome = match plan {
            LookupPlan::Cached(results) => return Ok(results),
            LookupPlan::Join(rx) => rx.await.unwrap_or(Err(LookupFailure::Superseded)),
            LookupPlan::Lead { record, revision } => self.lead_lookup(id, record, revision).await,
        };

        outcome.map_err(|failure| match failure {
            LookupFailure::Gateway(source) => ReviewError::LookupFailed { line, source },
            LookupFailure::Superseded => ReviewError::Superseded(line),
        })
    }

    async fn lead_lookup(&self, id: EntryId, record: SignatureRecord, revision: u32) -> LookupOutcome {
        let mut slot = PendingSlot {
            state: &self.state,
            key: (id, revision),
            armed: true,
        };
        info!(%id, line = %record.signature_line, "looking up matches");
        let response = self.call(self.gateway.lookup_matches(&record)).await;

        let mut state = self.state();
        slot.release();
        let waiters = state.pending.remove(&(id, revision)).unwrap_or_default();
        let still_current = state
            .store
            .get(id)
            .is_some_and(|entry| entry.revision == revision);

        let outcome = match response {
            _ if !still_current => {
                warn!(%id, line = %record.signature_line, "entry changed during lookup, discarding response");
                Err(LookupFailure::Superseded)
            }
            Ok(results) => {
                debug!(%id, candidates = results.total(), "caching lookup result");
                state.cache.put(id, results.clone());
                state.events.emit(SessionEvent::DetailsLoaded {
                    id,
                    signature_line: record.signature_line.clone(),
                    results: results.clone(),
                });
                Ok(results)
            }
            Err(e) => Err(LookupFailure::Gateway(e)),
        };

        if !waiters.is_empty() {
            debug!(%id, waiters = waiters.len(), "fanning out lookup result");
        }
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }
        outcome
    }

    // =============================================
    // 編集
    // =============================================

    /// レコードを編集する。状態は `Default` に戻り、照合結果は破棄される
    ///
    /// 再照合はしない。必要なら続けて `fetch_details` を呼ぶ。
    pub fn edit_record(&self, id: EntryId, fields: SignatureRecord) -> Result<SignatureEntry> {
        let result = self.edit_record_inner(id, fields);
        self.report(result)
    }

    fn edit_record_inner(&self, id: EntryId, fields: SignatureRecord) -> Result<SignatureEntry> {
        let record = fields.normalized();
        let missing = record.missing_required_fields();
        if !missing.is_empty() {
            return Err(ReviewError::ValidationFailed(format!(
                "required fields are empty: {}",
                missing.join(", ")
            )));
        }

        let mut guard = self.state();
        let state = &mut *guard;
        if state.store.get(id).is_none() {
            return Err(ReviewError::NotFound(id.to_string()));
        }
        if state.store.line_taken_by_other(&record.signature_line, id) {
            return Err(ReviewError::ValidationFailed(format!(
                "signature line {} is already used by another entry",
                record.signature_line
            )));
        }

        let entry = state
            .store
            .replace_record(id, record, &mut state.cache)?
            .clone();
        info!(%id, line = %entry.record.signature_line, revision = entry.revision, "record edited");

        state.events.emit(SessionEvent::RecordEdited {
            id,
            record: entry.record.clone(),
        });
        state.events.emit(SessionEvent::StatusChanged {
            id,
            signature_line: entry.record.signature_line.clone(),
            status: ReviewStatus::Default,
        });
        Ok(entry)
    }

    // =============================================
    // 確定・該当なし
    // =============================================

    /// 候補を確定する。成功応答を受けたときだけ `Matched` にする
    pub async fn finalize_candidate(
        &self,
        id: EntryId,
        candidate: &CandidateMatch,
        confirmation: Confirmation,
    ) -> Result<Decision> {
        if confirmation == Confirmation::Declined {
            return Ok(Decision::Cancelled);
        }
        let result = self.finalize_candidate_inner(id, candidate).await;
        self.report(result)
    }

    async fn finalize_candidate_inner(&self, id: EntryId, candidate: &CandidateMatch) -> Result<Decision> {
        let (filename, record, revision) = {
            let state = self.state();
            let filename = state.filename.clone().ok_or(ReviewError::NoDocument)?;
            let entry = state
                .store
                .get(id)
                .ok_or_else(|| ReviewError::NotFound(id.to_string()))?;
            (filename, entry.record.clone(), entry.revision)
        };
        let line = record.signature_line.clone();

        info!(%id, line = %line, candidate = %candidate.full_name(), "finalizing candidate");
        let response = self
            .call(self.gateway.finalize(&filename, &record, candidate))
            .await;

        let mut state = self.state();
        let ack = response.map_err(|source| ReviewError::FinalizeFailed {
            line: line.clone(),
            source,
        })?;

        let still_current = state
            .store
            .get(id)
            .is_some_and(|entry| entry.revision == revision);
        if !still_current {
            warn!(%id, line = %line, "entry changed during finalize, not marking matched");
            return Err(ReviewError::Superseded(line));
        }

        state.store.set_status(id, ReviewStatus::Matched)?;
        info!(%id, line = %line, message = ?ack.message, "candidate finalized");
        state.events.emit(SessionEvent::StatusChanged {
            id,
            signature_line: line,
            status: ReviewStatus::Matched,
        });
        Ok(Decision::Applied)
    }

    /// 該当なしにする（ローカルのみ、サービスには通知しない）
    pub fn mark_no_match(&self, id: EntryId, confirmation: Confirmation) -> Result<Decision> {
        if confirmation == Confirmation::Declined {
            return Ok(Decision::Cancelled);
        }
        let result = self.mark_no_match_inner(id);
        self.report(result)
    }

    fn mark_no_match_inner(&self, id: EntryId) -> Result<Decision> {
        let mut state = self.state();
        state.store.set_status(id, ReviewStatus::NoMatch)?;
        let line = state
            .store
            .get(id)
            .map(|e| e.record.signature_line.clone())
            .unwrap_or_default();
        info!(%id, line = %line, "marked no match");
        state.events.emit(SessionEvent::StatusChanged {
            id,
            signature_line: line,
            status: ReviewStatus::NoMatch,
        });
        Ok(Decision::Applied)
    }

    // =============================================
    // 参照
    // =============================================

    pub fn filename(&self) -> Option<String> {
        self.state().filename.clone()
    }

    pub fn entries(&self) -> Vec<SignatureEntry> {
        self.state().store.entries().to_vec()
    }

    pub fn entry(&self, id: EntryId) -> Option<SignatureEntry> {
        self.state().store.get(id).cloned()
    }

    /// 署名行番号からエントリIDを引く
    pub fn resolve(&self, signature_line: &str) -> Result<EntryId> {
        self.state().store.resolve(signature_line)
    }

    pub fn cached_details(&self, id: EntryId) -> Option<MatchResultSet> {
        self.state().cache.get(id).cloned()
    }

    pub fn summary(&self) -> ReviewSummary {
        self.state().store.summary()
    }
}
