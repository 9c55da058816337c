//! 署名エントリストア
//!
//! 開いている文書の署名エントリを抽出順に保持する。
//! エントリは編集されても同じ `EntryId` を保つ。

use super::cache::MatchResultCache;
use crate::error::{ReviewError, Result};
use chrono::{DateTime, Local};
use sig_review_common::{ReviewStatus, SignatureRecord};
use std::fmt;

/// セッション内で不変のエントリ識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct SignatureEntry {
    pub id: EntryId,
    pub record: SignatureRecord,
    pub status: ReviewStatus,
    /// 編集のたびに増える
    pub revision: u32,
    /// MatchedまたはNoMatchになった時刻
    pub decided_at: Option<DateTime<Local>>,
}

/// 状態別の件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub total: usize,
    pub pending: usize,
    pub matched: usize,
    pub no_match: usize,
}

impl fmt::Display for ReviewSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} signatures: {} matched, {} no match, {} pending",
            self.total, self.matched, self.no_match, self.pending
        )
    }
}

#[derive(Debug, Default)]
pub struct SignatureEntryStore {
    entries: Vec<SignatureEntry>,
    next_id: u64,
}

impl SignatureEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全エントリを新しい抽出結果で置き換える
    ///
    /// 別文書の行番号と衝突しうるので、キャッシュは全消去する。
    pub fn load(&mut self, records: Vec<SignatureRecord>, cache: &mut MatchResultCache) -> &[SignatureEntry] {
        cache.clear();
        let entries: Vec<SignatureEntry> = records
            .into_iter()
            .map(|record| {
                let id = self.allocate_id();
                SignatureEntry {
                    id,
                    record,
                    status: ReviewStatus::Default,
                    revision: 0,
                    decided_at: None,
                }
            })
            .collect();
        self.entries = entries;
        &self.entries
    }

    /// 文書を閉じる
    pub fn clear(&mut self, cache: &mut MatchResultCache) {
        cache.clear();
        self.entries.clear();
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn get(&self, id: EntryId) -> Option<&SignatureEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    fn get_mut(&mut self, id: EntryId) -> Result<&mut SignatureEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| ReviewError::NotFound(id.to_string()))
    }

    /// 署名行番号からエントリを探す（重複時は先頭）
    pub fn resolve(&self, signature_line: &str) -> Result<EntryId> {
        let line = signature_line.trim();
        self.entries
            .iter()
            .find(|e| e.record.signature_line == line)
            .map(|e| e.id)
            .ok_or_else(|| ReviewError::NotFound(format!("line {}", line)))
    }

    /// `id` 以外のエントリがその行番号を使っているか
    pub fn line_taken_by_other(&self, signature_line: &str, id: EntryId) -> bool {
        self.entries
            .iter()
            .any(|e| e.id != id && e.record.signature_line == signature_line)
    }

    pub fn set_status(&mut self, id: EntryId, status: ReviewStatus) -> Result<()> {
        let entry = self.get_mut(id)?;
        entry.status = status;
        entry.decided_at = status.is_decided().then(Local::now);
        Ok(())
    }

    /// 編集後のレコードに差し替える
    ///
    /// 状態は `Default` に戻り、キャッシュ済みの照合結果は破棄される。
    pub fn replace_record(
        &mut self,
        id: EntryId,
        record: SignatureRecord,
        cache: &mut MatchResultCache,
    ) -> Result<&SignatureEntry> {
        let entry = self.get_mut(id)?;
        entry.record = record;
        entry.status = ReviewStatus::Default;
        entry.revision += 1;
        entry.decided_at = None;
        cache.evict(id);
        Ok(entry)
    }

    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> ReviewSummary {
        self.entries.iter().fold(
            ReviewSummary {
                total: self.entries.len(),
                ..Default::default()
            },
            |mut acc, e| {
                match e.status {
                    ReviewStatus::Default => acc.pending += 1,
                    ReviewStatus::Matched => acc.matched += 1,
                    ReviewStatus::NoMatch => acc.no_match += 1,
                }
                acc
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sig_review_common::MatchResultSet;

    fn record(line: &str) -> SignatureRecord {
        SignatureRecord {
            signature_line: line.into(),
            date: "03/01/2024".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_resets_everything() {
        let mut store = SignatureEntryStore::new();
        let mut cache = MatchResultCache::new();

        store.load(vec![record("1"), record("2")], &mut cache);
        let first = store.resolve("1").unwrap();
        store.set_status(first, ReviewStatus::Matched).unwrap();
        cache.put(first, MatchResultSet::default());

        let entries = store.load(vec![record("1")], &mut cache);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ReviewStatus::Default);
        assert_ne!(entries[0].id, first);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut store = SignatureEntryStore::new();
        let mut cache = MatchResultCache::new();

        let a = store.load(vec![record("1")], &mut cache)[0].id;
        store.clear(&mut cache);
        let b = store.load(vec![record("1")], &mut cache)[0].id;
        assert_ne!(a, b);
    }

    #[test]
    fn test_set_status_unknown_entry() {
        let mut store = SignatureEntryStore::new();
        let mut cache = MatchResultCache::new();
        let id = store.load(vec![record("1")], &mut cache)[0].id;
        store.clear(&mut cache);

        let result = store.set_status(id, ReviewStatus::NoMatch);
        assert!(matches!(result, Err(ReviewError::NotFound(_))));
    }

    #[test]
    fn test_set_status_records_decision_time() {
        let mut store = SignatureEntryStore::new();
        let mut cache = MatchResultCache::new();
        let id = store.load(vec![record("1")], &mut cache)[0].id;

        store.set_status(id, ReviewStatus::NoMatch).unwrap();
        assert!(store.get(id).unwrap().decided_at.is_some());

        store.set_status(id, ReviewStatus::Default).unwrap();
        assert!(store.get(id).unwrap().decided_at.is_none());
    }

    #[test]
    fn test_replace_record_keeps_id_and_evicts() {
        let mut store = SignatureEntryStore::new();
        let mut cache = MatchResultCache::new();
        let id = store.load(vec![record("L1")], &mut cache)[0].id;
        store.set_status(id, ReviewStatus::Matched).unwrap();
        cache.put(id, MatchResultSet::default());

        let entry = store.replace_record(id, record("L1b"), &mut cache).unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, ReviewStatus::Default);
        assert_eq!(entry.revision, 1);
        assert!(cache.get(id).is_none());

        assert_eq!(store.resolve("L1b").unwrap(), id);
        assert!(store.resolve("L1").is_err());
    }

    #[test]
    fn test_resolve_duplicates_returns_first() {
        let mut store = SignatureEntryStore::new();
        let mut cache = MatchResultCache::new();
        let ids: Vec<EntryId> = store
            .load(vec![record("7"), record("7")], &mut cache)
            .iter()
            .map(|e| e.id)
            .collect();

        assert_eq!(store.resolve(" 7 ").unwrap(), ids[0]);
        assert!(store.line_taken_by_other("7", ids[0]));
    }

    #[test]
    fn test_summary() {
        let mut store = SignatureEntryStore::new();
        let mut cache = MatchResultCache::new();
        store.load(vec![record("1"), record("2"), record("3")], &mut cache);
        store.set_status(store.resolve("1").unwrap(), ReviewStatus::Matched).unwrap();
        store.set_status(store.resolve("3").unwrap(), ReviewStatus::NoMatch).unwrap();

        let summary = store.summary();
        assert_eq!(
            summary,
            ReviewSummary {
                total: 3,
                pending: 1,
                matched: 1,
                no_match: 1
            }
        );
        assert_eq!(summary.to_string(), "3 signatures: 1 matched, 1 no match, 1 pending");
    }
}
