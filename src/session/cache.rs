//! 照合結果キャッシュモジュール
//!
//! エントリIDをキーにして照合サービスの結果を保持し、
//! 同じレコードの再照合をスキップする。
//! セッション中のみ有効で、ファイルには保存しない。

use super::store::EntryId;
use sig_review_common::MatchResultSet;
use std::collections::HashMap;

/// セッション内キャッシュ
///
/// 値は上書きか削除のみ。編集されたレコードの結果を部分更新することはない。
#[derive(Debug, Clone, Default)]
pub struct MatchResultCache {
    entries: HashMap<EntryId, MatchResultSet>,
}

impl MatchResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// キャッシュをルックアップ
    pub fn get(&self, id: EntryId) -> Option<&MatchResultSet> {
        self.entries.get(&id)
    }

    /// キャッシュに追加（既存は上書き）
    pub fn put(&mut self, id: EntryId, results: MatchResultSet) {
        self.entries.insert(id, results);
    }

    /// キャッシュから削除（無ければ何もしない）
    pub fn evict(&mut self, id: EntryId) -> Option<MatchResultSet> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// キャッシュ件数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
