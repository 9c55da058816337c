//! 表示層へ送るセッションイベント

use super::store::{EntryId, SignatureEntry};
use crate::error::OperationKind;
use sig_review_common::{MatchResultSet, ReviewStatus, SignatureRecord};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum SessionEvent {
    DocumentLoaded {
        filename: String,
        entries: Vec<SignatureEntry>,
    },
    /// 抽出は成功したが署名が0件
    NoSignatures {
        filename: String,
    },
    DetailsLoaded {
        id: EntryId,
        signature_line: String,
        results: MatchResultSet,
    },
    StatusChanged {
        id: EntryId,
        signature_line: String,
        status: ReviewStatus,
    },
    RecordEdited {
        id: EntryId,
        record: SignatureRecord,
    },
    DocumentClosed,
    OperationFailed {
        kind: OperationKind,
        message: String,
    },
}

/// 購読者がいなければ捨てる送信口
#[derive(Debug, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl EventSink {
    pub(crate) fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tx = Some(tx);
        rx
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::debug!("event receiver dropped");
            }
        }
    }
}
