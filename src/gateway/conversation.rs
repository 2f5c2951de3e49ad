//! The single "awaiting answer" slot shared by the survey runner and the router.

use checkin_core::catalog::{Question, QuestionKind};
use checkin_core::message::GeoPoint;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// What the router hands to a waiting run.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Free text or a button's callback value.
    Answer {
        text: String,
        message_id: Option<i64>,
    },
    Location(GeoPoint),
    Skip,
    SkipAll,
}

/// Read-only view of the pending question, for status output.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInfo {
    pub key: String,
    pub kind: QuestionKind,
    pub sent_at: DateTime<Utc>,
}

struct Pending {
    question: Question,
    sent_at: DateTime<Utc>,
    /// Taken by the first reply; later replies find the slot already answered.
    reply_tx: Option<oneshot::Sender<Reply>>,
}

#[derive(Default)]
struct Inner {
    pending: Option<Pending>,
    skip_all: bool,
}

/// Conversation state: at most one pending question plus the run's skip-all flag.
///
/// All access goes through one mutex. The lock is never held across an await.
#[derive(Default)]
pub struct ConversationState {
    inner: Mutex<Inner>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a fresh run: clear the skip-all flag and any stale pending slot.
    pub fn reset_run(&self) {
        let mut inner = self.lock();
        inner.skip_all = false;
        inner.pending = None;
    }

    /// Mark `question` as pending and return the receiver its reply arrives on.
    pub fn begin(&self, question: &Question) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.lock().pending = Some(Pending {
            question: question.clone(),
            sent_at: Utc::now(),
            reply_tx: Some(tx),
        });
        rx
    }

    /// Mark an informational line as current. It accepts no reply, so
    /// anything the user sends meanwhile gets the "no question" answer.
    pub fn begin_header(&self, question: &Question) {
        self.lock().pending = Some(Pending {
            question: question.clone(),
            sent_at: Utc::now(),
            reply_tx: None,
        });
    }

    /// Hand a reply to the pending question. Returns false when nothing is waiting.
    pub fn deliver(&self, reply: Reply) -> bool {
        let tx = {
            let mut inner = self.lock();
            inner.pending.as_mut().and_then(|p| p.reply_tx.take())
        };
        match tx {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }

    /// Return to idle.
    pub fn clear(&self) {
        self.lock().pending = None;
    }

    /// Set the skip-all flag and wake a waiting question, if any.
    ///
    /// Returns true when a pending question received the directive.
    pub fn request_skip_all(&self) -> bool {
        let tx = {
            let mut inner = self.lock();
            inner.skip_all = true;
            inner.pending.as_mut().and_then(|p| p.reply_tx.take())
        };
        match tx {
            Some(tx) => tx.send(Reply::SkipAll).is_ok(),
            None => false,
        }
    }

    pub fn skip_all_requested(&self) -> bool {
        self.lock().skip_all
    }

    pub fn pending(&self) -> Option<PendingInfo> {
        self.lock().pending.as_ref().map(|p| PendingInfo {
            key: p.question.key.clone(),
            kind: p.question.kind,
            sent_at: p.sent_at,
        })
    }
}
