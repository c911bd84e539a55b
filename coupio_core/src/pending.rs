use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use crate::{
    action::Reaction,
    card::Card,
    connection::CallError,
    events::Reply,
    player::PlayerId,
};

/// The single answer that settles a reaction window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Challenge(PlayerId),
    Block { blocker: PlayerId, claim: Card },
}

/// What a reaction window produced: at most one decisive answer, plus every
/// reactor whose reply was outright illegal and must be eliminated.
#[derive(Debug)]
pub struct Resolution {
    pub decision: Option<Decision>,
    pub offenders: Vec<(PlayerId, String)>,
}

#[derive(Default)]
struct Book {
    answered: usize,
    decision: Option<Decision>,
    offenders: Vec<(PlayerId, String)>,
}

/// The response book for one broadcast decision point.
///
/// Reactors are asked concurrently and their answers race; the book is the
/// one critical section that serializes them. The first valid challenge or
/// block wins, later valid answers lose the race and are ignored, and every
/// answer counts toward "everyone has replied" even after the decision is
/// settled. Illegal answers never settle anything; they only mark the
/// replier for elimination.
pub struct PendingAction {
    expected: usize,
    challengeable: bool,
    blockable_with: Vec<Card>,
    book: Mutex<Book>,
    progress: Notify,
}

impl PendingAction {
    pub fn new(expected: usize, challengeable: bool, blockable_with: Vec<Card>) -> Arc<Self> {
        Arc::new(PendingAction {
            expected,
            challengeable,
            blockable_with,
            book: Mutex::new(Book::default()),
            progress: Notify::new(),
        })
    }

    /// Record one reactor's outcome. Timeouts and dead sessions count as
    /// silence.
    pub fn submit(&self, responder: PlayerId, outcome: Result<Reply, CallError>) {
        let mut book = self.book.lock().unwrap();
        book.answered += 1;

        match outcome {
            Ok(Reply::Reaction(Reaction::Pass)) | Err(_) => {}
            Ok(Reply::Reaction(Reaction::Challenge)) => {
                if !self.challengeable {
                    book.offenders
                        .push((responder, "challenged an unchallengeable action".to_string()));
                } else if book.decision.is_none() {
                    book.decision = Some(Decision::Challenge(responder));
                }
            }
            Ok(Reply::Reaction(Reaction::Block(claim))) => {
                if !self.blockable_with.contains(&claim) {
                    book.offenders
                        .push((responder, format!("{} cannot block this action", claim)));
                } else if book.decision.is_none() {
                    book.decision = Some(Decision::Block {
                        blocker: responder,
                        claim,
                    });
                }
            }
            Ok(_) => {
                book.offenders
                    .push((responder, "unrecognized reaction".to_string()));
            }
        }

        drop(book);
        self.progress.notify_one();
    }

    /// Wait until a decisive answer lands, everyone has answered, or the
    /// window elapses, whichever comes first.
    pub async fn resolve(&self, window: Duration) -> Resolution {
        let deadline = Instant::now() + window;
        loop {
            let notified = self.progress.notified();
            {
                let book = self.book.lock().unwrap();
                if book.decision.is_some() || book.answered >= self.expected {
                    break;
                }
            }
            if timeout_at(deadline, notified).await.is_err() {
                break;
            }
        }

        let mut book = self.book.lock().unwrap();
        Resolution {
            decision: book.decision,
            offenders: std::mem::take(&mut book.offenders),
        }
    }
}
