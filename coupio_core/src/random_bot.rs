use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::{
    action::{Action, Reaction},
    card::Card,
    connection::{CallError, Connection},
    events::{InspectChoice, Notice, Reply, Request},
    view::TableView,
};

/// An in-process participant that always answers, always legally, and never
/// bluffs: income until it can afford a coup, then a coup at random. Used to
/// fill seats in tests and smoke runs.
pub struct RandomBot {
    view: Mutex<Option<TableView>>,
}

impl RandomBot {
    pub fn new() -> Self {
        RandomBot {
            view: Mutex::new(None),
        }
    }

    fn own_cards(&self) -> Vec<Card> {
        self.view
            .lock()
            .unwrap()
            .as_ref()
            .map(|view| {
                view.you
                    .influences
                    .iter()
                    .filter(|i| i.alive)
                    .filter_map(|i| i.card)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for RandomBot {
    fn default() -> Self {
        RandomBot::new()
    }
}

#[async_trait]
impl Connection for RandomBot {
    async fn call(&self, request: Request, _timeout: Duration) -> Result<Reply, CallError> {
        match request {
            Request::Turn => {
                let view = self.view.lock().unwrap().clone();
                let Some(view) = view else {
                    return Err(CallError::Timeout);
                };
                let opponents: Vec<_> = view
                    .others
                    .iter()
                    .filter(|p| p.alive)
                    .map(|p| p.id)
                    .collect();
                if view.you.coins >= 7 && !opponents.is_empty() {
                    Ok(Reply::Turn {
                        action: Action::Coup,
                        target: opponents.choose(&mut rand::thread_rng()).copied(),
                    })
                } else {
                    Ok(Reply::Turn {
                        action: Action::Income,
                        target: None,
                    })
                }
            }
            Request::Reaction { .. } | Request::BlockReaction { .. } => {
                Ok(Reply::Reaction(Reaction::Pass))
            }
            Request::KillSelection | Request::RevealSelection { .. } => {
                let cards = self.own_cards();
                match cards.choose(&mut rand::thread_rng()) {
                    Some(card) => Ok(Reply::Influence(*card)),
                    None => Err(CallError::Timeout),
                }
            }
            Request::SwapSelection { drawn, .. } => Ok(Reply::Swap(drawn)),
            Request::InspectDecision { .. } => Ok(Reply::Inspect(InspectChoice::Keep)),
        }
    }

    fn notify(&self, notice: &Notice) {
        if let Notice::Update(view) = notice {
            *self.view.lock().unwrap() = Some(view.clone());
        }
    }
}
