use serde::{Deserialize, Serialize};

use crate::{
    card::Card,
    player::{Player, PlayerId},
};

/// One influence slot as someone else sees it: dead cards are face up,
/// living cards of other players render as a blank placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluenceView {
    pub card: Option<Card>,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    pub coins: u8,
    pub influences: Vec<InfluenceView>,
}

/// The per-participant state snapshot broadcast at the top of every turn.
/// `you` carries the recipient's full hand; `others` never leaks a living
/// card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub current_player: PlayerId,
    pub you: PlayerView,
    pub others: Vec<PlayerView>,
}

impl Player {
    pub fn private_view(&self) -> PlayerView {
        self.view(true)
    }

    pub fn public_view(&self) -> PlayerView {
        self.view(false)
    }

    fn view(&self, show_living: bool) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            alive: self.alive,
            coins: self.coins,
            influences: self
                .influences
                .iter()
                .map(|influence| InfluenceView {
                    card: if influence.alive && !show_living {
                        None
                    } else {
                        Some(influence.card)
                    },
                    alive: influence.alive,
                })
                .collect(),
        }
    }
}
