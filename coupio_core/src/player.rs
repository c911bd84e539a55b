use std::sync::Arc;

use crate::{card::Card, connection::Connection};

pub type PlayerId = usize;

/// One hidden card slot. A dead influence stays on the table face up; it no
/// longer counts for claims or challenges but is shown to everyone.
#[derive(Debug, Clone)]
pub struct Influence {
    pub card: Card,
    pub alive: bool,
}

/// A participant in one match. All mutation goes through the turn engine and
/// the protocols it invokes; inbound messages never touch this directly.
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub connection: Arc<dyn Connection>,
    pub alive: bool,
    pub coins: u8,
    pub influences: Vec<Influence>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, connection: Arc<dyn Connection>) -> Self {
        Player {
            id,
            name,
            connection,
            alive: true,
            coins: 0,
            influences: vec![],
        }
    }

    pub fn alive_influence_count(&self) -> usize {
        self.influences.iter().filter(|i| i.alive).count()
    }

    pub fn alive_cards(&self) -> Vec<Card> {
        self.influences
            .iter()
            .filter(|i| i.alive)
            .map(|i| i.card)
            .collect()
    }

    pub fn holds_alive(&self, card: Card) -> bool {
        self.influences.iter().any(|i| i.alive && i.card == card)
    }

    pub fn first_alive_influence_mut(&mut self, card: Card) -> Option<&mut Influence> {
        self.influences
            .iter_mut()
            .find(|i| i.alive && i.card == card)
    }
}
