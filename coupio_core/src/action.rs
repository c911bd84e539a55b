use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::Card;

/// An action as declared by the current player. Character actions are
/// declared by naming the role card, which is a claim to hold that card and
/// therefore open to challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Income,
    ForeignAid,
    Coup,
    Claim(Card),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Income => f.write_str("Income"),
            Action::ForeignAid => f.write_str("Foreign Aid"),
            Action::Coup => f.write_str("Coup"),
            Action::Claim(card) => write!(f, "{}", card),
        }
    }
}

/// A reply to a broadcast action or block claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reaction {
    Challenge,
    Block(Card),
    Pass,
}
