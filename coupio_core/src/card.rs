use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{EnumMessage, IntoEnumIterator};
use strum_macros::{Display, EnumIter, EnumMessage, EnumString};

/// A role card. The same value doubles as the character held in an influence
/// slot and as the claim a player makes when declaring that character's
/// action. Equality is by role only; individual copies are indistinguishable.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    EnumMessage,
)]
pub enum Card {
    #[strum(
        message = "Declare the Duke to take three coins of tax. The Duke also blocks foreign aid."
    )]
    Duke,
    #[strum(
        message = "Declare the Assassin to pay three coins and force an opponent to give up an influence."
    )]
    Assassin,
    #[strum(
        message = "Declare the Captain to steal up to two coins from an opponent. The Captain also blocks stealing."
    )]
    Captain,
    #[strum(
        message = "Declare the Ambassador to exchange cards with the deck. The Ambassador also blocks stealing."
    )]
    Ambassador,
    #[strum(
        message = "Declare the Inquisitor to exchange a card with the deck, or to inspect an opponent's card and decide whether they keep it. The Inquisitor also blocks stealing."
    )]
    Inquisitor,
    #[strum(
        message = "The Contessa cannot be declared; she only blocks an assassination aimed at you."
    )]
    Contessa,
}

impl Card {
    pub fn rules() -> String {
        Card::iter().map(|c| c.rule()).join("\n")
    }

    pub fn rule(&self) -> String {
        format!("{}: {}", self, self.get_message().unwrap_or("No rule"))
    }
}
