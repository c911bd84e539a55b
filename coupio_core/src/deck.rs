use rand::seq::SliceRandom;

use crate::card::Card;

/// The shared pool of role cards not currently held by a player.
///
/// The pool never grows or shrinks over the lifetime of a match: every card
/// taken out must come back through `put_back` or `replace`. Asking for more
/// cards than the pool holds is an accounting bug, not a runtime condition,
/// and panics.
pub struct Deck {
    composition: Vec<Card>,
    cards: Vec<Card>,
}

impl Deck {
    pub fn new(composition: Vec<Card>) -> Self {
        let mut deck = Deck {
            composition,
            cards: vec![],
        };
        deck.reset();
        deck
    }

    /// Refill to the initial supply and shuffle.
    pub fn reset(&mut self) {
        self.cards = self.composition.clone();
        self.shuffle();
    }

    /// Remove and return `n` cards.
    pub fn take(&mut self, n: usize) -> Vec<Card> {
        if n > self.cards.len() {
            panic!(
                "deck underflow: asked for {} cards with {} remaining",
                n,
                self.cards.len()
            );
        }
        self.cards.split_off(self.cards.len() - n)
    }

    /// Return cards to the pool and shuffle.
    pub fn put_back(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
        self.shuffle();
    }

    /// Return `card` to the pool, shuffle, and draw a fresh one. Shuffling
    /// before the draw keeps the returned card from telegraphing what is
    /// left in the pool.
    pub fn replace(&mut self, card: Card) -> Card {
        self.cards.push(card);
        self.shuffle();
        self.take(1)[0]
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn count_of(&self, role: Card) -> usize {
        self.cards.iter().filter(|&&c| c == role).count()
    }

    fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::thread_rng());
    }
}
