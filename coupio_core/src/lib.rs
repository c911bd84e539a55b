pub mod action;
pub mod card;
pub mod connection;
pub mod deck;
pub mod events;
mod game;
mod game_logic;
pub mod pending;
pub mod player;
pub mod random_bot;
pub mod rules;
pub mod utils;
pub mod view;

pub use action::{Action, Reaction};
pub use card::Card;
pub use connection::{CallError, Connection};
pub use game::{AbortHandle, Game, GameConfig, JoinError, MatchId, Status};
pub use player::{Influence, Player, PlayerId};
pub use rules::Ruleset;
