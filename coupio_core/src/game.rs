use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    connection::Connection,
    deck::Deck,
    events::Notice,
    player::{Influence, Player, PlayerId},
    rules::Ruleset,
    utils::VecExtensions,
    view::TableView,
};

pub type MatchId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Waiting,
    Running,
    Aborted,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    MatchFull,
    AlreadyStarted,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::MatchFull => f.write_str("the match is full"),
            JoinError::AlreadyStarted => f.write_str("the match has already started"),
        }
    }
}

impl std::error::Error for JoinError {}

/// Handed to the lobby so it can stop a running match; the engine checks the
/// flag between turns.
#[derive(Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    pub starting_coins: u8,
    pub starting_influences: usize,
    pub turn_timeout: Duration,
    pub reaction_timeout: Duration,
    pub choice_timeout: Duration,
    /// When set, holding at least this many coins makes Coup the only legal
    /// declaration. Left off, only the per-action coin windows apply.
    pub forced_coup_at: Option<u8>,
    pub ruleset: Ruleset,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            min_players: 2,
            max_players: 6,
            starting_coins: 2,
            starting_influences: 2,
            turn_timeout: Duration::from_secs(30),
            reaction_timeout: Duration::from_secs(1),
            choice_timeout: Duration::from_secs(15),
            forced_coup_at: None,
            ruleset: Ruleset::standard(),
        }
    }
}

/// One match: the player registry, the card pool, and the turn engine state.
pub struct Game {
    pub(crate) id: MatchId,
    pub(crate) owner: Option<PlayerId>,
    pub(crate) config: GameConfig,
    pub(crate) status: Status,
    pub(crate) players: Vec<Player>,
    pub(crate) turn: usize,
    pub(crate) deck: Deck,
    next_id: PlayerId,
    abort: Arc<AtomicBool>,
    status_tx: Option<UnboundedSender<(MatchId, Status)>>,
}

impl Game {
    pub fn new(id: MatchId, config: GameConfig) -> Self {
        let deck = Deck::new(config.ruleset.deck_composition());
        Game {
            id,
            owner: None,
            config,
            status: Status::Waiting,
            players: vec![],
            turn: 0,
            deck,
            next_id: 0,
            abort: Arc::new(AtomicBool::new(false)),
            status_tx: None,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(Arc::clone(&self.abort))
    }

    pub fn set_status_sink(&mut self, tx: UnboundedSender<(MatchId, Status)>) {
        self.status_tx = Some(tx);
    }

    /// Register a participant. Ids are assigned from a counter and never
    /// reused within the match, even if someone leaves before the start.
    pub fn add_player(
        &mut self,
        name: impl Into<String>,
        connection: Arc<dyn Connection>,
    ) -> Result<PlayerId, JoinError> {
        if self.status != Status::Waiting {
            return Err(JoinError::AlreadyStarted);
        }
        if self.players.len() >= self.config.max_players {
            return Err(JoinError::MatchFull);
        }
        let id = self.next_id;
        self.next_id += 1;
        if self.owner.is_none() {
            self.owner = Some(id);
        }
        self.players.push(Player::new(id, name.into(), connection));
        Ok(id)
    }

    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        if self.status != Status::Waiting {
            return false;
        }
        self.players.remove_first_where(|p| p.id == id).is_some()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_ready(&self) -> bool {
        self.status == Status::Waiting && self.players.len() >= self.config.min_players
    }

    /// Drive the match to its end. Returns the winner, or `None` when the
    /// match was aborted.
    pub async fn run(&mut self) -> Option<PlayerId> {
        if !self.is_ready() {
            warn!("match {}: start requested without enough players", self.id);
            self.set_status(Status::Aborted);
            return None;
        }

        self.players.shuffle(&mut rand::thread_rng());
        self.turn = 0;
        self.deal();
        self.set_status(Status::Running);

        loop {
            if self.abort.load(Ordering::Relaxed) {
                self.set_status(Status::Aborted);
                return None;
            }
            let alive = self.alive_ids();
            if alive.len() <= 1 {
                let winner = alive.first().copied();
                self.set_status(Status::Finished);
                if let Some(winner) = winner {
                    info!("match {}: player {} won", self.id, winner);
                    self.broadcast(&Notice::Winner(winner));
                }
                return winner;
            }
            self.take_turn().await;
            self.advance_turn();
        }
    }

    fn deal(&mut self) {
        self.deck.reset();
        for player in &mut self.players {
            player.alive = true;
            player.coins = self.config.starting_coins;
            player.influences = self
                .deck
                .take(self.config.starting_influences)
                .into_iter()
                .map(|card| Influence { card, alive: true })
                .collect();
        }
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
        info!("match {}: {:?}", self.id, status);
        if let Some(tx) = &self.status_tx {
            let _ = tx.send((self.id, status));
        }
        self.broadcast(&Notice::Status(status));
    }

    pub(crate) fn alive_ids(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.alive)
            .map(|p| p.id)
            .collect()
    }

    pub(crate) fn player(&self, id: PlayerId) -> &Player {
        self.players
            .iter()
            .find(|p| p.id == id)
            .expect("player ids are never removed while running")
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .expect("player ids are never removed while running")
    }

    /// Move the turn pointer to the next living participant.
    pub(crate) fn advance_turn(&mut self) {
        self.turn = (self.turn + 1) % self.players.len();
        while !self.players[self.turn].alive {
            self.turn = (self.turn + 1) % self.players.len();
        }
    }

    pub(crate) fn current_player_id(&self) -> PlayerId {
        self.players[self.turn].id
    }

    pub(crate) fn broadcast(&self, notice: &Notice) {
        for player in &self.players {
            player.connection.notify(notice);
        }
    }

    pub(crate) fn broadcast_except(&self, skip: PlayerId, notice: &Notice) {
        for player in self.players.iter().filter(|p| p.id != skip) {
            player.connection.notify(notice);
        }
    }

    /// Emit each participant's obfuscated snapshot of the table.
    pub(crate) fn broadcast_update(&self) {
        let current = self.current_player_id();
        for player in &self.players {
            let view = self.table_view_for(player.id, current);
            player.connection.notify(&Notice::Update(view));
        }
    }

    pub fn table_view_for(&self, observer: PlayerId, current: PlayerId) -> TableView {
        TableView {
            current_player: current,
            you: self.player(observer).private_view(),
            others: self
                .players
                .iter()
                .filter(|p| p.id != observer)
                .map(|p| p.public_view())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Game, GameConfig, JoinError, Status};
    use crate::random_bot::RandomBot;

    fn game() -> Game {
        Game::new(1, GameConfig::default())
    }

    fn join(game: &mut Game, name: &str) -> usize {
        game.add_player(name, Arc::new(RandomBot::new())).unwrap()
    }

    #[test]
    fn add_player_should_never_reuse_ids() {
        let mut game = game();
        let first = join(&mut game, "a");
        let second = join(&mut game, "b");
        assert_eq!((first, second), (0, 1));

        game.remove_player(first);
        let third = join(&mut game, "c");

        assert_eq!(third, 2);
    }

    #[test]
    fn add_player_should_reject_when_full() {
        let mut game = game();
        for i in 0..6 {
            join(&mut game, &format!("p{}", i));
        }

        let result = game.add_player("late", Arc::new(RandomBot::new()));

        assert_eq!(result, Err(JoinError::MatchFull));
    }

    #[test]
    fn add_player_should_reject_after_start() {
        let mut game = game();
        join(&mut game, "a");
        game.status = Status::Running;

        let result = game.add_player("late", Arc::new(RandomBot::new()));

        assert_eq!(result, Err(JoinError::AlreadyStarted));
    }

    #[test]
    fn first_player_should_own_the_match() {
        let mut game = game();
        let first = join(&mut game, "a");
        join(&mut game, "b");

        assert_eq!(game.owner, Some(first));
    }

    #[test]
    fn advance_turn_should_skip_dead_players() {
        let mut game = game();
        join(&mut game, "a");
        join(&mut game, "b");
        join(&mut game, "c");
        game.players[1].alive = false;

        game.advance_turn();

        assert_eq!(game.turn, 2);
    }

    #[tokio::test]
    async fn run_should_abort_without_enough_players() {
        let mut game = game();
        join(&mut game, "alone");

        let winner = game.run().await;

        assert_eq!(winner, None);
        assert_eq!(game.status(), Status::Aborted);
    }

    #[tokio::test]
    async fn abort_handle_should_stop_a_running_match() {
        let mut game = game();
        join(&mut game, "a");
        join(&mut game, "b");
        game.abort_handle().abort();

        let winner = game.run().await;

        assert_eq!(winner, None);
        assert_eq!(game.status(), Status::Aborted);
    }
}
