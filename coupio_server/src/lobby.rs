use std::collections::HashMap;
use std::fmt;

use rand::seq::SliceRandom;

use coupio_core::MatchId;

/// Raw netcode client id; the lobby never touches the transport itself.
pub type ClientKey = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyError {
    UnknownGame,
    GameUnavailable,
    AlreadyInGame,
    NotInGame,
    NotOwner,
    NotEnoughPlayers,
}

impl fmt::Display for LobbyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LobbyError::UnknownGame => f.write_str("that game does not exist"),
            LobbyError::GameUnavailable => f.write_str("that game is not open for joining"),
            LobbyError::AlreadyInGame => f.write_str("you already are in a game"),
            LobbyError::NotInGame => f.write_str("you are not in a game"),
            LobbyError::NotOwner => f.write_str("only the owner can start the game"),
            LobbyError::NotEnoughPlayers => f.write_str("not enough players to start"),
        }
    }
}

impl std::error::Error for LobbyError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Waiting,
    Running,
}

pub struct Room {
    pub owner: ClientKey,
    pub members: Vec<ClientKey>,
    pub state: RoomState,
}

/// What `leave` undid: which room, whether it was torn down with the owner,
/// and who is left to notify.
pub struct Departure {
    pub game: MatchId,
    pub state: RoomState,
    pub was_owner: bool,
    pub remaining: Vec<ClientKey>,
}

/// The room registry. Pure bookkeeping: match creation and membership live
/// here, the actual games run elsewhere and report back through `close`.
pub struct Lobby {
    min_players: usize,
    max_players: usize,
    rooms: HashMap<MatchId, Room>,
}

impl Lobby {
    pub fn new(min_players: usize, max_players: usize) -> Self {
        Lobby {
            min_players,
            max_players,
            rooms: HashMap::new(),
        }
    }

    pub fn game_of(&self, client: ClientKey) -> Option<MatchId> {
        self.rooms
            .iter()
            .find(|(_, room)| room.members.contains(&client))
            .map(|(&id, _)| id)
    }

    pub fn room(&self, id: MatchId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn create(&mut self, owner: ClientKey) -> Result<MatchId, LobbyError> {
        if self.game_of(owner).is_some() {
            return Err(LobbyError::AlreadyInGame);
        }
        let id = rand::random();
        self.rooms.insert(
            id,
            Room {
                owner,
                members: vec![owner],
                state: RoomState::Waiting,
            },
        );
        Ok(id)
    }

    /// Join an open room; returns the new member count.
    pub fn join(&mut self, client: ClientKey, id: MatchId) -> Result<usize, LobbyError> {
        if self.game_of(client).is_some() {
            return Err(LobbyError::AlreadyInGame);
        }
        let max_players = self.max_players;
        let room = self.rooms.get_mut(&id).ok_or(LobbyError::UnknownGame)?;
        if room.state != RoomState::Waiting || room.members.len() >= max_players {
            return Err(LobbyError::GameUnavailable);
        }
        room.members.push(client);
        Ok(room.members.len())
    }

    pub fn find_random(&self) -> Option<MatchId> {
        let open: Vec<MatchId> = self
            .rooms
            .iter()
            .filter(|(_, room)| {
                room.state == RoomState::Waiting && room.members.len() < self.max_players
            })
            .map(|(&id, _)| id)
            .collect();
        open.choose(&mut rand::thread_rng()).copied()
    }

    /// Remove a client from its room. An owner's departure tears the whole
    /// room down; a running match behind it is the caller's to abort.
    pub fn leave(&mut self, client: ClientKey) -> Result<Departure, LobbyError> {
        let id = self.game_of(client).ok_or(LobbyError::NotInGame)?;
        let room = self.rooms.get_mut(&id).expect("game_of found the room");
        room.members.retain(|&m| m != client);
        let was_owner = room.owner == client;
        let state = room.state;
        let remaining = room.members.clone();
        if was_owner || remaining.is_empty() {
            self.rooms.remove(&id);
        }
        Ok(Departure {
            game: id,
            state,
            was_owner,
            remaining,
        })
    }

    /// Flip a room to running; only the owner may, and only with enough
    /// players seated.
    pub fn start(&mut self, client: ClientKey) -> Result<(MatchId, Vec<ClientKey>), LobbyError> {
        let id = self.game_of(client).ok_or(LobbyError::NotInGame)?;
        let min_players = self.min_players;
        let room = self.rooms.get_mut(&id).expect("game_of found the room");
        if room.owner != client {
            return Err(LobbyError::NotOwner);
        }
        if room.state != RoomState::Waiting {
            return Err(LobbyError::GameUnavailable);
        }
        if room.members.len() < min_players {
            return Err(LobbyError::NotEnoughPlayers);
        }
        room.state = RoomState::Running;
        Ok((id, room.members.clone()))
    }

    /// Tear down a finished or aborted room; returns whoever was seated.
    pub fn close(&mut self, id: MatchId) -> Vec<ClientKey> {
        self.rooms
            .remove(&id)
            .map(|room| room.members)
            .unwrap_or_default()
    }
}
