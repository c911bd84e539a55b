use serde::{Deserialize, Serialize};

use crate::{
    action::{Action, Reaction},
    card::Card,
    game::{MatchId, Status},
    player::PlayerId,
    view::TableView,
};

/// A question the engine puts to one participant. Every request is bounded
/// by a timeout on the server side; the participant answers with the
/// matching [`Reply`] variant or is treated per the owning protocol's
/// fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Your turn: declare an action and an optional target.
    Turn,
    /// Another player declared an action; challenge, block, or pass.
    Reaction {
        actor: PlayerId,
        target: Option<PlayerId>,
        action: Action,
    },
    /// A block claim was raised; only a challenge (or a pass) is legal now.
    BlockReaction { blocker: PlayerId, claim: Card },
    /// You lose an influence: name one of your living cards.
    KillSelection,
    /// Exchange: pick exactly `count` cards to give back, chosen from your
    /// living cards plus `drawn`.
    SwapSelection { drawn: Vec<Card>, count: usize },
    /// An inquisitor inspects you: show one living card.
    RevealSelection { requester: PlayerId },
    /// You inspected `card`; decide whether its owner keeps it.
    InspectDecision { card: Card },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Turn {
        action: Action,
        target: Option<PlayerId>,
    },
    Reaction(Reaction),
    Influence(Card),
    Swap(Vec<Card>),
    Inspect(InspectChoice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InspectChoice {
    Keep,
    Replace,
}

/// Fire-and-forget announcements. Everything a participant learns outside
/// of a request arrives through one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    Update(TableView),
    Declared {
        actor: PlayerId,
        target: Option<PlayerId>,
        action: Action,
    },
    Blocked {
        blocker: PlayerId,
        claim: Card,
    },
    ChallengeResult {
        challenger: PlayerId,
        accused: PlayerId,
        claim: Card,
        upheld: bool,
    },
    InfluenceLost {
        player: PlayerId,
        card: Card,
    },
    /// Sent only to an inspecting player: what the target showed.
    Revealed {
        player: PlayerId,
        card: Card,
    },
    /// A player traded cards with the deck (exchange or forced replace).
    Exchanged {
        player: PlayerId,
    },
    Eliminated {
        player: PlayerId,
        reason: String,
    },
    Status(Status),
    Winner(PlayerId),
}

/// Lobby-side announcements, produced by the server crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LobbyEvent {
    Created(MatchId),
    Joined(MatchId),
    PlayerJoined { game: MatchId, count: usize },
    Left(MatchId),
    Started(MatchId),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LobbyCommand {
    Create,
    Join(MatchId),
    FindRandom,
    Leave,
    Start,
}

/// Everything the server sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Request(Request),
    Notice(Notice),
    Lobby(LobbyEvent),
}

/// Everything a client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    Lobby(LobbyCommand),
    Reply(Reply),
}
