mod lobby;
mod remote;

use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use log::{info, warn};
use renet::{
    transport::{NetcodeServerTransport, ServerAuthentication, ServerConfig},
    ClientId, ConnectionConfig, DefaultChannel, RenetServer, ServerEvent,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time;

use coupio_core::events::{
    ClientMessage, LobbyCommand, LobbyEvent, Reply, ServerMessage,
};
use coupio_core::{AbortHandle, Connection, Game, GameConfig, MatchId, Status};

use crate::lobby::{ClientKey, Lobby, RoomState};
use crate::remote::RemoteConnection;

/// Per-client session state: the channel the engine and lobby write to, and
/// the reply queue of the match the client currently plays in.
struct ClientState {
    name: String,
    outbound_tx: UnboundedSender<ServerMessage>,
    outbound_rx: UnboundedReceiver<ServerMessage>,
    reply_tx: Option<UnboundedSender<Reply>>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("Usage: [SERVER_PORT]");
    let args: Vec<String> = std::env::args().collect();
    let public_addr: SocketAddr = format!("0.0.0.0:{}", args[1]).parse().unwrap();
    let connection_config = ConnectionConfig::default();
    let mut server: RenetServer = RenetServer::new(connection_config);

    let current_time = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap();
    let server_config = ServerConfig {
        current_time,
        max_clients: 64,
        protocol_id: 0,
        public_addresses: vec![public_addr],
        authentication: ServerAuthentication::Unsecure,
    };
    let socket: UdpSocket = UdpSocket::bind(public_addr).unwrap();
    let mut transport = NetcodeServerTransport::new(server_config, socket).unwrap();

    let mut clients: HashMap<ClientKey, ClientState> = HashMap::new();
    let mut lobby = Lobby::new(2, 6);
    let mut aborts: HashMap<MatchId, AbortHandle> = HashMap::new();
    let (status_tx, mut status_rx) = unbounded_channel::<(MatchId, Status)>();

    let mut interval = time::interval(Duration::from_millis(50));
    let mut last_updated = Instant::now();

    loop {
        let now = Instant::now();
        let duration = now - last_updated;
        last_updated = now;

        server.update(duration);
        transport.update(duration, &mut server).unwrap();

        while let Some(event) = server.get_event() {
            match event {
                ServerEvent::ClientConnected { client_id } => {
                    info!("client {} connected", client_id);
                    let (outbound_tx, outbound_rx) = unbounded_channel();
                    clients.insert(
                        client_id.raw(),
                        ClientState {
                            name: format!("player-{}", client_id),
                            outbound_tx,
                            outbound_rx,
                            reply_tx: None,
                        },
                    );
                }
                ServerEvent::ClientDisconnected { client_id, reason } => {
                    info!("client {} disconnected: {}", client_id, reason);
                    clients.remove(&client_id.raw());
                    handle_departure(client_id.raw(), &mut lobby, &mut aborts, &clients);
                }
            }
        }

        for client_id in server.clients_id() {
            while let Some(message) =
                server.receive_message(client_id, DefaultChannel::ReliableOrdered)
            {
                let Ok(text) = String::from_utf8(message.into()) else {
                    continue;
                };
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => handle_client_message(
                        client_id.raw(),
                        message,
                        &mut lobby,
                        &mut clients,
                        &mut aborts,
                        &status_tx,
                    ),
                    Err(err) => warn!("client {}: undecodable message: {}", client_id, err),
                }
            }
        }

        while let Ok((match_id, status)) = status_rx.try_recv() {
            if matches!(status, Status::Finished | Status::Aborted) {
                aborts.remove(&match_id);
                for member in lobby.close(match_id) {
                    if let Some(state) = clients.get_mut(&member) {
                        state.reply_tx = None;
                    }
                }
            }
        }

        for (&client, state) in clients.iter_mut() {
            while let Ok(message) = state.outbound_rx.try_recv() {
                if let Ok(text) = serde_json::to_string(&message) {
                    server.send_message(
                        ClientId::from_raw(client),
                        DefaultChannel::ReliableOrdered,
                        text,
                    );
                }
            }
        }

        transport.send_packets(&mut server);
        interval.tick().await;
    }
}

fn send_lobby_event(clients: &HashMap<ClientKey, ClientState>, client: ClientKey, event: LobbyEvent) {
    if let Some(state) = clients.get(&client) {
        let _ = state.outbound_tx.send(ServerMessage::Lobby(event));
    }
}

fn handle_client_message(
    client: ClientKey,
    message: ClientMessage,
    lobby: &mut Lobby,
    clients: &mut HashMap<ClientKey, ClientState>,
    aborts: &mut HashMap<MatchId, AbortHandle>,
    status_tx: &UnboundedSender<(MatchId, Status)>,
) {
    match message {
        ClientMessage::Reply(reply) => {
            if let Some(tx) = clients.get(&client).and_then(|s| s.reply_tx.as_ref()) {
                let _ = tx.send(reply);
            }
        }
        ClientMessage::Lobby(command) => {
            handle_lobby_command(client, command, lobby, clients, aborts, status_tx)
        }
    }
}

fn handle_lobby_command(
    client: ClientKey,
    command: LobbyCommand,
    lobby: &mut Lobby,
    clients: &mut HashMap<ClientKey, ClientState>,
    aborts: &mut HashMap<MatchId, AbortHandle>,
    status_tx: &UnboundedSender<(MatchId, Status)>,
) {
    match command {
        LobbyCommand::Create => match lobby.create(client) {
            Ok(id) => {
                info!("client {} created game {}", client, id);
                send_lobby_event(clients, client, LobbyEvent::Created(id));
            }
            Err(err) => send_lobby_event(clients, client, LobbyEvent::Error(err.to_string())),
        },
        LobbyCommand::Join(id) => join_game(client, id, lobby, clients),
        LobbyCommand::FindRandom => match lobby.find_random() {
            Some(id) => join_game(client, id, lobby, clients),
            None => send_lobby_event(
                clients,
                client,
                LobbyEvent::Error("no game available".to_string()),
            ),
        },
        LobbyCommand::Leave => handle_departure(client, lobby, aborts, clients),
        LobbyCommand::Start => match lobby.start(client) {
            Ok((id, members)) => spawn_match(id, &members, clients, aborts, status_tx),
            Err(err) => send_lobby_event(clients, client, LobbyEvent::Error(err.to_string())),
        },
    }
}

fn join_game(
    client: ClientKey,
    id: MatchId,
    lobby: &mut Lobby,
    clients: &HashMap<ClientKey, ClientState>,
) {
    match lobby.join(client, id) {
        Ok(count) => {
            info!("client {} joined game {}", client, id);
            send_lobby_event(clients, client, LobbyEvent::Joined(id));
            if let Some(room) = lobby.room(id) {
                for &member in room.members.iter().filter(|&&m| m != client) {
                    send_lobby_event(clients, member, LobbyEvent::PlayerJoined { game: id, count });
                }
            }
        }
        Err(err) => send_lobby_event(clients, client, LobbyEvent::Error(err.to_string())),
    }
}

fn handle_departure(
    client: ClientKey,
    lobby: &mut Lobby,
    aborts: &mut HashMap<MatchId, AbortHandle>,
    clients: &HashMap<ClientKey, ClientState>,
) {
    let Ok(departure) = lobby.leave(client) else {
        return;
    };
    // the owner takes the match down along with the room
    if departure.was_owner && departure.state == RoomState::Running {
        if let Some(handle) = aborts.remove(&departure.game) {
            handle.abort();
        }
    }
    for &member in &departure.remaining {
        send_lobby_event(clients, member, LobbyEvent::Left(departure.game));
    }
}

fn spawn_match(
    id: MatchId,
    members: &[ClientKey],
    clients: &mut HashMap<ClientKey, ClientState>,
    aborts: &mut HashMap<MatchId, AbortHandle>,
    status_tx: &UnboundedSender<(MatchId, Status)>,
) {
    let mut game = Game::new(id, GameConfig::default());
    game.set_status_sink(status_tx.clone());

    for member in members {
        let Some(state) = clients.get_mut(member) else {
            continue;
        };
        let (reply_tx, reply_rx) = unbounded_channel();
        state.reply_tx = Some(reply_tx);
        let connection: Arc<dyn Connection> =
            Arc::new(RemoteConnection::new(state.outbound_tx.clone(), reply_rx));
        if let Err(err) = game.add_player(state.name.clone(), connection) {
            warn!("game {}: could not seat client {}: {}", id, member, err);
        }
    }
    aborts.insert(id, game.abort_handle());
    for &member in members {
        send_lobby_event(clients, member, LobbyEvent::Started(id));
    }
    info!("game {} started with {} players", id, members.len());

    tokio::spawn(async move {
        game.run().await;
    });
}
