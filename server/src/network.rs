//! Server network layer: TCP accept loop, per-connection tasks, and the
//! fixed-rate simulation tick.

use crate::connection::{Connection, ConnectionManager};
use log::{debug, error, info, warn};
use shared::game::{Game, GameConfig};
use shared::{wire, TICK};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to the main server loop.
#[derive(Debug)]
pub enum ServerMessage {
    /// Raw bytes read from a connection's socket.
    Data { conn_id: u64, bytes: Vec<u8> },
    /// The connection's read side ended (EOF or I/O error).
    Closed { conn_id: u64 },
}

/// Main server coordinating the listener, connection tasks, and simulation.
pub struct Server {
    listener: TcpListener,
    game: Game,
    connections: ConnectionManager,
    tick: u64,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
        config: GameConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            game: Game::new(config),
            connections: ConnectionManager::new(max_clients),
            tick: 0,
            server_tx,
            server_rx,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main server loop coordinating all operations.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut tick_interval = interval(Duration::from_secs_f32(TICK));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("server started");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.accept_connection(stream, addr),
                        Err(e) => error!("accept failed: {}", e),
                    }
                },

                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Data { conn_id, bytes }) => {
                            self.handle_data(conn_id, &bytes);
                        }
                        Some(ServerMessage::Closed { conn_id }) => {
                            self.drop_connection(conn_id);
                        }
                        None => break,
                    }
                },

                _ = tick_interval.tick() => {
                    self.game.update(TICK);
                    self.broadcast_state();
                    self.tick += 1;

                    if self.tick % 50 == 0 && !self.connections.is_empty() {
                        debug!(
                            "tick {}: {} connections, {}x{} grid, paused={}",
                            self.tick,
                            self.connections.len(),
                            self.game.width,
                            self.game.height,
                            self.game.paused,
                        );
                    }
                },
            }
        }

        Ok(())
    }

    /// Registers a freshly accepted socket: spawns its player and its
    /// reader/writer tasks.
    fn accept_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        if !self.connections.has_capacity() {
            // the protocol has no rejection message; just close the socket
            warn!("rejecting connection from {}: server full", addr);
            return;
        }
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed for {}: {}", addr, e);
        }

        let (read_half, write_half) = stream.into_split();
        let (sender, outbound) = mpsc::unbounded_channel();
        Self::spawn_writer(write_half, outbound);

        let player_id = self.game.spawn_player();
        let Some(conn_id) = self.connections.add(Connection::new(player_id, sender)) else {
            self.game.remove_player(player_id);
            return;
        };
        let reader = self.spawn_reader(conn_id, read_half);
        self.connections.set_reader(conn_id, reader);
    }

    /// Spawns the task forwarding this connection's raw bytes to the main
    /// loop.
    fn spawn_reader(&self, conn_id: u64, mut read_half: OwnedReadHalf) -> JoinHandle<()> {
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match read_half.read(&mut buffer).await {
                    Ok(0) => {
                        let _ = server_tx.send(ServerMessage::Closed { conn_id });
                        break;
                    }
                    Ok(n) => {
                        let message = ServerMessage::Data {
                            conn_id,
                            bytes: buffer[..n].to_vec(),
                        };
                        if server_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("read error on connection {}: {}", conn_id, e);
                        let _ = server_tx.send(ServerMessage::Closed { conn_id });
                        break;
                    }
                }
            }
        })
    }

    /// Spawns the task draining this connection's outbound queue.
    fn spawn_writer(mut write_half: OwnedWriteHalf, mut outbound: mpsc::UnboundedReceiver<Vec<u8>>) {
        tokio::spawn(async move {
            while let Some(bytes) = outbound.recv().await {
                if let Err(e) = write_half.write_all(&bytes).await {
                    debug!("write failed, dropping writer: {}", e);
                    break;
                }
            }
        });
    }

    /// Appends received bytes to the connection's buffer and drains every
    /// complete controls message into the owning player's controls.
    fn handle_data(&mut self, conn_id: u64, bytes: &[u8]) {
        let mut fatal = false;
        {
            let Some(connection) = self.connections.get_mut(conn_id) else {
                return;
            };
            connection.recv_buffer.extend_from_slice(bytes);

            let Some(player) = self.game.player_mut(connection.player_id) else {
                return;
            };
            loop {
                match wire::recv_controls(&mut connection.recv_buffer, &mut player.controls) {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => {
                        error!("protocol violation on connection {}: {}", conn_id, e);
                        fatal = true;
                        break;
                    }
                }
            }
        }
        if fatal {
            self.drop_connection(conn_id);
        }
    }

    /// Tears down a connection and despawns its player.
    fn drop_connection(&mut self, conn_id: u64) {
        if let Some(connection) = self.connections.remove(conn_id) {
            self.game.remove_player(connection.player_id);
        }
    }

    /// Sends the full authoritative state to every connection, with each
    /// connection's own player first in the roster.
    fn broadcast_state(&self) {
        for (conn_id, connection) in self.connections.iter() {
            let mut frame = Vec::new();
            wire::encode_state(&self.game, Some(connection.player_id), &mut frame);
            if connection.sender.send(frame).is_err() {
                debug!("writer for connection {} is gone", conn_id);
            }
        }
    }
}
