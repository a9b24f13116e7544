//! Per-connection state and capacity management for the server.
//!
//! Each accepted socket gets a [`Connection`]: the player it controls, a
//! private receive buffer for stream reassembly, and the sender feeding its
//! writer task. The manager assigns connection ids and enforces the client
//! capacity limit.

use log::info;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Server-side state for one accepted client socket.
#[derive(Debug)]
pub struct Connection {
    /// Id of the player this connection controls.
    pub player_id: u32,
    /// Bytes received but not yet consumed by the wire codec. Whole messages
    /// are drained from the front; a partial trailing message stays until
    /// more bytes arrive.
    pub recv_buffer: Vec<u8>,
    /// Outbound frames for this connection's writer task.
    pub sender: mpsc::UnboundedSender<Vec<u8>>,
    /// Reader task handle, aborted on teardown.
    pub reader: Option<JoinHandle<()>>,
}

impl Connection {
    pub fn new(player_id: u32, sender: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            player_id,
            recv_buffer: Vec::new(),
            sender,
            reader: None,
        }
    }
}

/// Tracks live connections and enforces the capacity limit.
///
/// Connection ids start from 1 and increment for each accepted socket; they
/// are independent of player ids, which the game assigns.
pub struct ConnectionManager {
    connections: HashMap<u64, Connection>,
    next_conn_id: u64,
    max_clients: usize,
}

impl ConnectionManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_conn_id: 1,
            max_clients,
        }
    }

    /// Whether another client fits under the capacity limit.
    pub fn has_capacity(&self) -> bool {
        self.connections.len() < self.max_clients
    }

    /// Registers a connection and returns its id, or `None` when the server
    /// is full.
    pub fn add(&mut self, connection: Connection) -> Option<u64> {
        if !self.has_capacity() {
            return None;
        }
        let conn_id = self.next_conn_id;
        self.next_conn_id += 1;
        info!(
            "connection {} joined as player {}",
            conn_id, connection.player_id
        );
        self.connections.insert(conn_id, connection);
        Some(conn_id)
    }

    /// Attaches the reader task handle once it has been spawned.
    pub fn set_reader(&mut self, conn_id: u64, reader: JoinHandle<()>) {
        if let Some(connection) = self.connections.get_mut(&conn_id) {
            connection.reader = Some(reader);
        }
    }

    /// Removes a connection, aborting its reader task.
    pub fn remove(&mut self, conn_id: u64) -> Option<Connection> {
        let connection = self.connections.remove(&conn_id);
        if let Some(connection) = &connection {
            if let Some(reader) = &connection.reader {
                reader.abort();
            }
            info!(
                "connection {} (player {}) removed",
                conn_id, connection.player_id
            );
        }
        connection
    }

    pub fn get_mut(&mut self, conn_id: u64) -> Option<&mut Connection> {
        self.connections.get_mut(&conn_id)
    }

    /// Live connections, for broadcasting.
    pub fn iter(&self) -> impl Iterator<Item = (&u64, &Connection)> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_connection(player_id: u32) -> Connection {
        let (sender, _receiver) = mpsc::unbounded_channel();
        Connection::new(player_id, sender)
    }

    #[test]
    fn test_add_assigns_incrementing_ids() {
        let mut manager = ConnectionManager::new(4);
        let a = manager.add(test_connection(10)).unwrap();
        let b = manager.add(test_connection(11)).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_capacity_limit() {
        let mut manager = ConnectionManager::new(1);
        assert!(manager.has_capacity());
        assert!(manager.add(test_connection(1)).is_some());
        assert!(!manager.has_capacity());
        assert!(manager.add(test_connection(2)).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_frees_capacity() {
        let mut manager = ConnectionManager::new(1);
        let conn_id = manager.add(test_connection(1)).unwrap();

        let removed = manager.remove(conn_id).unwrap();
        assert_eq!(removed.player_id, 1);
        assert!(manager.is_empty());
        assert!(manager.has_capacity());

        assert!(manager.remove(conn_id).is_none());
    }

    #[test]
    fn test_get_mut_reaches_recv_buffer() {
        let mut manager = ConnectionManager::new(2);
        let conn_id = manager.add(test_connection(5)).unwrap();

        manager
            .get_mut(conn_id)
            .unwrap()
            .recv_buffer
            .extend_from_slice(&[1, 2, 3]);
        assert_eq!(manager.get_mut(conn_id).unwrap().recv_buffer.len(), 3);
        assert!(manager.get_mut(999).is_none());
    }
}
