//! # Game Server Library
//!
//! Authoritative server for the multiplayer nonogram game. The server owns
//! the one true [`shared::Game`]; clients only ever send aggregated controls
//! and receive full state snapshots back.
//!
//! ## Architecture
//!
//! All game state is touched by a single logical loop. Per-connection reader
//! tasks forward raw bytes over an mpsc channel into that loop, which
//! appends them to the connection's private receive buffer and drains every
//! complete controls message into the owning player's aggregated controls.
//! Decoding never blocks: it either applies a whole message, reports that no
//! complete message is buffered yet, or fails fatally for that connection.
//!
//! A fixed-rate interval drives the simulation: each tick runs one
//! `Game::update` and then serializes the entire world once per connection,
//! with the receiving connection's own player first in the roster. Writer
//! tasks drain each connection's outbound queue so a slow client never
//! stalls the tick.
//!
//! ## Error policy
//!
//! A protocol violation (bad controls size, malformed state request) is
//! unrecoverable for the offending connection: it is torn down and its
//! player despawned. Disconnects are detected by the reader task and handled
//! the same way. There is no reconnection or resume.
//!
//! ## Module Organization
//!
//! - [`connection`] — per-connection state (receive buffer, outbound queue,
//!   player binding) and the capacity-limited connection manager.
//! - [`network`] — the TCP listener, reader/writer tasks, and the main
//!   select loop coordinating network events with the simulation tick.

pub mod connection;
pub mod network;
