//! Game client library.
//!
//! Connects to the authoritative server, sends one aggregated controls
//! frame per tick, and mirrors the state the server broadcasts back. The
//! mirror is replaced wholesale with every snapshot; the client never
//! simulates on its own. Input sources (keyboards, scripts) drive the
//! [`shared::Controls`] value through the session's driver callback.

pub mod game;
pub mod network;
