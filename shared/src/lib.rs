//! Protocol and simulation core shared by the game server and client:
//! wire codec, input aggregation, puzzle generation, and the authoritative
//! game state machine.

pub mod controls;
pub mod game;
pub mod puzzle;
pub mod vec;
pub mod wire;

pub use controls::{Button, Controls};
pub use game::{Game, GameConfig, Player, StateSnapshot};
pub use puzzle::{Clues, Puzzle};
pub use vec::{Vec2, Vec3};

/// Simulation rate: the server runs one update every `TICK` seconds and
/// broadcasts state after each one. Protocol constant; both endpoints pace
/// themselves by it.
pub const TICK: f32 = 1.0 / 10.0;

/// World-space size of one grid cell.
pub const CELL_SIZE: f32 = 0.1;

/// Radius used when clamping players into the arena.
pub const PLAYER_RADIUS: f32 = CELL_SIZE / 2.0;

/// Guess lockout after an incorrect guess, in seconds.
pub const WRONG_COOLDOWN: f32 = 4.0;

/// Pause between a solved grid and the start of the next round, in seconds.
pub const FINISHED_COOLDOWN: f32 = 3.0;
