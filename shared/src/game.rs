//! Authoritative game state and the tick-driven transition function.
//!
//! The server owns one `Game` and advances it once per tick; clients only
//! ever see the `StateSnapshot` portion that the wire codec carries. All
//! round state (grid dimensions, arena bounds, pause flag, cooldowns) lives
//! on the instance, so separate games never share anything and tests can run
//! fully deterministic instances from a seeded config.

use crate::controls::Controls;
use crate::puzzle::{self, Clues, Puzzle};
use crate::vec::{Vec2, Vec3};
use crate::{CELL_SIZE, FINISHED_COOLDOWN, PLAYER_RADIUS, WRONG_COOLDOWN};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Seed for the cosmetic color sequence. Fixed, so every server hands out
/// the same palette order.
const COLOR_SEED: u64 = 0x15466789;

/// One player's authoritative state.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Latest aggregated inputs. Fed by decoded controls messages on the
    /// server; never serialized back out.
    pub controls: Controls,

    /// Continuous arena position.
    pub position: Vec2,
    /// Discrete cell the player is on: `(col, row)`, row 0 at the top.
    pub grid_pos: (u32, u32),
    /// True = guesses mark cells filled, false = guesses mark them empty.
    pub fill_mode: bool,

    pub id: u32,
    pub color: Vec3,
    pub name: String,

    pub fill_correct: u32,
    pub fill_incorrect: u32,
    pub x_correct: u32,
    pub x_incorrect: u32,

    /// Seconds until this player may guess again.
    pub player_cooldown: f32,
}

impl Player {
    /// Correct fills are worth double a correct empty mark.
    pub fn score(&self) -> u32 {
        2 * self.fill_correct + self.x_correct
    }
}

/// The solution and the players' progress over it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    /// Filled cells of the current puzzle; never sent to clients.
    pub solution: Vec<Vec<bool>>,
    /// 0 = unmarked, `+id` = correctly filled by player `id`, `-id` =
    /// correctly marked empty by player `id`.
    pub progress: Vec<Vec<i32>>,
}

/// Construction-time knobs for one simulation instance.
pub struct GameConfig {
    /// Seed for grid generation; `None` seeds from entropy.
    pub grid_seed: Option<u64>,
    /// Pre-authored puzzles eligible for the file-based branch. An empty
    /// set forces random generation.
    pub puzzles: Vec<Puzzle>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_seed: None,
            puzzles: puzzle::builtin_puzzles(),
        }
    }
}

/// Everything a client mirrors: one fully decoded state message.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    /// Roster with the receiving connection's own player first.
    pub players: Vec<Player>,
    /// Durable id -> color association; survives player removal so resolved
    /// cells stay attributable.
    pub colormap: HashMap<u32, Vec3>,
    pub width: u32,
    pub height: u32,
    pub arena_min: Vec2,
    pub arena_max: Vec2,
    pub clues: Clues,
    pub progress: Vec<Vec<i32>>,
    pub global_cooldown: f32,
}

/// Authoritative game state.
pub struct Game {
    pub players: Vec<Player>,
    pub colormap: HashMap<u32, Vec3>,

    /// Current grid dimensions, in cells.
    pub width: u32,
    pub height: u32,
    /// Arena bounds in world space, recomputed with each new grid.
    pub arena_min: Vec2,
    pub arena_max: Vec2,

    pub clues: Clues,
    pub grid: Grid,

    /// Seconds left on the between-rounds countdown while paused.
    pub global_cooldown: f32,
    /// True between a solved grid and the start of the next round.
    pub paused: bool,

    next_player_id: u32,
    color_rng: StdRng,
    grid_rng: StdRng,
    puzzles: Vec<Puzzle>,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        let grid_rng = match config.grid_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut game = Game {
            players: Vec::new(),
            colormap: HashMap::new(),
            width: 0,
            height: 0,
            arena_min: Vec2::default(),
            arena_max: Vec2::default(),
            clues: Clues::default(),
            grid: Grid::default(),
            global_cooldown: 0.0,
            paused: false,
            next_player_id: 1,
            color_rng: StdRng::seed_from_u64(COLOR_SEED),
            grid_rng,
            puzzles: config.puzzles,
        };
        game.reset_round();
        game
    }

    /// Adds a player at the start cell and returns its id. Ids are monotonic
    /// and never reused within a session.
    pub fn spawn_player(&mut self) -> u32 {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let mut color = Vec3::default();
        while color == Vec3::default() {
            color = Vec3::new(
                self.color_rng.gen::<f32>(),
                self.color_rng.gen::<f32>(),
                self.color_rng.gen::<f32>(),
            );
        }
        let color = color.normalize();

        let name = format!("Player {}", id);
        info!("spawned {}", name);

        self.colormap.insert(id, color);
        self.players.push(Player {
            controls: Controls::default(),
            position: self.start_cell_position(),
            grid_pos: (0, 0),
            fill_mode: true,
            id,
            color,
            name,
            fill_correct: 0,
            fill_incorrect: 0,
            x_correct: 0,
            x_incorrect: 0,
            player_cooldown: 0.0,
        });
        id
    }

    /// Removes a player. The colormap keeps the id so cells the player
    /// resolved stay attributable.
    pub fn remove_player(&mut self, id: u32) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        let removed = self.players.len() != before;
        if removed {
            info!("removed player {}", id);
        }
        removed
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: u32) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Advances the simulation by `elapsed` seconds.
    pub fn update(&mut self, elapsed: f32) {
        if self.paused {
            self.global_cooldown -= elapsed;
            if self.global_cooldown <= 0.0 {
                self.reset_round();
            } else {
                return;
            }
        }

        let (width, height) = (self.width, self.height);
        for p in &mut self.players {
            if p.player_cooldown > 0.0 {
                p.player_cooldown -= elapsed;
            }

            if p.controls.left.pressed && p.grid_pos.0 > 0 {
                p.position.x -= CELL_SIZE;
                p.grid_pos.0 -= 1;
            }
            if p.controls.right.pressed && p.grid_pos.0 + 1 < width {
                p.position.x += CELL_SIZE;
                p.grid_pos.0 += 1;
            }
            // row 0 is the top of the board, so moving up decreases the row
            // index while increasing world y
            if p.controls.up.pressed && p.grid_pos.1 > 0 {
                p.position.y += CELL_SIZE;
                p.grid_pos.1 -= 1;
            }
            if p.controls.down.pressed && p.grid_pos.1 + 1 < height {
                p.position.y -= CELL_SIZE;
                p.grid_pos.1 += 1;
            }

            if p.controls.shift.pressed {
                p.fill_mode = !p.fill_mode;
            }

            if p.controls.confirm.pressed && p.player_cooldown <= 0.0 {
                let (x, y) = (p.grid_pos.0 as usize, p.grid_pos.1 as usize);
                if self.grid.progress[y][x] == 0 {
                    match (p.fill_mode, self.grid.solution[y][x]) {
                        (true, true) => {
                            p.fill_correct += 1;
                            self.grid.progress[y][x] = p.id as i32;
                        }
                        (true, false) => {
                            p.fill_incorrect += 1;
                            p.player_cooldown = WRONG_COOLDOWN;
                        }
                        (false, true) => {
                            p.x_incorrect += 1;
                            p.player_cooldown = WRONG_COOLDOWN;
                        }
                        (false, false) => {
                            p.x_correct += 1;
                            self.grid.progress[y][x] = -(p.id as i32);
                        }
                    }
                }
            }

            // edge counts consumed for this tick
            p.controls.clear_downs();
        }

        // safety net; discrete movement is already bounds-checked above
        for p in &mut self.players {
            p.position.x = p
                .position
                .x
                .clamp(self.arena_min.x + PLAYER_RADIUS, self.arena_max.x - PLAYER_RADIUS);
            p.position.y = p
                .position
                .y
                .clamp(self.arena_min.y + PLAYER_RADIUS, self.arena_max.y - PLAYER_RADIUS);
        }

        if self.grid_completed() {
            self.paused = true;
            self.global_cooldown = FINISHED_COOLDOWN;
            self.clear_empty_marks();
            self.park_players_offscreen();
            debug!("grid completed; next round in {} seconds", FINISHED_COOLDOWN);
        }
    }

    /// A grid is complete when every filled cell has been correctly filled.
    /// Empty cells may be unmarked or marked empty; both satisfy it.
    pub fn grid_completed(&self) -> bool {
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                if self.grid.solution[y][x] != (self.grid.progress[y][x] > 0) {
                    return false;
                }
            }
        }
        true
    }

    /// Clears the board, generates the next grid, and puts everyone back at
    /// the start cell.
    fn reset_round(&mut self) {
        self.grid = Grid::default();
        let file_based = !self.puzzles.is_empty() && self.grid_rng.gen_range(0..5) < 2;
        if file_based {
            self.generate_puzzle_grid();
        } else {
            self.generate_random_grid();
        }

        self.arena_min =
            Vec2::new(-(self.width as f32) / 2.0, -(self.height as f32) / 2.0).scale(CELL_SIZE);
        self.arena_max =
            Vec2::new(self.width as f32 / 2.0, self.height as f32 / 2.0).scale(CELL_SIZE);
        self.reset_positions();
        self.paused = false;
        debug!("new {}x{} grid", self.width, self.height);
    }

    fn generate_random_grid(&mut self) {
        self.width = self.grid_rng.gen_range(5..=7);
        self.height = self.grid_rng.gen_range(5..=7);
        let solution = puzzle::random_solution(&mut self.grid_rng, self.width, self.height);
        self.install_solution(solution);
    }

    fn generate_puzzle_grid(&mut self) {
        let pick = self.grid_rng.gen_range(0..self.puzzles.len());
        let puzzle = self.puzzles[pick].clone();
        self.width = puzzle.width;
        self.height = puzzle.height;
        self.install_solution(puzzle.cells);
    }

    fn install_solution(&mut self, solution: Vec<Vec<bool>>) {
        self.grid.progress = vec![vec![0; self.width as usize]; self.height as usize];
        self.clues = Clues::derive(self.width, self.height, &solution);
        self.grid.solution = solution;
    }

    /// World position of the top-left cell, where rounds start.
    fn start_cell_position(&self) -> Vec2 {
        Vec2::new(
            self.arena_min.x + CELL_SIZE / 2.0,
            self.arena_max.y - CELL_SIZE / 2.0,
        )
    }

    fn reset_positions(&mut self) {
        let start = self.start_cell_position();
        for player in &mut self.players {
            player.position = start;
            player.grid_pos = (0, 0);
        }
    }

    /// Drops empty marks back to unmarked between rounds; fills stay.
    fn clear_empty_marks(&mut self) {
        for row in &mut self.grid.progress {
            for cell in row {
                *cell = (*cell).max(0);
            }
        }
    }

    /// Far outside the arena until the next round brings everyone back.
    fn park_players_offscreen(&mut self) {
        let parked = self.arena_max.scale(10.0);
        for player in &mut self.players {
            player.position = parked;
            player.grid_pos = (0, 0);
        }
    }
}
