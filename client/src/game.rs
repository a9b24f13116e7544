//! Local mirror of the authoritative server state.

use shared::game::{Player, StateSnapshot};

/// The client's view of the world: exactly the last snapshot the server
/// broadcast. Applying a new snapshot discards the previous one; there is
/// no incremental merge.
#[derive(Debug, Default)]
pub struct ClientWorld {
    state: Option<StateSnapshot>,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Installs a freshly decoded snapshot.
    pub fn apply(&mut self, snapshot: StateSnapshot) {
        self.state = Some(snapshot);
    }

    /// The last applied snapshot, if any has arrived yet.
    pub fn state(&self) -> Option<&StateSnapshot> {
        self.state.as_ref()
    }

    /// The player this client controls; the server puts it first in the
    /// roster it sends us.
    pub fn self_player(&self) -> Option<&Player> {
        self.state.as_ref().and_then(|s| s.players.first())
    }

    /// One `name: score` line per player, best first.
    pub fn scoreboard(&self) -> Vec<String> {
        let Some(state) = &self.state else {
            return Vec::new();
        };
        let mut players: Vec<&Player> = state.players.iter().collect();
        players.sort_by(|a, b| b.score().cmp(&a.score()));
        players
            .iter()
            .map(|p| format!("{}: {}", p.name, p.score()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::game::{Game, GameConfig};
    use shared::wire;

    fn snapshot_with_players() -> StateSnapshot {
        let mut game = Game::new(GameConfig {
            grid_seed: Some(5),
            puzzles: Vec::new(),
        });
        let a = game.spawn_player();
        let b = game.spawn_player();
        game.player_mut(a).unwrap().fill_correct = 1;
        game.player_mut(b).unwrap().x_correct = 3;

        let mut frame = Vec::new();
        wire::encode_state(&game, Some(b), &mut frame);
        wire::decode_state(&mut frame).unwrap().unwrap()
    }

    #[test]
    fn test_empty_world() {
        let world = ClientWorld::new();
        assert!(world.state().is_none());
        assert!(world.self_player().is_none());
        assert!(world.scoreboard().is_empty());
    }

    #[test]
    fn test_self_player_is_roster_head() {
        let mut world = ClientWorld::new();
        world.apply(snapshot_with_players());
        assert_eq!(world.self_player().unwrap().id, 2);
    }

    #[test]
    fn test_scoreboard_sorted_best_first() {
        let mut world = ClientWorld::new();
        world.apply(snapshot_with_players());
        let lines = world.scoreboard();
        assert_eq!(lines, vec!["Player 2: 3", "Player 1: 2"]);
    }

    #[test]
    fn test_apply_replaces_previous_snapshot() {
        let mut world = ClientWorld::new();
        world.apply(snapshot_with_players());

        let mut next = snapshot_with_players();
        next.players.truncate(1);
        next.global_cooldown = 2.0;
        world.apply(next);

        let state = world.state().unwrap();
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.global_cooldown, 2.0);
    }
}
