#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for geomerge.
//!
//! The world owns the only mutable memory of the game: the sparse
//! [`CellStore`], the token held by the player, the player's position and the
//! sticky goal flag. Every mutation flows through [`apply`]; every read flows
//! through the [`query`] module so callers never bypass the override layer.

mod interaction;
mod store;

use geomerge_core::{
    CellCoord, CellOverride, Command, Event, GameRules, GeoPosition, InteractionError,
    MovementMode, RulesError, SessionSnapshot, StatusMessage, TileGrid, Token, WELCOME_BANNER,
};
use geomerge_system_spawning::SpawnOracle;

use interaction::Transition;
pub use store::CellStore;

/// Represents the authoritative geomerge session.
#[derive(Clone, Debug)]
pub struct World {
    banner: &'static str,
    rules: GameRules,
    grid: TileGrid,
    oracle: SpawnOracle,
    store: CellStore,
    holding: Option<Token>,
    position: GeoPosition,
    movement_mode: MovementMode,
    goal_reached: bool,
    status: StatusMessage,
}

impl World {
    /// Creates a fresh session using the default rules.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(GameRules::default(), TileGrid::default())
    }

    /// Creates a fresh session using the provided rules.
    pub fn with_rules(rules: GameRules) -> Result<Self, RulesError> {
        rules.validate()?;
        let grid = rules.grid()?;
        Ok(Self::from_parts(rules, grid))
    }

    fn from_parts(rules: GameRules, grid: TileGrid) -> Self {
        Self {
            banner: WELCOME_BANNER,
            oracle: SpawnOracle::from_rules(&rules),
            store: CellStore::new(),
            holding: None,
            position: rules.start,
            movement_mode: MovementMode::default(),
            goal_reached: false,
            status: StatusMessage::info(WELCOME_BANNER),
            grid,
            rules,
        }
    }

    fn player_cell(&self) -> CellCoord {
        self.grid.address_of(self.position)
    }

    fn effective_content(&self, cell: CellCoord) -> Option<Token> {
        self.store.effective_content(cell, &self.oracle)
    }

    fn interact(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        let distance = self.player_cell().chebyshev_distance(cell);
        let radius = self.rules.interaction_radius;
        if distance > radius {
            self.reject(
                cell,
                InteractionError::TooFar { distance, radius },
                out_events,
            );
            return;
        }

        let transition = match interaction::resolve(self.holding, self.effective_content(cell)) {
            Ok(transition) => transition,
            Err(reason) => {
                self.reject(cell, reason, out_events);
                return;
            }
        };

        let text = match transition {
            Transition::Collect(token) => {
                self.store.set(cell, CellOverride::Empty);
                self.holding = Some(token);
                out_events.push(Event::TokenCollected { cell, token });
                format!("Picked up a {token} from {cell}.")
            }
            Transition::Craft { consumed, produced } => {
                self.store.set(cell, CellOverride::Token(produced));
                self.holding = None;
                out_events.push(Event::TokensCrafted {
                    cell,
                    consumed,
                    produced,
                });
                format!("Merged two {consumed}s into a {produced} at {cell}.")
            }
            Transition::Place(token) => {
                self.store.set(cell, CellOverride::Token(token));
                self.holding = None;
                out_events.push(Event::TokenPlaced { cell, token });
                format!("Placed a {token} at {cell}.")
            }
        };

        if self.evaluate_goal(out_events) {
            self.status = StatusMessage::success(format!(
                "{text} You reached the goal of {}!",
                self.rules.target_value
            ));
        } else {
            self.status = StatusMessage::success(text);
        }
    }

    fn reject(&mut self, cell: CellCoord, reason: InteractionError, out_events: &mut Vec<Event>) {
        self.status = StatusMessage::rejected(format!("Cannot act on {cell}: {reason}."));
        out_events.push(Event::InteractionRejected { cell, reason });
    }

    /// Returns `true` when this call flipped the sticky goal flag.
    fn evaluate_goal(&mut self, out_events: &mut Vec<Event>) -> bool {
        if self.goal_reached {
            return false;
        }
        let Some(token) = self.holding else {
            return false;
        };
        if token.value() < self.rules.target_value {
            return false;
        }
        self.goal_reached = true;
        out_events.push(Event::GoalReached { token });
        true
    }

    fn move_player(&mut self, position: GeoPosition, out_events: &mut Vec<Event>) {
        if !position.is_finite() {
            self.status = StatusMessage::rejected("Ignored an invalid position update.");
            return;
        }

        let from = self.player_cell();
        self.position = position;
        let to = self.player_cell();
        if from != to {
            self.status = StatusMessage::info(format!("Now standing in cell {to}."));
        }
        out_events.push(Event::PlayerMoved { from, to, position });
    }

    fn set_movement_mode(&mut self, mode: MovementMode, out_events: &mut Vec<Event>) {
        if self.movement_mode == mode {
            self.status = StatusMessage::info(format!("Already using {mode} movement."));
            return;
        }
        self.movement_mode = mode;
        self.status = StatusMessage::info(format!("Switched to {mode} movement."));
        out_events.push(Event::MovementModeChanged { mode });
    }

    fn reset(&mut self, out_events: &mut Vec<Event>) {
        self.store.clear();
        self.holding = None;
        self.position = self.rules.start;
        self.goal_reached = false;
        self.status = StatusMessage::info("Started a new game.");
        out_events.push(Event::GameReset {
            position: self.position,
        });
    }

    fn restore(&mut self, snapshot: SessionSnapshot, out_events: &mut Vec<Event>) {
        if !snapshot.position.is_finite() {
            self.status = StatusMessage::rejected("Saved session had an invalid position.");
            return;
        }

        self.store = snapshot.overrides.into_iter().collect();
        self.holding = snapshot.holding;
        self.position = snapshot.position;
        self.goal_reached = snapshot.goal_reached;
        if self.movement_mode != snapshot.movement_mode {
            self.movement_mode = snapshot.movement_mode;
            out_events.push(Event::MovementModeChanged {
                mode: snapshot.movement_mode,
            });
        }
        out_events.push(Event::SessionRestored {
            position: self.position,
        });
        if self.evaluate_goal(out_events) {
            self.status = StatusMessage::success(format!(
                "Resumed the saved game. You reached the goal of {}!",
                self.rules.target_value
            ));
        } else {
            self.status = StatusMessage::info("Resumed the saved game.");
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Interact { cell } => world.interact(cell, out_events),
        Command::MovePlayer { position } => world.move_player(position, out_events),
        Command::SetMovementMode { mode } => world.set_movement_mode(mode, out_events),
        Command::NewGame => world.reset(out_events),
        Command::Restore { snapshot } => world.restore(snapshot, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use geomerge_core::{
        CellCoord, CellOverride, CellView, GameRules, GeoPosition, MovementMode, OverrideEntry,
        SessionSnapshot, StatusMessage, TileGrid, Token,
    };

    use super::World;

    /// Largest radius served by [`cell_window`].
    pub const MAX_WINDOW_RADIUS: u32 = 128;

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the session rules.
    #[must_use]
    pub fn rules(world: &World) -> &GameRules {
        &world.rules
    }

    /// Coordinate mapper used by the session.
    #[must_use]
    pub fn grid(world: &World) -> TileGrid {
        world.grid
    }

    /// Answer of the spawn oracle for the cell, ignoring overrides.
    #[must_use]
    pub fn spawn_of(world: &World, cell: CellCoord) -> Option<Token> {
        world.oracle.spawn_of(cell)
    }

    /// Recorded override for the cell, or `None` when the cell was never touched.
    #[must_use]
    pub fn cell_override(world: &World, cell: CellCoord) -> Option<CellOverride> {
        world.store.get(cell)
    }

    /// Authoritative content of a cell.
    #[must_use]
    pub fn effective_content(world: &World, cell: CellCoord) -> Option<Token> {
        world.effective_content(cell)
    }

    /// Number of cells the player has acted on.
    #[must_use]
    pub fn override_count(world: &World) -> usize {
        world.store.len()
    }

    /// Token held by the player.
    #[must_use]
    pub fn holding(world: &World) -> Option<Token> {
        world.holding
    }

    /// Current player position.
    #[must_use]
    pub fn position(world: &World) -> GeoPosition {
        world.position
    }

    /// Cell containing the player, derived from the current position.
    #[must_use]
    pub fn player_cell(world: &World) -> CellCoord {
        world.player_cell()
    }

    /// Reports whether the cell lies within the interaction radius of the player.
    #[must_use]
    pub fn is_within_reach(world: &World, cell: CellCoord) -> bool {
        world.player_cell().chebyshev_distance(cell) <= world.rules.interaction_radius
    }

    /// Active movement mode.
    #[must_use]
    pub fn movement_mode(world: &World) -> MovementMode {
        world.movement_mode
    }

    /// Reports whether the goal was reached during the session.
    #[must_use]
    pub fn goal_reached(world: &World) -> bool {
        world.goal_reached
    }

    /// Latest human-readable status.
    #[must_use]
    pub fn status(world: &World) -> &StatusMessage {
        &world.status
    }

    /// Describes a single cell for presentation.
    #[must_use]
    pub fn cell_view(world: &World, cell: CellCoord) -> CellView {
        CellView {
            cell,
            bounds: world.grid.bounds_of(cell),
            content: world.effective_content(cell),
            overridden: world.store.get(cell).is_some(),
            interactable: is_within_reach(world, cell),
        }
    }

    /// Describes every cell within `radius` of the player, row by row from the north.
    ///
    /// Never records anything; rendering a window leaves the store untouched.
    /// The radius is capped at [`MAX_WINDOW_RADIUS`].
    #[must_use]
    pub fn cell_window(world: &World, radius: u32) -> Vec<CellView> {
        let radius = i32::try_from(radius.min(MAX_WINDOW_RADIUS)).unwrap_or(0);
        let center = world.player_cell();
        let mut views = Vec::new();
        for di in (-radius..=radius).rev() {
            for dj in -radius..=radius {
                views.push(cell_view(world, center.offset(di, dj)));
            }
        }
        views
    }

    /// Captures the session for persistence.
    #[must_use]
    pub fn snapshot(world: &World, saved_at: u64) -> SessionSnapshot {
        SessionSnapshot {
            holding: world.holding,
            position: world.position,
            overrides: world.store.iter().collect::<Vec<OverrideEntry>>(),
            movement_mode: world.movement_mode,
            saved_at,
            goal_reached: world.goal_reached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomerge_core::MessageClass;

    fn rules_with_probability(spawn_probability: f64) -> GameRules {
        GameRules {
            spawn_probability,
            ..GameRules::default()
        }
    }

    #[test]
    fn fresh_world_starts_at_configured_position() {
        let world = World::new();
        assert_eq!(query::position(&world), GameRules::default().start);
        assert_eq!(query::holding(&world), None);
        assert_eq!(query::override_count(&world), 0);
        assert!(!query::goal_reached(&world));
    }

    #[test]
    fn with_rules_rejects_invalid_rules() {
        let rules = GameRules {
            tile_degrees: 0.0,
            ..GameRules::default()
        };
        assert!(World::with_rules(rules).is_err());
    }

    #[test]
    fn rejection_updates_status() {
        let mut world = World::with_rules(rules_with_probability(0.0)).expect("valid rules");
        let cell = query::player_cell(&world);
        let mut events = Vec::new();

        apply(&mut world, Command::Interact { cell }, &mut events);

        assert_eq!(
            events,
            vec![Event::InteractionRejected {
                cell,
                reason: InteractionError::NothingToDo,
            }]
        );
        assert_eq!(query::status(&world).class(), MessageClass::Rejected);
        assert_eq!(query::override_count(&world), 0);
    }

    #[test]
    fn non_finite_position_is_ignored() {
        let mut world = World::new();
        let before = query::position(&world);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::MovePlayer {
                position: GeoPosition::new(f64::NAN, 0.0),
            },
            &mut events,
        );

        assert!(events.is_empty());
        assert_eq!(query::position(&world), before);
        assert_eq!(query::status(&world).class(), MessageClass::Rejected);
    }

    #[test]
    fn setting_the_active_mode_again_emits_nothing() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetMovementMode {
                mode: MovementMode::Step,
            },
            &mut events,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn cell_window_is_centred_on_player() {
        let world = World::new();
        let views = query::cell_window(&world, 2);
        assert_eq!(views.len(), 25);
        let center = query::player_cell(&world);
        assert_eq!(views[12].cell, center);
        assert_eq!(views[0].cell, center.offset(2, -2));
    }
}
