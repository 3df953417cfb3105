//! Wiring of the world and its systems behind the REPL.

use anyhow::{Context, Result};
use geomerge_core::{CellCoord, Command, Direction, Event, GameRules, GeoPosition};
use geomerge_rendering::{Hud, Scene, Viewport};
use geomerge_system_movement::{Config, FeedError, Movement, MovementError};
use geomerge_system_persistence::{decode_snapshot, encode_snapshot, Persistence, SnapshotStore};
use geomerge_world::{self as world, query, World};
use glam::DVec2;
use tracing::debug;

/// A running game: the world plus the systems reacting to it.
pub(crate) struct Session<S> {
    world: World,
    movement: Movement,
    persistence: Persistence<S>,
    clock: fn() -> u64,
}

impl<S: SnapshotStore> Session<S> {
    /// Builds a session for `rules`, resuming the game saved in `store` when one exists.
    pub(crate) fn start(rules: GameRules, store: S, clock: fn() -> u64) -> Result<Self> {
        let world = World::with_rules(rules).context("invalid game rules")?;
        let movement = Movement::new(
            query::movement_mode(&world),
            query::position(&world),
            Config::new(query::grid(&world).tile_degrees()),
        );
        let persistence = Persistence::new(store);

        let mut session = Self {
            world,
            movement,
            persistence,
            clock,
        };
        if let Some(snapshot) = session.persistence.load_session() {
            let _ = session.submit(Command::Restore { snapshot });
        }
        Ok(session)
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Applies a command and lets every system react to it.
    pub(crate) fn submit(&mut self, command: Command) -> Vec<Event> {
        self.pump(vec![command])
    }

    /// Steps `count` times, stopping at the first refused step.
    pub(crate) fn step(
        &mut self,
        direction: Direction,
        count: u32,
    ) -> Result<Vec<Event>, MovementError> {
        let mut events = Vec::new();
        for _ in 0..count {
            self.movement.step(direction)?;
            events.extend(self.pump(Vec::new()));
        }
        Ok(events)
    }

    /// Delivers a feed fix or failure. Returns the failure the feed recorded, if any.
    pub(crate) fn push_fix(
        &mut self,
        fix: Result<GeoPosition, FeedError>,
    ) -> Result<Option<FeedError>, MovementError> {
        self.movement.push_fix(fix)?;
        let _ = self.pump(Vec::new());
        Ok(self.movement.take_feed_error())
    }

    /// Describes the map around the player.
    pub(crate) fn scene(&self, radius: u32) -> Result<Scene> {
        let world = &self.world;
        let viewport = Viewport::new(query::grid(world), query::player_cell(world), radius)?;
        let hud = Hud {
            position: query::position(world),
            holding: query::holding(world),
            movement_mode: query::movement_mode(world),
            status: query::status(world).clone(),
            goal: query::goal_reached(world).then_some(query::rules(world).target_value),
        };
        Ok(Scene::new(viewport, query::cell_window(world, radius), hud))
    }

    /// Finds the cell drawn at `column` and `row` of a map with `radius`.
    pub(crate) fn cell_on_map(
        &self,
        radius: u32,
        column: u32,
        row: u32,
    ) -> Result<Option<CellCoord>> {
        let scene = self.scene(radius)?;
        let point = DVec2::new(f64::from(column) + 0.5, f64::from(row) + 0.5);
        Ok(scene.cell_at(scene.viewport.to_geo(point)))
    }

    /// Encodes the current session.
    pub(crate) fn export(&self) -> Result<String> {
        let snapshot = query::snapshot(&self.world, (self.clock)());
        encode_snapshot(&snapshot).context("failed to encode session")
    }

    /// Replaces the current session with an encoded one.
    pub(crate) fn import(&mut self, payload: &str) -> Result<Vec<Event>> {
        let snapshot = decode_snapshot(payload).context("not a geomerge session string")?;
        Ok(self.submit(Command::Restore { snapshot }))
    }

    fn pump(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }

        let mut log = Vec::new();
        loop {
            let mut commands = Vec::new();
            self.movement.handle(&events, &mut commands);

            let world = &self.world;
            let saved_at = (self.clock)();
            let outcome = self
                .persistence
                .handle(&events, || query::snapshot(world, saved_at));
            debug!(?outcome, events = events.len(), "systems handled events");

            log.append(&mut events);
            if commands.is_empty() {
                break;
            }
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }

        log
    }
}
