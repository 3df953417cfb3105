#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Position sources that drive the player, and the system that switches between them.
//!
//! Both sources satisfy [`PositionSource`], so the world and the renderer never
//! learn which one is active. Position changes leave a source only as
//! [`Command::MovePlayer`] values collected by [`PositionSource::drain`].

use std::fmt;

use geomerge_core::{Command, Direction, Event, GeoPosition, MovementMode, DEFAULT_TILE_DEGREES};
use thiserror::Error;

/// Contract shared by every position source.
pub trait PositionSource: fmt::Debug {
    /// Mode implemented by the source.
    fn mode(&self) -> MovementMode;

    /// Latest known position.
    fn current(&self) -> GeoPosition;

    /// Moves every pending change notification into `out` as move commands.
    fn drain(&mut self, out: &mut Vec<Command>);

    /// Adopts a position decided elsewhere without emitting a notification.
    fn sync(&mut self, position: GeoPosition);
}

/// Source driven by discrete step commands.
#[derive(Clone, Debug, PartialEq)]
pub struct StepSource {
    position: GeoPosition,
    step_degrees: f64,
    pending: bool,
}

impl StepSource {
    /// Creates a step source at `position` moving `step_degrees` per step.
    #[must_use]
    pub const fn new(position: GeoPosition, step_degrees: f64) -> Self {
        Self {
            position,
            step_degrees,
            pending: false,
        }
    }

    /// Moves one increment in the provided direction.
    pub fn step(&mut self, direction: Direction) {
        let (d_lat, d_lng) = direction.unit_offset();
        self.position = self.position.offset(
            f64::from(d_lat) * self.step_degrees,
            f64::from(d_lng) * self.step_degrees,
        );
        self.pending = true;
    }
}

impl PositionSource for StepSource {
    fn mode(&self) -> MovementMode {
        MovementMode::Step
    }

    fn current(&self) -> GeoPosition {
        self.position
    }

    fn drain(&mut self, out: &mut Vec<Command>) {
        if self.pending {
            self.pending = false;
            out.push(Command::MovePlayer {
                position: self.position,
            });
        }
    }

    fn sync(&mut self, position: GeoPosition) {
        self.position = position;
        self.pending = false;
    }
}

/// Authorization state of an external location feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeedAuthorization {
    /// No fix or refusal has been observed yet.
    #[default]
    Pending,
    /// The feed delivered at least one fix.
    Granted,
    /// The user refused location access.
    Denied,
    /// The platform offers no location feed.
    Unsupported,
}

/// Failures reported by an external location feed.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The user refused location access.
    #[error("location permission was denied")]
    PermissionDenied,
    /// No fix arrived in time.
    #[error("timed out waiting for a location fix")]
    Timeout,
    /// A fix could not be determined.
    #[error("the current location is unavailable")]
    Unavailable,
    /// The platform offers no location feed.
    #[error("this device does not provide a location feed")]
    Unsupported,
}

/// Source driven by a continuous external location feed.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedSource {
    position: GeoPosition,
    authorization: FeedAuthorization,
    pending: Option<GeoPosition>,
    last_error: Option<FeedError>,
}

impl FeedSource {
    /// Creates a feed source that reports `position` until the first fix arrives.
    #[must_use]
    pub const fn new(position: GeoPosition) -> Self {
        Self {
            position,
            authorization: FeedAuthorization::Pending,
            pending: None,
            last_error: None,
        }
    }

    /// Authorization state observed so far.
    #[must_use]
    pub const fn authorization(&self) -> FeedAuthorization {
        self.authorization
    }

    /// Most recent failure that has not been taken yet.
    #[must_use]
    pub const fn last_error(&self) -> Option<FeedError> {
        self.last_error
    }

    /// Removes and returns the most recent failure.
    pub fn take_error(&mut self) -> Option<FeedError> {
        self.last_error.take()
    }

    /// Accepts a fix or a failure from the feed.
    ///
    /// Failures leave the position unchanged; they are recorded for the UI and
    /// never retried here.
    pub fn push_fix(&mut self, fix: Result<GeoPosition, FeedError>) {
        match fix {
            Ok(position) if position.is_on_globe() => {
                self.authorization = FeedAuthorization::Granted;
                self.position = position;
                self.pending = Some(position);
            }
            Ok(_) => self.last_error = Some(FeedError::Unavailable),
            Err(error) => {
                match error {
                    FeedError::PermissionDenied => self.authorization = FeedAuthorization::Denied,
                    FeedError::Unsupported => self.authorization = FeedAuthorization::Unsupported,
                    FeedError::Timeout | FeedError::Unavailable => {}
                }
                self.last_error = Some(error);
            }
        }
    }
}

impl PositionSource for FeedSource {
    fn mode(&self) -> MovementMode {
        MovementMode::Feed
    }

    fn current(&self) -> GeoPosition {
        self.position
    }

    fn drain(&mut self, out: &mut Vec<Command>) {
        if let Some(position) = self.pending.take() {
            out.push(Command::MovePlayer { position });
        }
    }

    fn sync(&mut self, position: GeoPosition) {
        self.position = position;
        self.pending = None;
    }
}

/// Tagged handle over the two position sources.
#[derive(Clone, Debug, PartialEq)]
pub enum ActiveSource {
    /// Step-driven source.
    Step(StepSource),
    /// Feed-driven source.
    Feed(FeedSource),
}

impl ActiveSource {
    /// Creates the source implementing `mode` at `position`.
    #[must_use]
    pub const fn for_mode(mode: MovementMode, position: GeoPosition, step_degrees: f64) -> Self {
        match mode {
            MovementMode::Step => Self::Step(StepSource::new(position, step_degrees)),
            MovementMode::Feed => Self::Feed(FeedSource::new(position)),
        }
    }

    fn as_source(&self) -> &dyn PositionSource {
        match self {
            Self::Step(source) => source,
            Self::Feed(source) => source,
        }
    }

    fn as_source_mut(&mut self) -> &mut dyn PositionSource {
        match self {
            Self::Step(source) => source,
            Self::Feed(source) => source,
        }
    }
}

impl PositionSource for ActiveSource {
    fn mode(&self) -> MovementMode {
        self.as_source().mode()
    }

    fn current(&self) -> GeoPosition {
        self.as_source().current()
    }

    fn drain(&mut self, out: &mut Vec<Command>) {
        self.as_source_mut().drain(out);
    }

    fn sync(&mut self, position: GeoPosition) {
        self.as_source_mut().sync(position);
    }
}

/// Errors raised when input does not match the active source.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MovementError {
    /// A step was requested while another source is active.
    #[error("stepping needs step movement (currently using {active} movement)")]
    StepRequiresStepMode {
        /// Mode that is active.
        active: MovementMode,
    },
    /// A location fix arrived while another source is active.
    #[error("location fixes need feed movement (currently using {active} movement)")]
    FixRequiresFeedMode {
        /// Mode that is active.
        active: MovementMode,
    },
}

/// Configuration parameters required to construct the movement system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    step_degrees: f64,
}

impl Config {
    /// Creates a configuration moving `step_degrees` per discrete step.
    #[must_use]
    pub const fn new(step_degrees: f64) -> Self {
        Self { step_degrees }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_DEGREES)
    }
}

/// System that owns the active position source and follows world events.
#[derive(Debug)]
pub struct Movement {
    source: ActiveSource,
    step_degrees: f64,
}

impl Movement {
    /// Creates the movement system with the source implementing `mode`.
    #[must_use]
    pub const fn new(mode: MovementMode, position: GeoPosition, config: Config) -> Self {
        Self {
            source: ActiveSource::for_mode(mode, position, config.step_degrees),
            step_degrees: config.step_degrees,
        }
    }

    /// Active position source.
    #[must_use]
    pub const fn source(&self) -> &ActiveSource {
        &self.source
    }

    /// Mode of the active source.
    #[must_use]
    pub fn mode(&self) -> MovementMode {
        self.source.mode()
    }

    /// Steps the player when the step source is active.
    pub fn step(&mut self, direction: Direction) -> Result<(), MovementError> {
        match &mut self.source {
            ActiveSource::Step(source) => {
                source.step(direction);
                Ok(())
            }
            ActiveSource::Feed(_) => Err(MovementError::StepRequiresStepMode {
                active: MovementMode::Feed,
            }),
        }
    }

    /// Forwards a feed fix or failure when the feed source is active.
    pub fn push_fix(&mut self, fix: Result<GeoPosition, FeedError>) -> Result<(), MovementError> {
        match &mut self.source {
            ActiveSource::Feed(source) => {
                source.push_fix(fix);
                Ok(())
            }
            ActiveSource::Step(_) => Err(MovementError::FixRequiresFeedMode {
                active: MovementMode::Step,
            }),
        }
    }

    /// Removes and returns the latest feed failure, if the feed source is active.
    pub fn take_feed_error(&mut self) -> Option<FeedError> {
        match &mut self.source {
            ActiveSource::Feed(source) => source.take_error(),
            ActiveSource::Step(_) => None,
        }
    }

    /// Consumes world events and emits move commands for pending source changes.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::MovementModeChanged { mode } => {
                    if *mode != self.source.mode() {
                        let position = self.source.current();
                        self.source = ActiveSource::for_mode(*mode, position, self.step_degrees);
                    }
                }
                Event::PlayerMoved { position, .. }
                | Event::GameReset { position }
                | Event::SessionRestored { position } => self.source.sync(*position),
                _ => {}
            }
        }

        self.source.drain(out);
    }
}
