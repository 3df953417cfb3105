#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the geomerge engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. The coordinate mapper ([`TileGrid`]) lives here
//! as well because every crate agrees on how positions become cell addresses.

use std::{error::Error, fmt};

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str =
    "Welcome to geomerge. Collect tokens, merge equal pairs, reach the goal.";

/// Side length of a square cell measured in degrees.
pub const DEFAULT_TILE_DEGREES: f64 = 1e-4;

/// Maximum Chebyshev distance, in cells, at which the player may interact.
pub const DEFAULT_INTERACTION_RADIUS: u32 = 3;

/// Probability that an untouched cell spawns a base token.
pub const DEFAULT_SPAWN_PROBABILITY: f64 = 0.1;

/// Token value the player must hold to reach the goal.
pub const DEFAULT_TARGET_VALUE: u64 = 16;

/// Seed mixed into every spawn hash.
pub const DEFAULT_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Position the player occupies in a fresh session.
pub const DEFAULT_START: GeoPosition =
    GeoPosition::new(36.989_493_795_784_01, -122.062_771_285_485_04);

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests that the player act on the provided cell.
    Interact {
        /// Cell the player clicked.
        cell: CellCoord,
    },
    /// Replaces the player's position wholesale.
    MovePlayer {
        /// New geographic position reported by the active position source.
        position: GeoPosition,
    },
    /// Selects which position source drives the player.
    SetMovementMode {
        /// Mode the session should use from now on.
        mode: MovementMode,
    },
    /// Discards every override, the holding and the position.
    NewGame,
    /// Replaces the session state with a previously captured snapshot.
    Restore {
        /// Snapshot to restore.
        snapshot: SessionSnapshot,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The player picked up the token stored in a cell.
    TokenCollected {
        /// Cell the token was taken from.
        cell: CellCoord,
        /// Token now held by the player.
        token: Token,
    },
    /// The held token merged with an equal token in a cell.
    TokensCrafted {
        /// Cell that now stores the merged token.
        cell: CellCoord,
        /// Value that was held and consumed.
        consumed: Token,
        /// Doubled token written into the cell.
        produced: Token,
    },
    /// The held token was dropped into an empty cell.
    TokenPlaced {
        /// Cell that received the token.
        cell: CellCoord,
        /// Token written into the cell.
        token: Token,
    },
    /// An interaction was refused without changing state.
    InteractionRejected {
        /// Cell the player clicked.
        cell: CellCoord,
        /// Why the interaction was refused.
        reason: InteractionError,
    },
    /// The player holds a token at or above the target value for the first time.
    GoalReached {
        /// Token that satisfied the goal.
        token: Token,
    },
    /// The player's position was replaced.
    PlayerMoved {
        /// Cell occupied before the move.
        from: CellCoord,
        /// Cell occupied after the move.
        to: CellCoord,
        /// Exact position after the move.
        position: GeoPosition,
    },
    /// The active movement mode changed.
    MovementModeChanged {
        /// Mode that became active.
        mode: MovementMode,
    },
    /// The session was reset to a fresh state.
    GameReset {
        /// Start position the player returned to.
        position: GeoPosition,
    },
    /// The session was replaced by a snapshot.
    SessionRestored {
        /// Position recorded by the snapshot.
        position: GeoPosition,
    },
}

impl Event {
    /// Reports whether the event reflects a change that should be persisted.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, Self::InteractionRejected { .. })
    }
}

/// Geographic position expressed in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    lat: f64,
    lng: f64,
}

impl GeoPosition {
    /// Creates a new position from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Reports whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Reports whether the position is a real coordinate: latitude within
    /// `[-90, 90]` and longitude within `[-180, 180]`.
    #[must_use]
    pub fn is_on_globe(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Returns the position shifted by the provided deltas.
    #[must_use]
    pub fn offset(self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(self.lat + d_lat, self.lng + d_lng)
    }
}

impl fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Half-open rectangle `[south, north) × [west, east)` in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    south_west: GeoPosition,
    north_east: GeoPosition,
}

impl GeoBounds {
    /// Creates bounds from the south-west and north-east corners.
    #[must_use]
    pub const fn new(south_west: GeoPosition, north_east: GeoPosition) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Inclusive south-west corner.
    #[must_use]
    pub const fn south_west(&self) -> GeoPosition {
        self.south_west
    }

    /// Exclusive north-east corner.
    #[must_use]
    pub const fn north_east(&self) -> GeoPosition {
        self.north_east
    }

    /// Reports whether the position lies inside the half-open region.
    #[must_use]
    pub fn contains(&self, position: GeoPosition) -> bool {
        position.lat() >= self.south_west.lat()
            && position.lat() < self.north_east.lat()
            && position.lng() >= self.south_west.lng()
            && position.lng() < self.north_east.lng()
    }

    /// Midpoint of the region.
    #[must_use]
    pub fn center(&self) -> GeoPosition {
        GeoPosition::new(
            (self.south_west.lat() + self.north_east.lat()) / 2.0,
            (self.south_west.lng() + self.north_east.lng()) / 2.0,
        )
    }
}

/// Address of a single grid cell measured from the global origin.
///
/// `i` counts tiles along latitude and `j` along longitude. Both are signed so
/// the grid covers the southern and western hemispheres.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    i: i32,
    j: i32,
}

impl CellCoord {
    /// Creates a new cell address.
    #[must_use]
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Tile index along the latitude axis.
    #[must_use]
    pub const fn i(&self) -> i32 {
        self.i
    }

    /// Tile index along the longitude axis.
    #[must_use]
    pub const fn j(&self) -> i32 {
        self.j
    }

    /// Computes the Chebyshev distance between two cell addresses.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.i.abs_diff(other.i).max(self.j.abs_diff(other.j))
    }

    /// Returns the address shifted by the provided offsets, saturating at the grid edge.
    #[must_use]
    pub const fn offset(self, di: i32, dj: i32) -> Self {
        Self::new(self.i.saturating_add(di), self.j.saturating_add(dj))
    }

    /// Stable textual key used when hashing the address.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{},{}", self.i, self.j)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// Converts geographic positions into cell addresses and back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileGrid {
    tile_degrees: f64,
}

impl TileGrid {
    /// Creates a grid whose square cells span `tile_degrees` on each axis.
    pub fn new(tile_degrees: f64) -> Result<Self, RulesError> {
        if !tile_degrees.is_finite() || tile_degrees <= 0.0 {
            return Err(RulesError::InvalidTileSize { tile_degrees });
        }
        Ok(Self { tile_degrees })
    }

    /// Side length of a single cell in degrees.
    #[must_use]
    pub const fn tile_degrees(&self) -> f64 {
        self.tile_degrees
    }

    /// Returns the address of the cell containing the position.
    ///
    /// The result agrees with [`TileGrid::bounds_of`] whenever both indices fit
    /// in `i32`, which holds for every position on the globe at any tile size
    /// of at least `1e-7` degrees. Indices beyond that range saturate.
    #[must_use]
    pub fn address_of(&self, position: GeoPosition) -> CellCoord {
        CellCoord::new(
            axis_index(position.lat(), self.tile_degrees),
            axis_index(position.lng(), self.tile_degrees),
        )
    }

    /// Returns the half-open region covered by the cell.
    #[must_use]
    pub fn bounds_of(&self, cell: CellCoord) -> GeoBounds {
        GeoBounds::new(
            GeoPosition::new(
                lower_edge(cell.i(), self.tile_degrees),
                lower_edge(cell.j(), self.tile_degrees),
            ),
            GeoPosition::new(
                upper_edge(cell.i(), self.tile_degrees),
                upper_edge(cell.j(), self.tile_degrees),
            ),
        )
    }

    /// Returns the midpoint of the cell.
    #[must_use]
    pub fn center_of(&self, cell: CellCoord) -> GeoPosition {
        self.bounds_of(cell).center()
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            tile_degrees: DEFAULT_TILE_DEGREES,
        }
    }
}

fn lower_edge(index: i32, tile: f64) -> f64 {
    f64::from(index) * tile
}

fn upper_edge(index: i32, tile: f64) -> f64 {
    (f64::from(index) + 1.0) * tile
}

fn axis_index(value: f64, tile: f64) -> i32 {
    let index = (value / tile).floor() as i32;
    if lower_edge(index, tile) > value {
        index.saturating_sub(1)
    } else if upper_edge(index, tile) <= value {
        index.saturating_add(1)
    } else {
        index
    }
}

/// Numeric token carried by the player or stored in a cell.
///
/// Values are always powers of two starting at [`Token::BASE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Token(u64);

impl Token {
    /// Smallest token, spawned by the world.
    pub const BASE: Token = Token(1);

    /// Creates a token when `value` is a power of two.
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        if value.is_power_of_two() {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Numeric value of the token.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Token produced by merging two tokens of this value, if representable.
    #[must_use]
    pub const fn doubled(self) -> Option<Self> {
        match self.0.checked_mul(2) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Token> for u64 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl TryFrom<u64> for Token {
    type Error = InvalidToken;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidToken { value })
    }
}

/// Raised when a token value is not a power of two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidToken {
    value: u64,
}

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token value {} is not a power of two", self.value)
    }
}

impl Error for InvalidToken {}

/// Content recorded for a cell the player has acted on.
///
/// `Empty` is distinct from "never recorded": an emptied cell must not fall
/// back to the spawn oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellOverride {
    /// The cell was explicitly emptied.
    Empty,
    /// The cell stores the provided token.
    Token(Token),
}

impl CellOverride {
    /// Token stored by the override, if any.
    #[must_use]
    pub const fn content(&self) -> Option<Token> {
        match self {
            Self::Empty => None,
            Self::Token(token) => Some(*token),
        }
    }
}

impl From<Option<Token>> for CellOverride {
    fn from(content: Option<Token>) -> Self {
        match content {
            Some(token) => Self::Token(token),
            None => Self::Empty,
        }
    }
}

/// Selects which position source drives the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// Discrete step commands move the player one increment at a time.
    #[default]
    Step,
    /// A continuous external location feed moves the player.
    Feed,
}

impl MovementMode {
    /// Lower-case name of the mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Feed => "feed",
        }
    }

    /// Parses the lower-case name of a mode.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "step" => Some(Self::Step),
            "feed" => Some(Self::Feed),
            _ => None,
        }
    }
}

impl fmt::Display for MovementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cardinal step directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward increasing latitude.
    North,
    /// Toward increasing longitude.
    East,
    /// Toward decreasing latitude.
    South,
    /// Toward decreasing longitude.
    West,
}

impl Direction {
    /// Unit offset `(di, dj)` of a single step in this direction.
    #[must_use]
    pub const fn unit_offset(self) -> (i32, i32) {
        match self {
            Self::North => (1, 0),
            Self::East => (0, 1),
            Self::South => (-1, 0),
            Self::West => (0, -1),
        }
    }
}

/// Reasons an interaction is refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionError {
    /// The cell lies outside the interaction radius on at least one axis.
    TooFar {
        /// Chebyshev distance between the player and the cell.
        distance: u32,
        /// Configured interaction radius.
        radius: u32,
    },
    /// The held token does not match the token in the cell.
    Mismatch {
        /// Token held by the player.
        held: Token,
        /// Token stored in the cell.
        found: Token,
    },
    /// Neither the player nor the cell holds a token.
    NothingToDo,
    /// Merging would exceed the largest representable token.
    ValueOverflow {
        /// Token held by the player.
        held: Token,
    },
}

impl fmt::Display for InteractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFar { distance, radius } => write!(
                f,
                "that cell is too far away ({distance} cells, reach is {radius})"
            ),
            Self::Mismatch { held, found } => {
                write!(f, "cannot merge a {held} with a {found}")
            }
            Self::NothingToDo => write!(f, "nothing to pick up and nothing to place"),
            Self::ValueOverflow { held } => {
                write!(f, "a {held} cannot be merged any further")
            }
        }
    }
}

/// Classification of a status message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageClass {
    /// An action changed state.
    Success,
    /// An action was refused.
    Rejected,
    /// Informational update.
    Info,
}

/// Human-readable status surfaced after every command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    class: MessageClass,
    text: String,
}

impl StatusMessage {
    /// Creates a status message.
    #[must_use]
    pub fn new(class: MessageClass, text: impl Into<String>) -> Self {
        Self {
            class,
            text: text.into(),
        }
    }

    /// Creates a success message.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(MessageClass::Success, text)
    }

    /// Creates a rejection message.
    #[must_use]
    pub fn rejected(text: impl Into<String>) -> Self {
        Self::new(MessageClass::Rejected, text)
    }

    /// Creates an informational message.
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(MessageClass::Info, text)
    }

    /// Classification of the message.
    #[must_use]
    pub const fn class(&self) -> MessageClass {
        self.class
    }

    /// Message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Tunable rules of a session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameRules {
    /// Side length of a cell in degrees.
    pub tile_degrees: f64,
    /// Maximum Chebyshev distance, in cells, for interactions.
    pub interaction_radius: u32,
    /// Probability in `[0, 1]` that an untouched cell holds a base token.
    pub spawn_probability: f64,
    /// Token value that satisfies the goal.
    pub target_value: u64,
    /// Seed mixed into the spawn hash.
    pub seed: u64,
    /// Position of the player in a fresh session.
    pub start: GeoPosition,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            tile_degrees: DEFAULT_TILE_DEGREES,
            interaction_radius: DEFAULT_INTERACTION_RADIUS,
            spawn_probability: DEFAULT_SPAWN_PROBABILITY,
            target_value: DEFAULT_TARGET_VALUE,
            seed: DEFAULT_SEED,
            start: DEFAULT_START,
        }
    }
}

impl GameRules {
    /// Checks that every rule holds a usable value.
    pub fn validate(&self) -> Result<(), RulesError> {
        let _ = self.grid()?;
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(RulesError::InvalidSpawnProbability {
                probability: self.spawn_probability,
            });
        }
        if self.target_value == 0 {
            return Err(RulesError::InvalidTargetValue {
                target_value: self.target_value,
            });
        }
        if !self.start.is_finite() {
            return Err(RulesError::InvalidStart { start: self.start });
        }
        Ok(())
    }

    /// Builds the coordinate mapper described by the rules.
    pub fn grid(&self) -> Result<TileGrid, RulesError> {
        TileGrid::new(self.tile_degrees)
    }
}

/// Errors reported when validating [`GameRules`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RulesError {
    /// Tile size must be positive and finite.
    InvalidTileSize {
        /// Rejected tile size.
        tile_degrees: f64,
    },
    /// Spawn probability must lie within `[0, 1]`.
    InvalidSpawnProbability {
        /// Rejected probability.
        probability: f64,
    },
    /// Target value must be positive.
    InvalidTargetValue {
        /// Rejected target.
        target_value: u64,
    },
    /// Start position must be finite.
    InvalidStart {
        /// Rejected start position.
        start: GeoPosition,
    },
}

impl fmt::Display for RulesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTileSize { tile_degrees } => {
                write!(f, "tile size must be positive (received {tile_degrees})")
            }
            Self::InvalidSpawnProbability { probability } => write!(
                f,
                "spawn probability must lie within 0..=1 (received {probability})"
            ),
            Self::InvalidTargetValue { target_value } => {
                write!(f, "target value must be positive (received {target_value})")
            }
            Self::InvalidStart { start } => {
                write!(f, "start position must be finite (received {start})")
            }
        }
    }
}

impl Error for RulesError {}

/// Immutable description of a cell used by renderers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellView {
    /// Address of the cell.
    pub cell: CellCoord,
    /// Region covered by the cell.
    pub bounds: GeoBounds,
    /// Effective content of the cell.
    pub content: Option<Token>,
    /// Indicates whether the content comes from a recorded override.
    pub overridden: bool,
    /// Indicates whether the player may interact with the cell.
    pub interactable: bool,
}

/// Single recorded override captured by a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverrideEntry {
    /// Address of the overridden cell.
    pub cell: CellCoord,
    /// Recorded content.
    pub value: CellOverride,
}

/// Serializable state of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Token held by the player.
    pub holding: Option<Token>,
    /// Player position.
    pub position: GeoPosition,
    /// Every recorded override ordered by address.
    pub overrides: Vec<OverrideEntry>,
    /// Active movement mode.
    pub movement_mode: MovementMode,
    /// Seconds since the Unix epoch at which the snapshot was taken.
    pub saved_at: u64,
    /// Indicates whether the goal was reached during the session.
    #[serde(default)]
    pub goal_reached: bool,
}

impl SessionSnapshot {
    /// Snapshot of a freshly initialised session.
    #[must_use]
    pub fn fresh(start: GeoPosition, movement_mode: MovementMode, saved_at: u64) -> Self {
        Self {
            holding: None,
            position: start,
            overrides: Vec::new(),
            movement_mode,
            saved_at,
            goal_reached: false,
        }
    }
}
