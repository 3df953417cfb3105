#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for geomerge adapters.
//!
//! A [`Scene`] is rebuilt from world queries after every command. Backends only
//! read it; clicks travel back as cell addresses found with [`Scene::cell_at`].

use anyhow::Result as AnyResult;
use geomerge_core::{
    CellCoord, CellView, GeoBounds, GeoPosition, MovementMode, StatusMessage, TileGrid, Token,
};
use glam::DVec2;
use std::{error::Error, fmt};

/// Largest window radius a viewport accepts.
pub const MAX_VIEW_RADIUS: u32 = 64;

const TOKEN_PALETTE: [Color; 8] = [
    Color::from_rgb_u8(244, 208, 63),
    Color::from_rgb_u8(235, 152, 78),
    Color::from_rgb_u8(231, 76, 60),
    Color::from_rgb_u8(175, 122, 197),
    Color::from_rgb_u8(93, 173, 226),
    Color::from_rgb_u8(72, 201, 176),
    Color::from_rgb_u8(88, 214, 141),
    Color::from_rgb_u8(236, 240, 241),
];
const EMPTY_FILL: Color = Color::from_rgb_u8(52, 73, 94);
const OUT_OF_REACH_FADE: f32 = 0.6;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Fill color for a cell holding `content`.
#[must_use]
pub fn fill_for(content: Option<Token>) -> Color {
    match content {
        Some(token) => {
            let rank = token.value().trailing_zeros() as usize;
            TOKEN_PALETTE[rank % TOKEN_PALETTE.len()]
        }
        None => EMPTY_FILL,
    }
}

/// Square window of cells centred on the player's cell.
///
/// Screen space is measured in tiles from the north-west corner of the window,
/// with `x` growing east and `y` growing south.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    grid: TileGrid,
    center: CellCoord,
    radius: u32,
}

impl Viewport {
    /// Creates a viewport of `radius` cells around `center`.
    pub fn new(grid: TileGrid, center: CellCoord, radius: u32) -> Result<Self, RenderingError> {
        if radius > MAX_VIEW_RADIUS {
            return Err(RenderingError::InvalidViewRadius {
                radius,
                max: MAX_VIEW_RADIUS,
            });
        }

        Ok(Self {
            grid,
            center,
            radius,
        })
    }

    /// Cell at the centre of the window.
    #[must_use]
    pub const fn center(&self) -> CellCoord {
        self.center
    }

    /// Number of cells from the centre to each edge.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Number of cells along each side of the window.
    #[must_use]
    pub const fn side(&self) -> u32 {
        self.radius * 2 + 1
    }

    /// Reports whether `cell` lies inside the window.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.center.chebyshev_distance(cell) <= self.radius
    }

    /// Geographic rectangle covered by the window.
    #[must_use]
    pub fn bounds(&self) -> GeoBounds {
        let reach = self.radius as i32;
        let south_west = self.grid.bounds_of(self.center.offset(-reach, -reach));
        let north_east = self.grid.bounds_of(self.center.offset(reach, reach));
        GeoBounds::new(south_west.south_west(), north_east.north_east())
    }

    /// Address of the cell containing `position`, if it lies inside the window.
    #[must_use]
    pub fn cell_at(&self, position: GeoPosition) -> Option<CellCoord> {
        if !position.is_finite() {
            return None;
        }
        let cell = self.grid.address_of(position);
        self.contains(cell).then_some(cell)
    }

    /// Projects a geographic position into screen space.
    #[must_use]
    pub fn to_screen(&self, position: GeoPosition) -> DVec2 {
        let tile = self.grid.tile_degrees();
        let origin = self.north_west();
        DVec2::new(position.lng() - origin.x, origin.y - position.lat()) / tile
    }

    /// Maps a screen-space point back to a geographic position.
    #[must_use]
    pub fn to_geo(&self, screen: DVec2) -> GeoPosition {
        let origin = self.north_west();
        let offset = screen * self.grid.tile_degrees();
        GeoPosition::new(origin.y - offset.y, origin.x + offset.x)
    }

    fn north_west(&self) -> DVec2 {
        let bounds = self.bounds();
        DVec2::new(bounds.south_west().lng(), bounds.north_east().lat())
    }
}

/// Presentation of a single cell.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneCell {
    /// Address of the cell.
    pub cell: CellCoord,
    /// Geographic rectangle covered by the cell.
    pub bounds: GeoBounds,
    /// Token shown in the cell, if any.
    pub content: Option<Token>,
    /// Whether the player changed this cell.
    pub overridden: bool,
    /// Whether the player can act on this cell from where they stand.
    pub interactable: bool,
    /// Text drawn in the cell. Empty when the cell holds nothing.
    pub label: String,
    /// Background color of the cell.
    pub fill: Color,
}

impl From<CellView> for SceneCell {
    fn from(view: CellView) -> Self {
        let fill = fill_for(view.content);
        Self {
            cell: view.cell,
            bounds: view.bounds,
            content: view.content,
            overridden: view.overridden,
            interactable: view.interactable,
            label: view
                .content
                .map(|token| token.to_string())
                .unwrap_or_default(),
            fill: if view.interactable {
                fill
            } else {
                fill.lighten(OUT_OF_REACH_FADE)
            },
        }
    }
}

/// Player state shown beside the map.
#[derive(Clone, Debug, PartialEq)]
pub struct Hud {
    /// Current player position.
    pub position: GeoPosition,
    /// Token in the player's hand.
    pub holding: Option<Token>,
    /// Active movement mode.
    pub movement_mode: MovementMode,
    /// Latest status message.
    pub status: StatusMessage,
    /// Target value, present once the goal has been reached.
    pub goal: Option<u64>,
}

/// Declarative description of everything a backend draws.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Window the cells were gathered for.
    pub viewport: Viewport,
    /// Cells in rows from north to south, each row from west to east.
    pub cells: Vec<SceneCell>,
    /// Player state.
    pub hud: Hud,
}

impl Scene {
    /// Creates a scene from the cell views of `viewport`.
    ///
    /// Views outside the viewport are dropped.
    #[must_use]
    pub fn new(viewport: Viewport, views: Vec<CellView>, hud: Hud) -> Self {
        let cells = views
            .into_iter()
            .filter(|view| viewport.contains(view.cell))
            .map(SceneCell::from)
            .collect();
        Self {
            viewport,
            cells,
            hud,
        }
    }

    /// Cell under a geographic click, if the scene shows it.
    #[must_use]
    pub fn cell_at(&self, position: GeoPosition) -> Option<CellCoord> {
        let cell = self.viewport.cell_at(position)?;
        self.cell(cell).map(|scene_cell| scene_cell.cell)
    }

    /// Presentation of `cell`, if the scene shows it.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<&SceneCell> {
        self.cells.iter().find(|scene_cell| scene_cell.cell == cell)
    }

    /// Cells grouped into rows from north to south.
    pub fn rows(&self) -> impl Iterator<Item = &[SceneCell]> {
        self.cells.chunks(self.viewport.side() as usize)
    }

    /// Banner announcing the win, shown for the rest of the session.
    #[must_use]
    pub fn banner(&self) -> Option<String> {
        self.hud
            .goal
            .map(|target| format!("You reached {target}! Keep merging or start a new game."))
    }
}

/// Rendering backend capable of presenting geomerge scenes.
pub trait RenderingBackend {
    /// Draws the provided scene.
    fn present(&mut self, scene: &Scene) -> AnyResult<()>;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// The requested window is larger than a backend is expected to draw.
    InvalidViewRadius {
        /// Provided radius that failed validation.
        radius: u32,
        /// Largest accepted radius.
        max: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidViewRadius { radius, max } => {
                write!(f, "view radius must be at most {max} (received {radius})")
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: u64) -> Token {
        Token::new(value).expect("power of two")
    }

    fn view(cell: CellCoord, content: Option<Token>, interactable: bool) -> CellView {
        CellView {
            cell,
            bounds: TileGrid::default().bounds_of(cell),
            content,
            overridden: false,
            interactable,
        }
    }

    fn window(viewport: &Viewport) -> Vec<CellView> {
        let reach = viewport.radius() as i32;
        let mut views = Vec::new();
        for di in (-reach..=reach).rev() {
            for dj in -reach..=reach {
                let cell = viewport.center().offset(di, dj);
                views.push(view(cell, None, true));
            }
        }
        views
    }

    fn hud() -> Hud {
        Hud {
            position: GeoPosition::new(0.0, 0.0),
            holding: None,
            movement_mode: MovementMode::Step,
            status: StatusMessage::info("ready"),
            goal: None,
        }
    }

    #[test]
    fn viewport_rejects_oversized_radius_without_panicking() {
        let error = Viewport::new(TileGrid::default(), CellCoord::new(0, 0), MAX_VIEW_RADIUS + 1)
            .expect_err("oversized radius must be rejected");

        assert_eq!(
            error,
            RenderingError::InvalidViewRadius {
                radius: MAX_VIEW_RADIUS + 1,
                max: MAX_VIEW_RADIUS,
            }
        );
    }

    #[test]
    fn labels_show_token_values() {
        let occupied = SceneCell::from(view(CellCoord::new(0, 0), Some(token(8)), true));
        let empty = SceneCell::from(view(CellCoord::new(0, 1), None, true));

        assert_eq!(occupied.label, "8");
        assert_eq!(empty.label, "");
        assert_eq!(empty.fill, EMPTY_FILL);
    }

    #[test]
    fn equal_tokens_share_colors_and_distant_cells_fade() {
        let near = SceneCell::from(view(CellCoord::new(0, 0), Some(token(2)), true));
        let same = SceneCell::from(view(CellCoord::new(5, 5), Some(token(2)), true));
        let far = SceneCell::from(view(CellCoord::new(9, 9), Some(token(2)), false));
        let bigger = SceneCell::from(view(CellCoord::new(0, 1), Some(token(4)), true));

        assert_eq!(near.fill, same.fill);
        assert_ne!(near.fill, bigger.fill);
        assert_eq!(far.fill, near.fill.lighten(OUT_OF_REACH_FADE));
    }

    #[test]
    fn clicks_resolve_to_visible_cells_only() {
        let grid = TileGrid::default();
        let center = CellCoord::new(-10, 25);
        let viewport = Viewport::new(grid, center, 2).expect("valid viewport");
        let scene = Scene::new(viewport, window(&viewport), hud());

        let inside = center.offset(1, -2);
        assert_eq!(scene.cell_at(grid.center_of(inside)), Some(inside));
        assert_eq!(scene.cell_at(grid.center_of(center.offset(3, 0))), None);
        assert_eq!(scene.cell_at(GeoPosition::new(f64::NAN, 0.0)), None);
    }

    #[test]
    fn screen_points_map_to_cells_row_by_row() {
        let grid = TileGrid::default();
        let center = CellCoord::new(100, -200);
        let viewport = Viewport::new(grid, center, 3).expect("valid viewport");
        let scene = Scene::new(viewport, window(&viewport), hud());

        for (row, cells) in scene.rows().enumerate() {
            assert_eq!(cells.len(), 7);
            for (column, cell) in cells.iter().enumerate() {
                let screen = DVec2::new(column as f64 + 0.5, row as f64 + 0.5);
                assert_eq!(scene.cell_at(viewport.to_geo(screen)), Some(cell.cell));
            }
        }
    }

    #[test]
    fn screen_projection_inverts() {
        let grid = TileGrid::default();
        let viewport = Viewport::new(grid, CellCoord::new(4, 4), 1).expect("valid viewport");
        let position = grid.center_of(CellCoord::new(4, 4));
        let screen = viewport.to_screen(position);

        assert!((screen - DVec2::new(1.5, 1.5)).length() < 1e-6);
        let back = viewport.to_geo(screen);
        assert!((back.lat() - position.lat()).abs() < 1e-12);
        assert!((back.lng() - position.lng()).abs() < 1e-12);
    }

    #[test]
    fn banner_appears_once_goal_is_reached() {
        let viewport =
            Viewport::new(TileGrid::default(), CellCoord::new(0, 0), 0).expect("valid viewport");
        let mut scene = Scene::new(viewport, Vec::new(), hud());
        assert_eq!(scene.banner(), None);

        scene.hud.goal = Some(16);
        assert!(scene.banner().expect("banner").contains("16"));
    }
}
