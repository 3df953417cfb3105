//! Plain-text rendering backend for terminals.

use std::io::Write;

use anyhow::Result as AnyResult;
use geomerge_core::{CellCoord, MessageClass, StatusMessage};
use geomerge_rendering::{Hud, RenderingBackend, Scene, SceneCell};

const COLUMN_WIDTH: usize = 5;

/// Draws scenes as a character grid with column and row indices for `tap`.
#[derive(Debug)]
pub(crate) struct TextBackend<W> {
    out: W,
}

impl<W: Write> TextBackend<W> {
    pub(crate) fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> RenderingBackend for TextBackend<W> {
    fn present(&mut self, scene: &Scene) -> AnyResult<()> {
        let player = scene.viewport.center();

        write!(self.out, "{:>COLUMN_WIDTH$}", "")?;
        for column in 0..scene.viewport.side() {
            write!(self.out, "{column:>COLUMN_WIDTH$}")?;
        }
        writeln!(self.out)?;

        for (row, cells) in scene.rows().enumerate() {
            write!(self.out, "{row:>COLUMN_WIDTH$}")?;
            for cell in cells {
                write!(self.out, "{:>COLUMN_WIDTH$}", glyph(cell, player))?;
            }
            writeln!(self.out)?;
        }

        writeln!(self.out, "{}", summary(&scene.hud))?;
        writeln!(self.out, "{}", status_line(&scene.hud.status))?;
        if let Some(banner) = scene.banner() {
            writeln!(self.out, "*** {banner} ***")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

fn glyph(cell: &SceneCell, player: CellCoord) -> String {
    let body = match (cell.label.is_empty(), cell.interactable) {
        (false, _) => cell.label.as_str(),
        (true, true) => ".",
        (true, false) => "",
    };
    if cell.cell == player {
        format!("@{body}")
    } else {
        body.to_owned()
    }
}

/// One-line description of the player.
pub(crate) fn summary(hud: &Hud) -> String {
    let holding = hud
        .holding
        .map_or_else(|| "nothing".to_owned(), |token| token.to_string());
    format!(
        "at {} | holding {holding} | {} movement",
        hud.position, hud.movement_mode
    )
}

/// Status message prefixed with its class.
pub(crate) fn status_line(status: &StatusMessage) -> String {
    let tag = match status.class() {
        MessageClass::Success => "ok",
        MessageClass::Rejected => "no",
        MessageClass::Info => "--",
    };
    format!("[{tag}] {}", status.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomerge_core::{CellView, GeoPosition, MovementMode, TileGrid, Token};
    use geomerge_rendering::Viewport;

    fn scene(goal: Option<u64>) -> Scene {
        let grid = TileGrid::default();
        let center = CellCoord::new(0, 0);
        let viewport = Viewport::new(grid, center, 1).expect("valid viewport");
        let mut views = Vec::new();
        for di in [1, 0, -1] {
            for dj in [-1, 0, 1] {
                let cell = center.offset(di, dj);
                views.push(CellView {
                    cell,
                    bounds: grid.bounds_of(cell),
                    content: (di == 1 && dj == 1).then_some(Token::BASE),
                    overridden: false,
                    interactable: di != -1,
                });
            }
        }
        let hud = Hud {
            position: grid.center_of(center),
            holding: Token::new(4),
            movement_mode: MovementMode::Step,
            status: StatusMessage::success("Picked up a 4."),
            goal,
        };
        Scene::new(viewport, views, hud)
    }

    fn render(scene: &Scene) -> String {
        let mut backend = TextBackend::new(Vec::new());
        backend.present(scene).expect("writing to memory succeeds");
        String::from_utf8(backend.out).expect("utf-8 output")
    }

    #[test]
    fn grid_marks_player_tokens_and_reach() {
        let output = render(&scene(None));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "         0    1    2");
        assert_eq!(lines[1], "    0    .    .    1");
        assert_eq!(lines[2], "    1    .   @.    .");
        assert_eq!(lines[3].trim_end(), "    2");
        assert!(lines[4].contains("holding 4"));
        assert!(lines[4].contains("step movement"));
        assert_eq!(lines[5], "[ok] Picked up a 4.");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn banner_follows_status_once_goal_is_reached() {
        let output = render(&scene(Some(16)));
        let last = output.lines().last().expect("output has lines");
        assert!(last.starts_with("*** You reached 16!"));
    }

    #[test]
    fn summary_reports_empty_hand_and_position() {
        let hud = Hud {
            position: GeoPosition::new(1.0, -2.0),
            holding: None,
            movement_mode: MovementMode::Feed,
            status: StatusMessage::info("ready"),
            goal: None,
        };
        assert_eq!(
            summary(&hud),
            "at 1.000000, -2.000000 | holding nothing | feed movement"
        );
        assert_eq!(status_line(&StatusMessage::rejected("nope")), "[no] nope");
    }
}
