//! Parsing of REPL input lines.

use anyhow::{bail, Context, Result};
use geomerge_core::{CellCoord, Direction, GeoPosition, MovementMode};
use geomerge_system_movement::FeedError;

const MAX_STEP_REPEAT: u32 = 100;

/// Help text printed by the `help` command.
pub(crate) const HELP: &str = "\
commands:
  n|e|s|w [count]      step north, east, south or west (step movement)
  click <i> <j>        act on the cell with address (i, j)
  tap <column> <row>   act on the cell drawn at that spot by `look`
  fix <lat> <lng>      deliver a location fix (feed movement)
  fail <reason>        report a feed failure: denied, timeout, unavailable, unsupported
  mode <step|feed>     switch movement mode
  look                 draw the map around the player
  status               show position, hand and last message
  export               print the saved session string
  import <string>      restore a session string
  new                  start a new game
  help                 show this text
  quit                 leave";

/// A single parsed REPL line.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Input {
    /// Step `count` times in `direction`.
    Step {
        direction: Direction,
        count: u32,
    },
    /// Act on a cell by address.
    Click(CellCoord),
    /// Act on the cell drawn at a map column and row.
    Tap { column: u32, row: u32 },
    /// Deliver a location fix.
    Fix(GeoPosition),
    /// Report a feed failure.
    Fail(FeedError),
    /// Switch movement mode.
    Mode(MovementMode),
    /// Draw the map.
    Look,
    /// Print the player summary.
    Status,
    /// Print the encoded session.
    Export,
    /// Restore an encoded session.
    Import(String),
    /// Start over.
    NewGame,
    /// Print the command list.
    Help,
    /// Leave the REPL.
    Quit,
}

/// Parses one line. Blank lines yield `None`.
pub(crate) fn parse_line(line: &str) -> Result<Option<Input>> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let arguments: Vec<&str> = words.collect();

    let input = match command.to_ascii_lowercase().as_str() {
        "n" | "north" => step(Direction::North, &arguments)?,
        "e" | "east" => step(Direction::East, &arguments)?,
        "s" | "south" => step(Direction::South, &arguments)?,
        "w" | "west" => step(Direction::West, &arguments)?,
        "click" => {
            let [i, j] = exactly::<2>(command, &arguments)?;
            Input::Click(CellCoord::new(
                parse_number(i, "i")?,
                parse_number(j, "j")?,
            ))
        }
        "tap" => {
            let [column, row] = exactly::<2>(command, &arguments)?;
            Input::Tap {
                column: parse_number(column, "column")?,
                row: parse_number(row, "row")?,
            }
        }
        "fix" => {
            let [lat, lng] = exactly::<2>(command, &arguments)?;
            let position = GeoPosition::new(parse_number(lat, "lat")?, parse_number(lng, "lng")?);
            if !position.is_on_globe() {
                bail!("latitude must be within ±90 and longitude within ±180");
            }
            Input::Fix(position)
        }
        "fail" => {
            let [reason] = exactly::<1>(command, &arguments)?;
            Input::Fail(parse_feed_error(reason)?)
        }
        "mode" => {
            let [name] = exactly::<1>(command, &arguments)?;
            match MovementMode::parse(name) {
                Some(mode) => Input::Mode(mode),
                None => bail!("unknown movement mode `{name}` (expected step or feed)"),
            }
        }
        "import" => {
            let [payload] = exactly::<1>(command, &arguments)?;
            Input::Import(payload.to_owned())
        }
        "look" => no_arguments(command, &arguments, Input::Look)?,
        "status" => no_arguments(command, &arguments, Input::Status)?,
        "export" => no_arguments(command, &arguments, Input::Export)?,
        "new" => no_arguments(command, &arguments, Input::NewGame)?,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => bail!("unknown command `{other}` (try `help`)"),
    };

    Ok(Some(input))
}

fn step(direction: Direction, arguments: &[&str]) -> Result<Input> {
    let count = match arguments {
        [] => 1,
        [count] => parse_number::<u32>(count, "count")?,
        _ => bail!("steps take at most one count"),
    };
    if count == 0 || count > MAX_STEP_REPEAT {
        bail!("step count must be between 1 and {MAX_STEP_REPEAT}");
    }
    Ok(Input::Step { direction, count })
}

fn exactly<'a, const N: usize>(command: &str, arguments: &[&'a str]) -> Result<[&'a str; N]> {
    match <[&str; N]>::try_from(arguments) {
        Ok(values) => Ok(values),
        Err(_) => bail!(
            "`{command}` takes {N} argument(s), received {}",
            arguments.len()
        ),
    }
}

fn no_arguments(command: &str, arguments: &[&str], input: Input) -> Result<Input> {
    let [] = exactly::<0>(command, arguments)?;
    Ok(input)
}

fn parse_number<T>(text: &str, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse::<T>()
        .with_context(|| format!("`{text}` is not a valid {name}"))
}

fn parse_feed_error(reason: &str) -> Result<FeedError> {
    Ok(match reason.to_ascii_lowercase().as_str() {
        "denied" => FeedError::PermissionDenied,
        "timeout" => FeedError::Timeout,
        "unavailable" => FeedError::Unavailable,
        "unsupported" => FeedError::Unsupported,
        other => bail!("unknown feed failure `{other}`"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Input {
        parse_line(line)
            .expect("line parses")
            .expect("line is not blank")
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_line("").expect("parses"), None);
        assert_eq!(parse_line("   \t").expect("parses"), None);
    }

    #[test]
    fn steps_accept_short_and_long_names() {
        assert_eq!(
            parse("n"),
            Input::Step {
                direction: Direction::North,
                count: 1
            }
        );
        assert_eq!(
            parse("WEST 4"),
            Input::Step {
                direction: Direction::West,
                count: 4
            }
        );
        assert!(parse_line("s 0").is_err());
        assert!(parse_line("e 101").is_err());
        assert!(parse_line("e 1 2").is_err());
    }

    #[test]
    fn click_reads_negative_addresses() {
        assert_eq!(
            parse("click -369894 1220628"),
            Input::Click(CellCoord::new(-369_894, 1_220_628))
        );
        assert!(parse_line("click 1").is_err());
        assert!(parse_line("click 1 x").is_err());
    }

    #[test]
    fn tap_reads_map_coordinates() {
        assert_eq!(parse("tap 3 7"), Input::Tap { column: 3, row: 7 });
        assert!(parse_line("tap -1 0").is_err());
    }

    #[test]
    fn fixes_must_lie_on_the_globe() {
        assert_eq!(
            parse("fix 36.99 -122.06"),
            Input::Fix(GeoPosition::new(36.99, -122.06))
        );
        let error = parse_line("fix NaN 0").expect_err("nan is refused");
        assert!(error.to_string().contains("latitude"));
        assert!(parse_line("fix 1e12 0").is_err());
        assert!(parse_line("fix 0 180.5").is_err());
        assert_eq!(parse("fix -90 180"), Input::Fix(GeoPosition::new(-90.0, 180.0)));
    }

    #[test]
    fn failures_and_modes_parse_by_name() {
        assert_eq!(parse("fail denied"), Input::Fail(FeedError::PermissionDenied));
        assert_eq!(parse("fail TIMEOUT"), Input::Fail(FeedError::Timeout));
        assert!(parse_line("fail gremlins").is_err());

        assert_eq!(parse("mode feed"), Input::Mode(MovementMode::Feed));
        assert!(parse_line("mode teleport").is_err());
    }

    #[test]
    fn bare_commands_refuse_arguments() {
        assert_eq!(parse("look"), Input::Look);
        assert_eq!(parse("new"), Input::NewGame);
        assert_eq!(parse("q"), Input::Quit);
        assert!(parse_line("look around").is_err());
    }

    #[test]
    fn unknown_commands_point_to_help() {
        let error = parse_line("dance").expect_err("unknown command");
        assert!(error.to_string().contains("help"));
    }

    #[test]
    fn import_keeps_payload_verbatim() {
        assert_eq!(
            parse("import geomerge:v1:eyJhIjoxfQ"),
            Input::Import("geomerge:v1:eyJhIjoxfQ".to_owned())
        );
    }
}
