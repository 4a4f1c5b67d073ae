//! Line-oriented input for the headless `join` client.

use std::path::PathBuf;

use inksync_core::{ElementId, ElementPatch, FontStyle, Point, Tool};
use inksync_sync::Command;

pub const HELP: &str = "\
commands:
  pen|rect|circle|ellipse|triangle|arrow X Y X Y [X Y ...]   draw by dragging through points
  text X Y WORDS...          place text
  sticky X Y WORDS...        place a sticky note
  move ID DX DY              translate an element
  patch ID KEY=VALUE...      change fields, e.g. patch ID color=red width=10
  delete ID
  undo | redo | clear
  color VALUE | width N | font FAMILY | fontsize N | fontstyle normal|bold|italic
  list                       print the collection as a JSON snapshot
  save PATH | load PATH
  sync                       broadcast the whole collection
  help | quit";

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A drag through `points`, first point is pointer-down
    Gesture { tool: Tool, points: Vec<Point> },
    Apply(Command),
    SetStyle(StyleChange),
    List,
    Save(PathBuf),
    Load(PathBuf),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleChange {
    Color(String),
    LineWidth(f64),
    FontFamily(String),
    FontSize(f64),
    FontStyle(FontStyle),
}

impl Input {
    /// Expand a gesture into pointer commands
    pub fn gesture_commands(tool: Tool, points: &[Point]) -> Vec<Command> {
        let mut commands = Vec::with_capacity(points.len() + 1);
        let mut points = points.iter().copied();
        if let Some(at) = points.next() {
            commands.push(Command::PointerDown { tool, at });
            commands.extend(points.map(|at| Command::PointerMove { at }));
            commands.push(Command::PointerUp);
        }
        commands
    }
}

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let input = match verb {
        "pen" | "rect" | "rectangle" | "circle" | "ellipse" | "triangle" | "arrow" => {
            let tool: Tool = verb.parse()?;
            let points = parse_points(&args)?;
            if points.len() < 2 {
                return Err(format!("{verb} needs at least two points"));
            }
            Input::Gesture { tool, points }
        }
        "text" | "sticky" => {
            let (at, rest) = leading_point(verb, &args)?;
            if rest.is_empty() {
                return Err(format!("{verb} needs some text"));
            }
            let text = rest.join(" ");
            if verb == "text" {
                Input::Apply(Command::PlaceText { at, text })
            } else {
                Input::Apply(Command::PlaceSticky { at, text })
            }
        }
        "move" => match args.as_slice() {
            [id, dx, dy] => Input::Apply(Command::Translate {
                id: ElementId::from(*id),
                dx: number(dx)?,
                dy: number(dy)?,
            }),
            _ => return Err("usage: move ID DX DY".into()),
        },
        "patch" => match args.split_first() {
            Some((id, fields)) if !fields.is_empty() => Input::Apply(Command::Patch {
                id: ElementId::from(*id),
                patch: parse_patch(fields)?,
            }),
            _ => return Err("usage: patch ID KEY=VALUE...".into()),
        },
        "delete" | "rm" => match args.as_slice() {
            [id] => Input::Apply(Command::Delete { id: ElementId::from(*id) }),
            _ => return Err("usage: delete ID".into()),
        },
        "undo" => Input::Apply(Command::Undo),
        "redo" => Input::Apply(Command::Redo),
        "clear" => Input::Apply(Command::Clear),
        "sync" => Input::Apply(Command::SendFull),
        "color" => Input::SetStyle(StyleChange::Color(single(verb, &args)?.to_string())),
        "width" => Input::SetStyle(StyleChange::LineWidth(number(single(verb, &args)?)?)),
        "font" => {
            if args.is_empty() {
                return Err("usage: font FAMILY".into());
            }
            Input::SetStyle(StyleChange::FontFamily(args.join(" ")))
        }
        "fontsize" => Input::SetStyle(StyleChange::FontSize(number(single(verb, &args)?)?)),
        "fontstyle" => Input::SetStyle(StyleChange::FontStyle(single(verb, &args)?.parse()?)),
        "list" | "ls" => Input::List,
        "save" => Input::Save(PathBuf::from(single(verb, &args)?)),
        "load" => Input::Load(PathBuf::from(single(verb, &args)?)),
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command: {other} (try help)")),
    };
    Ok(Some(input))
}

fn number(word: &str) -> Result<f64, String> {
    word.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("not a number: {word}"))
}

fn single<'a>(verb: &str, args: &[&'a str]) -> Result<&'a str, String> {
    match args {
        [one] => Ok(*one),
        _ => Err(format!("{verb} takes exactly one argument")),
    }
}

fn parse_points(args: &[&str]) -> Result<Vec<Point>, String> {
    if args.len() % 2 != 0 {
        return Err("coordinates must come in X Y pairs".into());
    }
    args.chunks(2)
        .map(|pair| Ok(Point::new(number(pair[0])?, number(pair[1])?)))
        .collect()
}

fn leading_point<'a>(verb: &str, args: &'a [&'a str]) -> Result<(Point, &'a [&'a str]), String> {
    match args {
        [x, y, rest @ ..] => Ok((Point::new(number(x)?, number(y)?), rest)),
        _ => Err(format!("usage: {verb} X Y WORDS...")),
    }
}

const NUMERIC_FIELDS: &[&str] = &[
    "x", "y", "width", "height", "radius", "radiusX", "radiusY", "fontSize", "lineWidth",
];

/// `key=value` pairs into a patch. Keys are the wire field names, so `width`
/// is the shape width and `lineWidth` the stroke.
fn parse_patch(fields: &[&str]) -> Result<ElementPatch, String> {
    let mut object = serde_json::Map::new();
    for field in fields {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got {field}"))?;
        let value = match key {
            "points" => serde_json::Value::Array(
                value
                    .split(',')
                    .map(|n| number(n).map(serde_json::Value::from))
                    .collect::<Result<_, _>>()?,
            ),
            _ if NUMERIC_FIELDS.contains(&key) => serde_json::Value::from(number(value)?),
            _ => serde_json::Value::from(value),
        };
        object.insert(key.to_string(), value);
    }
    serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| format!("bad patch: {e}"))
}
