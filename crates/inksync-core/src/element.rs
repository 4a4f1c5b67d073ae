//! Element types for the shared canvas.
//!
//! An [`Element`] is one drawable object. The common fields (identifier,
//! stroke color, stroke width) live on the element itself, the variant
//! geometry lives in [`Shape`]. The serialized form is the flat JSON record
//! exchanged on the wire and in exported snapshots:
//!
//! ```json
//! { "id": "1718000000000-3f2a...", "type": "rectangle", "color": "black",
//!   "lineWidth": 3, "x": 10, "y": 10, "width": 40, "height": 30 }
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_COLOR: &str = "black";
pub const DEFAULT_LINE_WIDTH: f64 = 3.0;
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_SIZE: f64 = 20.0;
pub const STICKY_WIDTH: f64 = 200.0;
pub const STICKY_HEIGHT: f64 = 150.0;
pub const STICKY_BACKGROUND: &str = "#fff59d";
pub const STICKY_BORDER: &str = "#fbc02d";

/// Element identifier - creation timestamp plus a random component.
///
/// Never changes after creation; every update is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(format!("{}-{}", millis, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
}

impl std::str::FromStr for FontStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(FontStyle::Normal),
            "bold" => Ok(FontStyle::Bold),
            "italic" => Ok(FontStyle::Italic),
            other => Err(format!("unknown font style: {other}")),
        }
    }
}

/// Drawing attributes applied to newly created elements
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub color: String,
    pub line_width: f64,
    pub font_family: String,
    pub font_style: FontStyle,
    pub font_size: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            line_width: DEFAULT_LINE_WIDTH,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_style: FontStyle::Normal,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_line_width() -> f64 {
    DEFAULT_LINE_WIDTH
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

/// One drawable object on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(rename = "lineWidth", default = "default_line_width")]
    pub line_width: f64,
    #[serde(flatten)]
    pub shape: Shape,
}

/// Variant geometry.
///
/// Path-based shapes carry a flat `[x0, y0, x1, y1, ...]` list; point order
/// defines the rendered path. Rectangle extents may be negative when the
/// shape was drawn backwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Shape {
    /// Freehand stroke
    #[serde(rename = "line")]
    Freehand { points: Vec<f64> },
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Circle { x: f64, y: f64, radius: f64 },
    Ellipse {
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
    },
    /// Isosceles triangle anchored where the gesture started
    Triangle {
        start_x: f64,
        start_y: f64,
        points: Vec<f64>,
    },
    Arrow { points: Vec<f64> },
    Text {
        x: f64,
        y: f64,
        text: String,
        #[serde(default = "default_font_size")]
        font_size: f64,
        #[serde(default = "default_font_family")]
        font_family: String,
        #[serde(default)]
        font_style: FontStyle,
    },
    /// Sticky note: filled box with text inside
    Sticky {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        text: String,
        #[serde(default = "default_font_size")]
        font_size: f64,
        background: String,
        border_color: String,
    },
}

impl Shape {
    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Freehand { .. } => "line",
            Shape::Rectangle { .. } => "rectangle",
            Shape::Circle { .. } => "circle",
            Shape::Ellipse { .. } => "ellipse",
            Shape::Triangle { .. } => "triangle",
            Shape::Arrow { .. } => "arrow",
            Shape::Text { .. } => "text",
            Shape::Sticky { .. } => "sticky",
        }
    }

    /// Path points, for the path-based variants
    pub fn points(&self) -> Option<&[f64]> {
        match self {
            Shape::Freehand { points } | Shape::Arrow { points } | Shape::Triangle { points, .. } => {
                Some(points.as_slice())
            }
            _ => None,
        }
    }
}

impl Element {
    /// Create an element with a fresh identifier
    pub fn new(shape: Shape, style: &Style) -> Self {
        Self::with_id(ElementId::new(), shape, style)
    }

    pub fn with_id(id: ElementId, shape: Shape, style: &Style) -> Self {
        Self {
            id,
            color: style.color.clone(),
            line_width: style.line_width,
            shape,
        }
    }

    /// A text element at `pos` using the style's font attributes
    pub fn text(pos: Point, text: impl Into<String>, style: &Style) -> Self {
        Self::new(
            Shape::Text {
                x: pos.x,
                y: pos.y,
                text: text.into(),
                font_size: style.font_size,
                font_family: style.font_family.clone(),
                font_style: style.font_style,
            },
            style,
        )
    }

    /// A sticky note with the default note size and colors
    pub fn sticky(pos: Point, text: impl Into<String>, style: &Style) -> Self {
        Self::new(
            Shape::Sticky {
                x: pos.x,
                y: pos.y,
                width: STICKY_WIDTH,
                height: STICKY_HEIGHT,
                text: text.into(),
                font_size: style.font_size,
                background: STICKY_BACKGROUND.to_string(),
                border_color: STICKY_BORDER.to_string(),
            },
            style,
        )
    }

    pub fn kind(&self) -> &'static str {
        self.shape.kind()
    }

    /// Merge the fields present in `patch`. Fields the variant does not have
    /// are ignored; the identifier is never touched.
    pub fn apply_patch(&mut self, patch: &ElementPatch) {
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(line_width) = patch.line_width {
            self.line_width = line_width;
        }

        match &mut self.shape {
            Shape::Freehand { points } | Shape::Arrow { points } => {
                set(points, &patch.points);
            }
            Shape::Triangle { points, .. } => {
                set(points, &patch.points);
            }
            Shape::Rectangle { x, y, width, height } => {
                set(x, &patch.x);
                set(y, &patch.y);
                set(width, &patch.width);
                set(height, &patch.height);
            }
            Shape::Circle { x, y, radius } => {
                set(x, &patch.x);
                set(y, &patch.y);
                set(radius, &patch.radius);
            }
            Shape::Ellipse { x, y, radius_x, radius_y } => {
                set(x, &patch.x);
                set(y, &patch.y);
                set(radius_x, &patch.radius_x);
                set(radius_y, &patch.radius_y);
            }
            Shape::Text { x, y, text, font_size, font_family, font_style } => {
                set(x, &patch.x);
                set(y, &patch.y);
                set(text, &patch.text);
                set(font_size, &patch.font_size);
                set(font_family, &patch.font_family);
                set(font_style, &patch.font_style);
            }
            Shape::Sticky { x, y, width, height, text, font_size, background, .. } => {
                set(x, &patch.x);
                set(y, &patch.y);
                set(width, &patch.width);
                set(height, &patch.height);
                set(text, &patch.text);
                set(font_size, &patch.font_size);
                set(background, &patch.background);
            }
        }
    }

    /// Move the element by a delta (drag end)
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match &mut self.shape {
            Shape::Freehand { points } | Shape::Arrow { points } => {
                translate_points(points, dx, dy);
            }
            Shape::Triangle { start_x, start_y, points } => {
                *start_x += dx;
                *start_y += dy;
                translate_points(points, dx, dy);
            }
            Shape::Rectangle { x, y, .. }
            | Shape::Circle { x, y, .. }
            | Shape::Ellipse { x, y, .. }
            | Shape::Text { x, y, .. }
            | Shape::Sticky { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
        }
    }
}

fn set<T: Clone>(field: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *field = v.clone();
    }
}

fn translate_points(points: &mut [f64], dx: f64, dy: f64) {
    for pair in points.chunks_exact_mut(2) {
        pair[0] += dx;
        pair[1] += dy;
    }
}

/// Partial field replacement for an existing element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl ElementPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
