//! In-progress shapes owned by a drawing gesture.
//!
//! A [`Draft`] is created at pointer-down, reshaped on every released
//! pointer move, and committed as a finished [`Element`] at pointer-up. It is
//! never part of the collection while the gesture runs.

use crate::element::{Element, Point, Shape, Style};

/// Drawing tools that build a shape by dragging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Pen,
    Rectangle,
    Circle,
    Ellipse,
    Triangle,
    Arrow,
}

impl Tool {
    /// Name used in logs and accepted back by `FromStr`
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Pen => "pen",
            Tool::Rectangle => "rectangle",
            Tool::Circle => "circle",
            Tool::Ellipse => "ellipse",
            Tool::Triangle => "triangle",
            Tool::Arrow => "arrow",
        }
    }
}

impl std::str::FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pen" | "line" | "freehand" => Ok(Tool::Pen),
            "rect" | "rectangle" => Ok(Tool::Rectangle),
            "circle" => Ok(Tool::Circle),
            "ellipse" => Ok(Tool::Ellipse),
            "triangle" => Ok(Tool::Triangle),
            "arrow" => Ok(Tool::Arrow),
            other => Err(format!("unknown tool: {other}")),
        }
    }
}

/// Width/height from the anchor to the pointer. Negative when drawn
/// backwards.
pub fn rectangle_extent(anchor: Point, pointer: Point) -> (f64, f64) {
    (pointer.x - anchor.x, pointer.y - anchor.y)
}

pub fn circle_radius(anchor: Point, pointer: Point) -> f64 {
    let dx = pointer.x - anchor.x;
    let dy = pointer.y - anchor.y;
    (dx * dx + dy * dy).sqrt()
}

pub fn ellipse_radii(anchor: Point, pointer: Point) -> (f64, f64) {
    ((pointer.x - anchor.x).abs(), (pointer.y - anchor.y).abs())
}

/// Isosceles triangle: left vertex at (anchor.x, pointer.y), apex at the
/// horizontal midpoint on the anchor's row, right vertex at the pointer.
pub fn triangle_points(anchor: Point, pointer: Point) -> [f64; 6] {
    let apex_x = (anchor.x + pointer.x) / 2.0;
    [anchor.x, pointer.y, apex_x, anchor.y, pointer.x, pointer.y]
}

/// Shape being drawn by the current gesture
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    tool: Tool,
    anchor: Point,
    element: Element,
}

impl Draft {
    /// Start a shape at the pointer-down position
    pub fn begin(tool: Tool, anchor: Point, style: &Style) -> Self {
        let Point { x, y } = anchor;
        let shape = match tool {
            Tool::Pen => Shape::Freehand { points: vec![x, y] },
            Tool::Arrow => Shape::Arrow { points: vec![x, y, x, y] },
            Tool::Rectangle => Shape::Rectangle { x, y, width: 0.0, height: 0.0 },
            Tool::Circle => Shape::Circle { x, y, radius: 0.0 },
            Tool::Ellipse => Shape::Ellipse { x, y, radius_x: 0.0, radius_y: 0.0 },
            Tool::Triangle => Shape::Triangle {
                start_x: x,
                start_y: y,
                points: vec![x, y, x, y, x, y],
            },
        };

        Self {
            tool,
            anchor,
            element: Element::new(shape, style),
        }
    }

    /// Reshape for a new pointer position
    pub fn update(&mut self, pointer: Point) {
        let anchor = self.anchor;
        match &mut self.element.shape {
            Shape::Freehand { points } | Shape::Arrow { points } => {
                points.push(pointer.x);
                points.push(pointer.y);
            }
            Shape::Rectangle { width, height, .. } => {
                (*width, *height) = rectangle_extent(anchor, pointer);
            }
            Shape::Circle { radius, .. } => {
                *radius = circle_radius(anchor, pointer);
            }
            Shape::Ellipse { radius_x, radius_y, .. } => {
                (*radius_x, *radius_y) = ellipse_radii(anchor, pointer);
            }
            Shape::Triangle { points, .. } => {
                *points = triangle_points(anchor, pointer).to_vec();
            }
            Shape::Text { .. } | Shape::Sticky { .. } => {}
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Current state, for rendering the gesture in progress
    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn commit(self) -> Element {
        self.element
    }
}
