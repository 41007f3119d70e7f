//! Geometry to drawing-command conversion.
//!
//! Produces planar move/line/close commands that the rendering layer turns
//! into strokes and fills.

use std::fmt;

use super::{AffineTransform, Geometry, ProjectionConfig};

/// A single planar drawing command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    ClosePath,
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathCommand::MoveTo(x, y) => write!(f, "M{},{}", x, y),
            PathCommand::LineTo(x, y) => write!(f, "L{},{}", x, y),
            PathCommand::ClosePath => write!(f, "Z"),
        }
    }
}

/// Converts a geometry into drawing commands.
///
/// Every ring (outer and inner) becomes its own closed sub-path, in input
/// order. Hole rendering is left to the consumer's fill rule. When
/// `extra_transform` is given it is applied after projection.
pub fn to_path(
    geometry: &Geometry,
    projection: &ProjectionConfig,
    extra_transform: Option<&AffineTransform>,
) -> Vec<PathCommand> {
    let mut commands = Vec::with_capacity(geometry.coords().count() + geometry.rings().count());

    for ring in geometry.rings() {
        // Empty rings contribute nothing, not even a close
        if ring.is_empty() {
            continue;
        }

        for (i, coord) in ring.iter().enumerate() {
            let mut point = projection.project_coord(*coord);
            if let Some(transform) = extra_transform {
                point = transform.apply(point);
            }

            let (x, y) = point;
            commands.push(if i == 0 {
                PathCommand::MoveTo(x, y)
            } else {
                PathCommand::LineTo(x, y)
            });
        }

        commands.push(PathCommand::ClosePath);
    }

    commands
}

/// Serializes commands as SVG path data, e.g. `M0,0 L10,0 Z`.
pub fn to_svg_path(commands: &[PathCommand]) -> String {
    commands
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
