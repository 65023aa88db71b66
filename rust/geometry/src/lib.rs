// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! XSection Geometry
//!
//! Section-line geometry for cross-section profiles: buffering and polygon
//! intersection (2D booleans via i_overlay), CRS-aware along-line measurement,
//! densification, a grid spatial index and Ramer-Douglas-Peucker level-of-detail
//! reduction.

pub mod error;
pub mod geodesy;
pub mod kernel;
pub mod polygon;
pub mod simplify;
pub mod spatial;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2};

pub use error::{Error, Result};
pub use geodesy::{bearing, measure, LocalFrame};
pub use kernel::{
    buffer, densify, distance_along_line, extract_vertices, intersect, intersect_all,
    normalize_line_parts, perpendicular_offset, Geometry, LinePart, LinePosition, PreparedSection,
};
pub use polygon::{union_rings, Polygon};
pub use simplify::{simplify, simplify_with_tolerance, SimplifyMode};
pub use spatial::{BoundingBox, SpatialIndex};
