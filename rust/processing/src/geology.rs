// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geological intersection of the section with outcrop polygons.
//!
//! Each simple intersection part becomes one [`GeologySegment`]. Segment
//! elevations are never sampled from the raster: every point takes the master
//! profile's interpolated value, and the master samples inside the part are
//! carried over so the trace lies exactly on the topography line.

use std::sync::Arc;

use xsection_core::attributes::label_for;
use xsection_core::{
    Diagnostic, GeologySegment, OutcropPolygon, ProfilePoint, Stage, TopographicProfile,
};
use xsection_geometry::{intersect_all, LinePart, Polygon, PreparedSection};

use crate::parallel::{ChunkCommand, ChunkOutput};

/// Shared, read-only context for geology chunks
#[derive(Debug, Clone)]
pub struct GeologyContext {
    pub section: Arc<PreparedSection>,
    pub topography: Arc<TopographicProfile>,
    /// Attribute holding the lithology label
    pub lithology_field: String,
}

/// Intersect one chunk of outcrop polygons with the section.
///
/// Polygons that fail validation are skipped with an error diagnostic. The
/// output keeps the chunk's polygon order, and each polygon's parts in
/// along-section order.
pub fn intersect_chunk(
    context: &GeologyContext,
    outcrops: &[OutcropPolygon],
) -> ChunkOutput<GeologySegment> {
    let mut output = ChunkOutput::default();

    let mut polygons: Vec<Polygon> = Vec::with_capacity(outcrops.len());
    let mut sources: Vec<&OutcropPolygon> = Vec::with_capacity(outcrops.len());
    for outcrop in outcrops {
        match Polygon::new(outcrop.exterior.clone(), outcrop.interiors.clone()) {
            Ok(polygon) => {
                polygons.push(polygon);
                sources.push(outcrop);
            }
            Err(err) => {
                tracing::warn!(feature = outcrop.id, error = %err, "Skipping invalid outcrop polygon");
                output.diagnostics.push(
                    Diagnostic::error(Stage::Geology, format!("invalid outcrop polygon: {}", err))
                        .with_subject(outcrop.id.to_string()),
                );
            }
        }
    }

    // One batch call over the whole chunk
    for (index, parts) in intersect_all(context.section.vertices(), &polygons) {
        let outcrop = sources[index];
        let lithology = label_for(&outcrop.attributes, &context.lithology_field);
        for (part_index, part) in parts.iter().enumerate() {
            let points = part_profile(&context.section, &context.topography, part);
            if points.len() < 2 {
                continue;
            }
            output.items.push(GeologySegment {
                feature_id: outcrop.id,
                part_index,
                lithology: lithology.clone(),
                points,
                attributes: outcrop.attributes.clone(),
            });
        }
    }

    tracing::debug!(
        polygons = outcrops.len(),
        segments = output.items.len(),
        skipped = output.diagnostics.len(),
        "Geology chunk intersected"
    );
    output
}

/// Build boxed chunk commands for the parallel coordinator
pub fn chunk_commands(
    context: &GeologyContext,
    chunks: Vec<Vec<OutcropPolygon>>,
) -> Vec<ChunkCommand<GeologySegment>> {
    chunks
        .into_iter()
        .map(|chunk| {
            let context = context.clone();
            let command: ChunkCommand<GeologySegment> =
                Box::new(move || Ok(intersect_chunk(&context, &chunk)));
            command
        })
        .collect()
}

/// Profile points for one intersection part.
///
/// Contacts and part vertices are located on the section; master samples
/// strictly between the contacts are inserted. All elevations come from the
/// master profile.
fn part_profile(
    section: &PreparedSection,
    topography: &TopographicProfile,
    part: &LinePart,
) -> Vec<ProfilePoint> {
    let mut distances: Vec<f64> = part
        .points
        .iter()
        .map(|p| section.distance_along(*p))
        .collect();

    // Parts follow the section direction; keep distances monotonic
    for i in 1..distances.len() {
        if distances[i] < distances[i - 1] {
            distances[i] = distances[i - 1];
        }
    }
    let (start, end) = (distances[0], distances[distances.len() - 1]);

    distances.extend(
        topography
            .points
            .iter()
            .map(|p| p.distance)
            .filter(|d| *d > start && *d < end),
    );
    distances.sort_by(|a, b| a.total_cmp(b));
    distances.dedup();

    distances
        .into_iter()
        .filter_map(|d| topography.interpolate(d).map(|z| ProfilePoint::new(d, z)))
        .collect()
}
