//! Plain-text summaries of GPX routes.
//!
//! The summary is what gets chunked and embedded for a GPX upload, so it is
//! written for a language model to read:
//!
//! ```text
//! GPX file: ride.gpx
//! Tracks: 1
//! Track 1: Morning Ride
//!   Segment 1: 3 points
//!     Start: (47.0, 8.0)
//!     End: (47.02, 8.0)
//!     Distance: 2.23 km
//!     Elevation gain: 50.0 m
//! ```

use std::fmt::Write;
use std::io::Cursor;

use gpx::{Gpx, TrackSegment, Waypoint};

use crate::IngestError;

/// Equatorial radius used for great-circle distances, in metres.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Parse a GPX document and render its track summary.
pub fn summarize_gpx(file_name: &str, bytes: &[u8]) -> Result<String, IngestError> {
    let doc = gpx::read(Cursor::new(bytes)).map_err(|e| IngestError::Gpx(e.to_string()))?;
    Ok(render_summary(file_name, &doc))
}

fn render_summary(file_name: &str, doc: &Gpx) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "GPX file: {file_name}");

    if doc.tracks.is_empty() {
        out.push_str("No tracks found.\n");
        return out;
    }

    let _ = writeln!(out, "Tracks: {}", doc.tracks.len());
    for (i, track) in doc.tracks.iter().enumerate() {
        let name = track.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Unnamed");
        let _ = writeln!(out, "Track {}: {}", i + 1, name);
        for (j, segment) in track.segments.iter().enumerate() {
            render_segment(&mut out, j + 1, segment);
        }
    }
    out
}

fn render_segment(out: &mut String, number: usize, segment: &TrackSegment) {
    let points = &segment.points;
    let _ = writeln!(out, "  Segment {}: {} points", number, points.len());

    let (Some(start), Some(end)) = (points.first(), points.last()) else {
        return;
    };
    let (start_lat, start_lon) = lat_lon(start);
    let (end_lat, end_lon) = lat_lon(end);
    // Debug formatting keeps a trailing ".0" on whole-degree coordinates.
    let _ = writeln!(out, "    Start: ({start_lat:?}, {start_lon:?})");
    let _ = writeln!(out, "    End: ({end_lat:?}, {end_lon:?})");
    let _ = writeln!(out, "    Distance: {:.2} km", length_3d(points) / 1000.0);
    let _ = writeln!(out, "    Elevation gain: {:.1} m", elevation_gain(points));
}

fn lat_lon(point: &Waypoint) -> (f64, f64) {
    let p = point.point();
    (p.y(), p.x())
}

/// Great-circle distance between two coordinates in metres.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Path length in metres, including vertical movement where both ends of a
/// leg carry an elevation.
fn length_3d(points: &[Waypoint]) -> f64 {
    points
        .windows(2)
        .map(|leg| {
            let (lat1, lon1) = lat_lon(&leg[0]);
            let (lat2, lon2) = lat_lon(&leg[1]);
            let flat = haversine_m(lat1, lon1, lat2, lon2);
            match (leg[0].elevation, leg[1].elevation) {
                (Some(a), Some(b)) => flat.hypot(b - a),
                _ => flat,
            }
        })
        .sum()
}

/// Sum of climbs between consecutive points that both have an elevation.
fn elevation_gain(points: &[Waypoint]) -> f64 {
    points
        .windows(2)
        .filter_map(|leg| match (leg[0].elevation, leg[1].elevation) {
            (Some(a), Some(b)) => Some((b - a).max(0.0)),
            _ => None,
        })
        .sum()
}
