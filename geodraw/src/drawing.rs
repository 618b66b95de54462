//! Interactive drawing of project shapes from map taps.
//!
//! A [`DrawingSession`] collects tapped coordinates for one shape and turns
//! them into a finished [`Geometry`] when the operator confirms. Calls that do
//! not fit the current buffer (undo on an empty buffer, finishing too early,
//! anything after the session ended) are absorbed as no-ops.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Coordinate, Geometry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingMode {
    Point,
    Polyline,
    Polygon,
}

impl DrawingMode {
    /// Taps needed before the shape can be finished
    pub fn required_points(self) -> usize {
        match self {
            DrawingMode::Point => 1,
            DrawingMode::Polyline => 2,
            DrawingMode::Polygon => 3,
        }
    }
}

impl fmt::Display for DrawingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawingMode::Point => write!(f, "point"),
            DrawingMode::Polyline => write!(f, "polyline"),
            DrawingMode::Polygon => write!(f, "polygon"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingState {
    Empty,
    Accumulating,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone)]
enum Phase {
    Open,
    Finished(Geometry),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct DrawingSession {
    mode: DrawingMode,
    points: Vec<Coordinate>,
    phase: Phase,
}

impl DrawingSession {
    pub fn new(mode: DrawingMode) -> Self {
        Self {
            mode,
            points: Vec::new(),
            phase: Phase::Open,
        }
    }

    /// Open a new session pre-filled from a finished geometry.
    ///
    /// The closing vertex of a polygon ring is dropped so that finishing the
    /// session again yields the same polygon. A point gives an empty point session.
    pub fn reopen(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Point(_) => Self::new(DrawingMode::Point),
            Geometry::LineString(coords) => Self {
                points: coords.clone(),
                ..Self::new(DrawingMode::Polyline)
            },
            Geometry::Polygon(rings) => {
                let mut points = rings.first().cloned().unwrap_or_default();
                if points.len() > 1 && points.first() == points.last() {
                    points.pop();
                }
                Self {
                    points,
                    ..Self::new(DrawingMode::Polygon)
                }
            }
        }
    }

    /// Feed a list of taps, in order, through a fresh session.
    pub fn replay<I>(mode: DrawingMode, taps: I) -> Self
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut session = Self::new(mode);
        for tap in taps {
            session.add_point(tap);
        }
        session
    }

    pub fn mode(&self) -> DrawingMode {
        self.mode
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn state(&self) -> DrawingState {
        match self.phase {
            Phase::Open if self.points.is_empty() => DrawingState::Empty,
            Phase::Open => DrawingState::Accumulating,
            Phase::Finished(_) => DrawingState::Finished,
            Phase::Cancelled => DrawingState::Cancelled,
        }
    }

    /// The geometry emitted when the session finished, if it did
    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.phase {
            Phase::Finished(geometry) => Some(geometry),
            _ => None,
        }
    }

    /// Handle a map tap.
    ///
    /// In point mode the tap finishes the session immediately and the point is
    /// returned. Other modes append to the buffer and return `None`.
    pub fn add_point(&mut self, coord: Coordinate) -> Option<Geometry> {
        if !matches!(self.phase, Phase::Open) {
            return None;
        }
        match self.mode {
            DrawingMode::Point => Some(self.complete(Geometry::Point(coord))),
            DrawingMode::Polyline | DrawingMode::Polygon => {
                self.points.push(coord);
                None
            }
        }
    }

    /// Drop the most recent tap. Emptying the buffer does not cancel the session.
    pub fn undo(&mut self) {
        if matches!(self.phase, Phase::Open) {
            self.points.pop();
        }
    }

    pub fn can_finish(&self) -> bool {
        matches!(self.phase, Phase::Open)
            && self.mode != DrawingMode::Point
            && self.points.len() >= self.mode.required_points()
    }

    pub fn finish(&mut self) -> Option<Geometry> {
        if !self.can_finish() {
            return None;
        }
        let geometry = match self.mode {
            DrawingMode::Polygon => Geometry::polygon_from_vertices(&self.points),
            _ => Geometry::LineString(self.points.clone()),
        };
        Some(self.complete(geometry))
    }

    pub fn cancel(&mut self) {
        if matches!(self.phase, Phase::Open) {
            debug!("Drawing cancelled ({} mode, {} points discarded)", self.mode, self.points.len());
            self.points.clear();
            self.phase = Phase::Cancelled;
        }
    }

    /// The in-progress shape as the map layer draws it, without finishing.
    pub fn preview(&self) -> Option<Geometry> {
        if !matches!(self.phase, Phase::Open) {
            return None;
        }
        match (self.mode, self.points.len()) {
            (DrawingMode::Polygon, n) if n >= 3 => Some(Geometry::polygon_from_vertices(&self.points)),
            (DrawingMode::Polyline | DrawingMode::Polygon, n) if n >= 2 => {
                Some(Geometry::LineString(self.points.clone()))
            }
            _ => None,
        }
    }

    fn complete(&mut self, geometry: Geometry) -> Geometry {
        debug!("Drawing finished: {} with {} coordinates", geometry.kind(), geometry.coordinate_count());
        self.phase = Phase::Finished(geometry.clone());
        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taps(n: usize) -> Vec<Coordinate> {
        (0..n)
            .map(|i| Coordinate::new(-122.0 + i as f64 * 0.001, 37.0 + (i % 2) as f64 * 0.001))
            .collect()
    }

    #[test]
    fn test_point_mode_finishes_on_first_tap() {
        let mut session = DrawingSession::new(DrawingMode::Point);
        let tap = Coordinate::new(-122.4, 37.7);

        assert_eq!(session.add_point(tap), Some(Geometry::Point(tap)));
        assert_eq!(session.state(), DrawingState::Finished);
        assert!(session.points().is_empty());

        // Later taps are absorbed
        assert_eq!(session.add_point(Coordinate::new(0.0, 0.0)), None);
        assert_eq!(session.geometry(), Some(&Geometry::Point(tap)));
    }

    #[test]
    fn test_point_mode_never_finishable() {
        let mut session = DrawingSession::new(DrawingMode::Point);
        assert!(!session.can_finish());
        assert_eq!(session.finish(), None);
        assert_eq!(session.state(), DrawingState::Empty);
    }

    #[test]
    fn test_polyline_keeps_insertion_order() {
        for n in 2..6 {
            let points = taps(n);
            let mut session = DrawingSession::replay(DrawingMode::Polyline, points.clone());
            assert_eq!(session.state(), DrawingState::Accumulating);
            assert_eq!(session.finish(), Some(Geometry::LineString(points)));
            assert_eq!(session.state(), DrawingState::Finished);
        }
    }

    #[test]
    fn test_polygon_ring_is_closed() {
        for n in 3..7 {
            let points = taps(n);
            let mut session = DrawingSession::replay(DrawingMode::Polygon, points.clone());
            let Some(Geometry::Polygon(rings)) = session.finish() else {
                panic!("expected polygon for {} taps", n);
            };
            let ring = &rings[0];
            assert_eq!(ring.len(), n + 1);
            assert_eq!(&ring[..n], points.as_slice());
            assert_eq!(ring[0], ring[n]);
        }
    }

    #[test]
    fn test_finish_below_minimum_is_noop() {
        let mut line = DrawingSession::replay(DrawingMode::Polyline, taps(1));
        assert!(!line.can_finish());
        assert_eq!(line.finish(), None);
        assert_eq!(line.state(), DrawingState::Accumulating);
        assert_eq!(line.points().len(), 1);

        let mut polygon = DrawingSession::replay(DrawingMode::Polygon, taps(2));
        assert_eq!(polygon.finish(), None);
        assert_eq!(polygon.state(), DrawingState::Accumulating);
    }

    #[test]
    fn test_undo() {
        let mut session = DrawingSession::new(DrawingMode::Polygon);
        session.undo();
        assert_eq!(session.points().len(), 0);
        assert_eq!(session.state(), DrawingState::Empty);

        session.add_point(Coordinate::new(1.0, 1.0));
        session.add_point(Coordinate::new(2.0, 2.0));
        session.undo();
        assert_eq!(session.points(), &[Coordinate::new(1.0, 1.0)]);

        session.undo();
        // Emptied but still open
        assert_eq!(session.state(), DrawingState::Empty);
        session.add_point(Coordinate::new(3.0, 3.0));
        assert_eq!(session.state(), DrawingState::Accumulating);
    }

    #[test]
    fn test_cancel_discards_buffer() {
        let mut session = DrawingSession::replay(DrawingMode::Polyline, taps(4));
        session.cancel();
        assert_eq!(session.state(), DrawingState::Cancelled);
        assert!(session.points().is_empty());
        assert_eq!(session.finish(), None);
        assert_eq!(session.add_point(Coordinate::new(0.0, 0.0)), None);
        assert!(session.points().is_empty());
        assert!(session.geometry().is_none());
    }

    #[test]
    fn test_finished_session_ignores_edits() {
        let mut session = DrawingSession::replay(DrawingMode::Polyline, taps(2));
        let line = session.finish();
        assert!(line.is_some());

        session.undo();
        session.cancel();
        assert_eq!(session.state(), DrawingState::Finished);
        assert_eq!(session.geometry(), line.as_ref());
    }

    #[test]
    fn test_closing_vertex_is_a_copy() {
        let mut session = DrawingSession::replay(DrawingMode::Polygon, taps(3));
        let Some(Geometry::Polygon(mut rings)) = session.finish() else {
            panic!("expected polygon");
        };
        rings[0][0].latitude = 0.0;
        assert_eq!(rings[0][3], taps(3)[0]);
    }

    #[test]
    fn test_polygon_round_trip() {
        let mut first = DrawingSession::replay(DrawingMode::Polygon, taps(5));
        let polygon = first.finish().unwrap();

        let mut reopened = DrawingSession::reopen(&polygon);
        assert_eq!(reopened.mode(), DrawingMode::Polygon);
        assert_eq!(reopened.points().len(), 5);
        assert_eq!(reopened.finish(), Some(polygon));
    }

    #[test]
    fn test_reopen_line_and_point() {
        let line = Geometry::LineString(taps(3));
        let mut session = DrawingSession::reopen(&line);
        assert_eq!(session.mode(), DrawingMode::Polyline);
        assert_eq!(session.finish(), Some(line));

        let point = DrawingSession::reopen(&Geometry::Point(Coordinate::new(1.0, 2.0)));
        assert_eq!(point.mode(), DrawingMode::Point);
        assert_eq!(point.state(), DrawingState::Empty);
    }

    #[test]
    fn test_preview() {
        let mut session = DrawingSession::new(DrawingMode::Polygon);
        assert!(session.preview().is_none());

        session.add_point(Coordinate::new(0.0, 0.0));
        session.add_point(Coordinate::new(1.0, 0.0));
        assert!(matches!(session.preview(), Some(Geometry::LineString(ref c)) if c.len() == 2));

        session.add_point(Coordinate::new(1.0, 1.0));
        let preview = session.preview().unwrap();
        assert_eq!(preview.kind(), "Polygon");
        assert_eq!(preview.coordinate_count(), 4);
        // Previewing does not finish
        assert_eq!(session.state(), DrawingState::Accumulating);
    }

    #[test]
    fn test_required_points() {
        assert_eq!(DrawingMode::Point.required_points(), 1);
        assert_eq!(DrawingMode::Polyline.required_points(), 2);
        assert_eq!(DrawingMode::Polygon.required_points(), 3);
    }
}
