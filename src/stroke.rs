use egui::{Color32, Pos2};
use serde::{Deserialize, Serialize};

use crate::layer::BlendMode;

/// How the ends of each line piece are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

/// The paint used for every point of one stroke.
///
/// Captured once when a stroke begins; edits to the tool settings while the
/// pointer is down never reach points that are already being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color32,
    pub width: f32,
    pub cap: LineCap,
    pub blend_mode: BlendMode,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color32::BLACK,
            width: 4.0,
            cap: LineCap::Round,
            blend_mode: BlendMode::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressurePoint {
    pub position: Pos2,
    pub pressure: f32,
    pub style: StrokeStyle,
}

impl PressurePoint {
    pub fn new(position: Pos2, pressure: f32, style: StrokeStyle) -> Self {
        Self {
            position,
            pressure,
            style,
        }
    }
}

/// One entry of a drawing layer's point stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StrokeEntry {
    Point(PressurePoint),
    /// Ends the stroke before it and starts the next one
    Sentinel,
}

impl StrokeEntry {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, StrokeEntry::Sentinel)
    }

    pub fn as_point(&self) -> Option<&PressurePoint> {
        match self {
            StrokeEntry::Point(point) => Some(point),
            StrokeEntry::Sentinel => None,
        }
    }
}

/// A maximal run of points between two sentinels (or the stream ends)
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a>(&'a [StrokeEntry]);

impl<'a> Segment<'a> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Segments with fewer than two points draw nothing
    pub fn is_drawable(&self) -> bool {
        self.0.len() >= 2
    }

    pub fn points(self) -> impl Iterator<Item = &'a PressurePoint> + 'a {
        self.0.iter().filter_map(StrokeEntry::as_point)
    }

    pub fn positions(&self) -> Vec<Pos2> {
        self.points().map(|p| p.position).collect()
    }
}

/// Point stream of a drawing layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingContent {
    entries: Vec<StrokeEntry>,
}

impl DrawingContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<StrokeEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[StrokeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push_point(&mut self, point: PressurePoint) {
        self.entries.push(StrokeEntry::Point(point));
    }

    /// Terminates the open stroke, if there is one.
    ///
    /// Returns `false` when the stream is empty or already ends on a sentinel.
    pub fn end_stroke(&mut self) -> bool {
        match self.entries.last() {
            Some(StrokeEntry::Point(_)) => {
                self.entries.push(StrokeEntry::Sentinel);
                true
            }
            _ => false,
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> + '_ {
        self.entries
            .split(StrokeEntry::is_sentinel)
            .filter(|run| !run.is_empty())
            .map(Segment)
    }

    /// Replaces every point within `radius` of `center` with a sentinel.
    ///
    /// Strokes are split at the erased location, never shortened in place.
    /// Returns whether anything was touched.
    pub fn erase_at(&mut self, center: Pos2, radius: f32) -> bool {
        let mut changed = false;
        for entry in &mut self.entries {
            if let StrokeEntry::Point(point) = entry {
                if point.position.distance(center) <= radius {
                    *entry = StrokeEntry::Sentinel;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Whether [`erase_at`](Self::erase_at) would change anything
    pub fn any_within(&self, center: Pos2, radius: f32) -> bool {
        self.entries
            .iter()
            .filter_map(StrokeEntry::as_point)
            .any(|point| point.position.distance(center) <= radius)
    }

    /// Drops segments that can never render and collapses runs of sentinels.
    ///
    /// Rendering output is unchanged. Returns whether the stream shrank.
    pub fn compact(&mut self) -> bool {
        let before = self.entries.len();
        let mut compacted = Vec::with_capacity(before);
        for segment in self.segments().filter(Segment::is_drawable) {
            compacted.extend_from_slice(segment.0);
            compacted.push(StrokeEntry::Sentinel);
        }
        // Keep an open trailing stroke open.
        if matches!(self.entries.last(), Some(StrokeEntry::Point(_)))
            && self.segments().last().is_some_and(|s| s.is_drawable())
        {
            compacted.pop();
        }
        let changed = compacted != self.entries;
        self.entries = compacted;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn point(x: f32, y: f32) -> StrokeEntry {
        StrokeEntry::Point(PressurePoint::new(pos2(x, y), 1.0, StrokeStyle::default()))
    }

    #[test]
    fn test_single_segment_before_sentinel() {
        let content = DrawingContent::from_entries(vec![
            point(0.0, 0.0),
            point(1.0, 1.0),
            StrokeEntry::Sentinel,
        ]);
        let segments: Vec<_> = content.segments().map(|s| s.positions()).collect();
        assert_eq!(segments, vec![vec![pos2(0.0, 0.0), pos2(1.0, 1.0)]]);
    }

    #[test]
    fn test_sentinel_splits_segments() {
        let content = DrawingContent::from_entries(vec![
            point(0.0, 0.0),
            point(1.0, 1.0),
            StrokeEntry::Sentinel,
            point(5.0, 5.0),
        ]);
        let segments: Vec<_> = content.segments().map(|s| s.positions()).collect();
        assert_eq!(
            segments,
            vec![vec![pos2(0.0, 0.0), pos2(1.0, 1.0)], vec![pos2(5.0, 5.0)]]
        );
    }

    #[test]
    fn test_erase_splits_instead_of_deleting() {
        let mut content =
            DrawingContent::from_entries(vec![point(0.0, 0.0), point(10.0, 0.0), point(20.0, 0.0)]);
        assert!(content.erase_at(pos2(10.0, 0.0), 2.0));
        assert_eq!(content.len(), 3);
        assert_eq!(content.entries()[1], StrokeEntry::Sentinel);
        assert!(content.segments().all(|s| !s.is_drawable()));
    }

    #[test]
    fn test_erase_miss_leaves_content_untouched() {
        let mut content = DrawingContent::from_entries(vec![point(0.0, 0.0), point(10.0, 0.0)]);
        let before = content.clone();
        assert!(!content.erase_at(pos2(100.0, 100.0), 5.0));
        assert_eq!(content, before);
    }

    #[test]
    fn test_end_stroke_is_idempotent() {
        let mut content = DrawingContent::new();
        assert!(!content.end_stroke());
        content.push_point(PressurePoint::new(pos2(1.0, 1.0), 1.0, StrokeStyle::default()));
        assert!(content.end_stroke());
        assert!(!content.end_stroke());
        assert_eq!(content.len(), 2);
    }

    #[test]
    fn test_compact_drops_degenerate_runs() {
        let mut content = DrawingContent::from_entries(vec![
            point(0.0, 0.0),
            StrokeEntry::Sentinel,
            StrokeEntry::Sentinel,
            point(1.0, 1.0),
            point(2.0, 2.0),
            StrokeEntry::Sentinel,
            point(9.0, 9.0),
        ]);
        assert!(content.compact());
        assert_eq!(
            content.entries(),
            &[point(1.0, 1.0), point(2.0, 2.0), StrokeEntry::Sentinel]
        );
        assert!(!content.compact());
    }

    #[test]
    fn test_compact_keeps_open_stroke_open() {
        let mut content = DrawingContent::from_entries(vec![point(1.0, 1.0), point(2.0, 2.0)]);
        assert!(!content.compact());
        assert_eq!(content.len(), 2);
    }
}
