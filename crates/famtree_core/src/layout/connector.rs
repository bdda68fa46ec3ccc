//! Connector geometry between placed nodes.
//!
//! All connectors are orthogonal polylines, except the single-parent link
//! which is one straight segment.

use crate::model::geometry::Point;
use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};

/// Axis-aligned node rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    pub top_left: Point,
    pub width: f64,
    pub height: f64,
}

impl NodeBox {
    pub fn top_center(&self) -> Point {
        self.top_left.offset(self.width / 2.0, 0.0)
    }

    pub fn bottom_center(&self) -> Point {
        self.top_left.offset(self.width / 2.0, self.height)
    }

    pub fn center(&self) -> Point {
        self.top_left.offset(self.width / 2.0, self.height / 2.0)
    }

    /// Returns true when `point` lies inside or on the border.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.top_left.x
            && point.x <= self.top_left.x + self.width
            && point.y >= self.top_left.y
            && point.y <= self.top_left.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// True when `next` runs along the same axis-aligned line and direction.
    fn continues_into(&self, next: &Segment) -> bool {
        let horizontal = |s: &Segment| s.start.y == s.end.y;
        let vertical = |s: &Segment| s.start.x == s.end.x;
        if horizontal(self) && horizontal(next) {
            (self.end.x - self.start.x).signum() == (next.end.x - next.start.x).signum()
        } else if vertical(self) && vertical(next) {
            (self.end.y - self.start.y).signum() == (next.end.y - next.start.y).signum()
        } else {
            false
        }
    }
}

/// What a connector links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ConnectorKind {
    ParentChild { parent: PersonId, child: PersonId },
    /// Both parents, in mother-then-father order.
    Parents { parents: [PersonId; 2], child: PersonId },
    Spouses { a: PersonId, b: PersonId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub kind: ConnectorKind,
    pub segments: Vec<Segment>,
}

pub(crate) fn parent_child(parent: &NodeBox, child: &NodeBox) -> Vec<Segment> {
    polyline(&[parent.bottom_center(), child.top_center()])
}

/// Horizontal bar between the parents at their lowest bottom edge, then a
/// drop from its midpoint. An offset child turns the drop into an elbow.
///
/// A parent placed on a higher row gets a vertical stub down to the bar.
pub(crate) fn two_parents(first: &NodeBox, second: &NodeBox, child: &NodeBox) -> Vec<Segment> {
    let left = first.bottom_center();
    let right = second.bottom_center();
    let bar_y = left.y.max(right.y);
    let mid_x = (left.x + right.x) / 2.0;
    let target = child.top_center();

    let mut drop = vec![Point::new(mid_x, bar_y)];
    if (target.x - mid_x).abs() > f64::EPSILON {
        let knee_y = (bar_y + target.y) / 2.0;
        drop.push(Point::new(mid_x, knee_y));
        drop.push(Point::new(target.x, knee_y));
    }
    drop.push(target);

    let mut segments = polyline(&[
        left,
        Point::new(left.x, bar_y),
        Point::new(right.x, bar_y),
        right,
    ]);
    segments.extend(polyline(&drop));
    segments
}

/// Three-segment elbow between node centers.
pub(crate) fn spouses(a: &NodeBox, b: &NodeBox) -> Vec<Segment> {
    let from = a.center();
    let to = b.center();
    let mid_x = (from.x + to.x) / 2.0;
    polyline(&[
        from,
        Point::new(mid_x, from.y),
        Point::new(mid_x, to.y),
        to,
    ])
}

/// Joins `points` into segments, dropping zero-length legs and merging
/// consecutive legs that continue in the same direction.
fn polyline(points: &[Point]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::with_capacity(points.len().saturating_sub(1));
    for pair in points.windows(2) {
        let next = Segment::new(pair[0], pair[1]);
        if next.is_degenerate() {
            continue;
        }
        match segments.last_mut() {
            Some(last) if last.end == next.start && last.continues_into(&next) => {
                last.end = next.end;
            }
            _ => segments.push(next),
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::{polyline, spouses, two_parents, NodeBox, Segment};
    use crate::model::geometry::Point;

    fn node(x: f64, y: f64) -> NodeBox {
        NodeBox {
            top_left: Point::new(x, y),
            width: 120.0,
            height: 60.0,
        }
    }

    #[test]
    fn spouses_on_same_row_are_one_straight_segment() {
        let segments = spouses(&node(50.0, 50.0), &node(180.0, 50.0));
        assert_eq!(
            segments,
            vec![Segment::new(Point::new(110.0, 80.0), Point::new(240.0, 80.0))]
        );
    }

    #[test]
    fn spouses_on_different_rows_keep_the_elbow() {
        let segments = spouses(&node(50.0, 50.0), &node(180.0, 210.0));
        assert_eq!(
            segments,
            vec![
                Segment::new(Point::new(110.0, 80.0), Point::new(175.0, 80.0)),
                Segment::new(Point::new(175.0, 80.0), Point::new(175.0, 240.0)),
                Segment::new(Point::new(175.0, 240.0), Point::new(240.0, 240.0)),
            ]
        );
    }

    #[test]
    fn backtracking_legs_are_not_merged() {
        let segments = polyline(&[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(4.0, 0.0),
        ]);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn offset_child_gets_an_elbow_drop() {
        let segments = two_parents(&node(50.0, 50.0), &node(180.0, 50.0), &node(300.0, 210.0));
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[1].start, Point::new(175.0, 110.0));
        assert_eq!(segments[1].end, Point::new(175.0, 160.0));
        assert_eq!(segments[3].end, Point::new(360.0, 210.0));
    }
}
