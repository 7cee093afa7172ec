//! The chunk data type: one candidate or realized tool motion segment.
//!
//! A [`ChunkBuilder`] accumulates points while a pattern or the layer
//! sampler is producing them; it is finalized exactly once into the
//! array-backed [`Chunk`] that all later processing mutates in place.
//!
//! Chunks form a collection owned by the caller; cut-order relations are
//! expressed as indices ([`ChunkId`]) into that collection, never as
//! owning pointers, so the hierarchy can only encode scheduling order.

use std::collections::VecDeque;

use tracing::trace;

use crate::geom::{self, Point, Rotation};
use crate::movement::MovementPolicy;

/// Index of a chunk within its owning collection.
pub type ChunkId = usize;

/// Points closer than this squared distance to their predecessor are
/// duplicates; they would break downstream direction computations.
pub const DEDUPE_EPSILON_SQ: f64 = 1e-9;

/// Append-friendly accumulator for a chunk under construction.
///
/// Backed by deques so pattern generators can extend either end in O(1).
#[derive(Debug, Clone, Default)]
pub struct ChunkBuilder {
    points: VecDeque<Point>,
    start_points: VecDeque<Point>,
    end_points: VecDeque<Point>,
    rotations: VecDeque<Rotation>,
    closed: bool,
}

impl ChunkBuilder {
    /// Creates an empty open builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the path as a loop (first and last points coincide).
    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    /// True if the path is a loop.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Appends a 3-axis point.
    pub fn push(&mut self, p: Point) {
        self.points.push_back(p);
    }

    /// Prepends a 3-axis point.
    pub fn push_front(&mut self, p: Point) {
        self.points.push_front(p);
    }

    /// Appends a multi-axis sample: the tool sweeps `start -> end` while
    /// the machine orientation equals `rotation`.
    pub fn push_sample(&mut self, p: Point, start: Point, end: Point, rotation: Rotation) {
        self.points.push_back(p);
        self.start_points.push_back(start);
        self.end_points.push_back(end);
        self.rotations.push_back(rotation);
    }

    /// Appends all points from an iterator.
    pub fn extend(&mut self, points: impl IntoIterator<Item = Point>) {
        self.points.extend(points);
    }

    /// Number of points accumulated so far.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no points have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when multi-axis parallel arrays are present.
    pub fn is_multi_axis(&self) -> bool {
        !self.rotations.is_empty()
    }

    /// Point at index `i`.
    pub fn point_at(&self, i: usize) -> &Point {
        &self.points[i]
    }

    /// Sweep endpoints at index `i` for multi-axis builders.
    pub fn sweep_at(&self, i: usize) -> Option<(&Point, &Point)> {
        match (self.start_points.get(i), self.end_points.get(i)) {
            (Some(s), Some(e)) => Some((s, e)),
            _ => None,
        }
    }

    /// Orientation at index `i` for multi-axis builders.
    pub fn rotation_at(&self, i: usize) -> Option<&Rotation> {
        self.rotations.get(i)
    }

    /// True when the multi-axis arrays are absent or parallel the point
    /// sequence. Mixing `push` and `push_sample` breaks this.
    pub fn axes_consistent(&self) -> bool {
        self.rotations.is_empty()
            || (self.rotations.len() == self.points.len()
                && self.start_points.len() == self.points.len()
                && self.end_points.len() == self.points.len())
    }

    /// Converts the builder into an immutable-layout chunk tagged with the
    /// depth layer it was sampled for.
    ///
    /// The parallel arrays must either be empty or match the point count.
    pub fn finalize(self, z_start: f64, z_end: f64) -> Chunk {
        debug_assert!(
            self.axes_consistent(),
            "multi-axis arrays must parallel the point sequence"
        );
        Chunk {
            points: self.points.into(),
            closed: self.closed,
            start_points: self.start_points.into(),
            end_points: self.end_points.into(),
            rotations: self.rotations.into(),
            z_start,
            z_end,
            length: None,
            parents: Vec::new(),
            children: Vec::new(),
            sorted: false,
        }
    }
}

/// One finalized 3D polyline with cut-order metadata: the unit of
/// scheduling for the whole engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    points: Vec<Point>,
    /// True if first and last points coincide (e.g. a pocket contour).
    pub closed: bool,
    start_points: Vec<Point>,
    end_points: Vec<Point>,
    rotations: Vec<Rotation>,
    /// Top of the depth layer this chunk was sampled for.
    pub z_start: f64,
    /// Bottom of the depth layer this chunk was sampled for.
    pub z_end: f64,
    length: Option<f64>,
    /// Chunks that must be cut after this one.
    pub parents: Vec<ChunkId>,
    /// Chunks that must be cut before this one.
    pub children: Vec<ChunkId>,
    /// Set once the tour solver has placed this chunk; freezes its entry
    /// point against further adaptation.
    pub sorted: bool,
}

impl Chunk {
    /// Creates a 3-axis chunk directly from points.
    pub fn from_points(points: Vec<Point>, closed: bool, z_start: f64, z_end: f64) -> Self {
        Self {
            points,
            closed,
            start_points: Vec::new(),
            end_points: Vec::new(),
            rotations: Vec::new(),
            z_start,
            z_end,
            length: None,
            parents: Vec::new(),
            children: Vec::new(),
            sorted: false,
        }
    }

    /// The point sequence in motion order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Mutable access to the points; invalidates the cached length.
    pub fn points_mut(&mut self) -> &mut Vec<Point> {
        self.length = None;
        &mut self.points
    }

    /// Sweep start points (empty for 3-axis chunks).
    pub fn start_points(&self) -> &[Point] {
        &self.start_points
    }

    /// Sweep end points (empty for 3-axis chunks).
    pub fn end_points(&self) -> &[Point] {
        &self.end_points
    }

    /// Machine orientations (empty for 3-axis chunks).
    pub fn rotations(&self) -> &[Rotation] {
        &self.rotations
    }

    /// True when multi-axis parallel arrays are present.
    pub fn is_multi_axis(&self) -> bool {
        !self.rotations.is_empty()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the chunk has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First point in motion order.
    pub fn first_point(&self) -> Option<&Point> {
        self.points.first()
    }

    /// Last point in motion order.
    pub fn last_point(&self) -> Option<&Point> {
        self.points.last()
    }

    /// Appends a point.
    pub fn append(&mut self, p: Point) {
        self.length = None;
        self.points.push(p);
    }

    /// Inserts a point at `index`.
    pub fn insert(&mut self, index: usize, p: Point) {
        self.length = None;
        self.points.insert(index, p);
    }

    /// Appends all points from an iterator.
    pub fn extend(&mut self, points: impl IntoIterator<Item = Point>) {
        self.length = None;
        self.points.extend(points);
    }

    /// Appends a multi-axis sample, keeping the parallel arrays in step.
    pub fn append_sample(&mut self, p: Point, start: Point, end: Point, rotation: Rotation) {
        self.length = None;
        self.points.push(p);
        self.start_points.push(start);
        self.end_points.push(end);
        self.rotations.push(rotation);
    }

    /// Reverses motion order; all parallel arrays reverse in lockstep.
    pub fn reverse(&mut self) {
        self.points.reverse();
        self.start_points.reverse();
        self.end_points.reverse();
        self.rotations.reverse();
    }

    /// Drops points within [`DEDUPE_EPSILON_SQ`] of the previously kept
    /// point. Returns the number of points removed.
    ///
    /// Comparing against the last *kept* point makes the operation
    /// idempotent: after one pass every surviving pair is separated by
    /// more than the tolerance.
    pub fn dedupe_points(&mut self) -> usize {
        if self.points.len() < 2 {
            return 0;
        }
        let mut keep = vec![true; self.points.len()];
        let mut last_kept = 0;
        for i in 1..self.points.len() {
            if geom::dist_sq(&self.points[i], &self.points[last_kept]) <= DEDUPE_EPSILON_SQ {
                keep[i] = false;
            } else {
                last_kept = i;
            }
        }
        let before = self.points.len();
        self.retain_indices(&keep);
        let removed = before - self.points.len();
        if removed > 0 {
            trace!(removed, kept = self.points.len(), "duplicate points dropped");
        }
        removed
    }

    /// Keeps only points whose mask entry is true, filtering the parallel
    /// arrays in lockstep.
    pub fn retain_indices(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.points.len());
        self.length = None;
        let mut it = keep.iter();
        self.points.retain(|_| *it.next().unwrap());
        if !self.rotations.is_empty() {
            let mut it = keep.iter();
            self.start_points.retain(|_| *it.next().unwrap());
            let mut it = keep.iter();
            self.end_points.retain(|_| *it.next().unwrap());
            let mut it = keep.iter();
            self.rotations.retain(|_| *it.next().unwrap());
        }
    }

    /// Translates every point (and sweep endpoints) by the given offsets.
    pub fn shift(&mut self, dx: f64, dy: f64, dz: f64) {
        self.length = None;
        let d = Rotation::new(dx, dy, dz);
        for p in &mut self.points {
            *p += d;
        }
        for p in &mut self.start_points {
            *p += d;
        }
        for p in &mut self.end_points {
            *p += d;
        }
    }

    /// Offsets every point's Z.
    pub fn offset_z(&mut self, dz: f64) {
        self.shift(0.0, 0.0, dz);
    }

    /// Forces every point to the given Z.
    pub fn set_z(&mut self, z: f64) {
        self.length = None;
        for p in &mut self.points {
            p.z = z;
        }
    }

    /// Clamps every point's Z to at least `min_z`.
    pub fn clamp_z(&mut self, min_z: f64) {
        self.length = None;
        for p in &mut self.points {
            if p.z < min_z {
                p.z = min_z;
            }
        }
    }

    /// Clamps every point's Z to at most `max_z`.
    pub fn clamp_max_z(&mut self, max_z: f64) {
        self.length = None;
        for p in &mut self.points {
            if p.z > max_z {
                p.z = max_z;
            }
        }
    }

    /// Deep-copies the point data. Hierarchy ids are copied as-is: they
    /// still address the original collection, so callers must re-link if
    /// the copy needs independent scheduling.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Total 3D polyline length, cached until the next point mutation.
    pub fn get_length(&mut self) -> f64 {
        if let Some(len) = self.length {
            return len;
        }
        let len = self
            .points
            .windows(2)
            .map(|w| geom::dist(&w[0], &w[1]))
            .sum();
        self.length = Some(len);
        len
    }

    /// Planar length of the polyline (never cached; cheap enough for the
    /// ramp post-processors that need it).
    pub fn xy_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| geom::dist_xy(&w[0], &w[1]))
            .sum()
    }

    /// Planar gap between this chunk's end and another chunk's start.
    pub fn xy_gap_to(&self, next: &Chunk) -> f64 {
        match (self.last_point(), next.first_point()) {
            (Some(a), Some(b)) => geom::dist_xy(a, b),
            _ => f64::INFINITY,
        }
    }

    /// Planar distance from an external position to the nearest usable
    /// entry of this chunk: the closer of the two ends for open chunks
    /// under meander movement, the single start otherwise, and the nearest
    /// loop point for closed chunks.
    pub fn distance(&self, pos: &Point, policy: &MovementPolicy) -> f64 {
        if self.points.is_empty() {
            return f64::INFINITY;
        }
        if self.closed {
            return self
                .points
                .iter()
                .map(|p| geom::dist_xy(pos, p))
                .fold(f64::INFINITY, f64::min);
        }
        let d_start = geom::dist_xy(pos, &self.points[0]);
        if policy.free_entry() {
            let d_end = geom::dist_xy(pos, &self.points[self.points.len() - 1]);
            d_start.min(d_end)
        } else {
            d_start
        }
    }

    /// Rotates a closed chunk's point order so it starts at the loop point
    /// nearest `pos`, or reverses an open chunk when meander movement
    /// allows it and the far end is closer.
    ///
    /// Side effect on motion order; a no-op once the chunk is `sorted`.
    pub fn adapt_distance(&mut self, pos: &Point, policy: &MovementPolicy) {
        if self.sorted || self.points.len() < 2 {
            return;
        }
        if self.closed {
            self.rotate_start_to_nearest(pos);
        } else if policy.free_entry() {
            let d_start = geom::dist_xy(pos, &self.points[0]);
            let d_end = geom::dist_xy(pos, &self.points[self.points.len() - 1]);
            if d_end < d_start {
                self.reverse();
            }
        }
    }

    /// Rotates the loop so the vertex nearest `pos` comes first, keeping
    /// the closing duplicate (if any) consistent.
    fn rotate_start_to_nearest(&mut self, pos: &Point) {
        self.length = None;
        let n = self.points.len();
        let explicit_close = n > 1 && geom::dist_sq(&self.points[0], &self.points[n - 1]) <= DEDUPE_EPSILON_SQ;
        let loop_len = if explicit_close { n - 1 } else { n };
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, p) in self.points[..loop_len].iter().enumerate() {
            let d = geom::dist_xy(pos, p);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        if best == 0 {
            return;
        }
        if explicit_close {
            self.points.pop();
            self.start_points.pop();
            self.end_points.pop();
            self.rotations.pop();
        }
        self.points.rotate_left(best);
        let n_starts = self.start_points.len();
        self.start_points.rotate_left(best.min(n_starts));
        let n_ends = self.end_points.len();
        self.end_points.rotate_left(best.min(n_ends));
        let n_rots = self.rotations.len();
        self.rotations.rotate_left(best.min(n_rots));
        if explicit_close {
            self.points.push(self.points[0]);
            if !self.rotations.is_empty() {
                self.start_points.push(self.start_points[0]);
                self.end_points.push(self.end_points[0]);
                self.rotations.push(self.rotations[0]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::MillingType;

    fn open_chunk(points: &[(f64, f64, f64)]) -> Chunk {
        Chunk::from_points(
            points.iter().map(|&(x, y, z)| Point::new(x, y, z)).collect(),
            false,
            0.0,
            -1.0,
        )
    }

    #[test]
    fn test_builder_finalize() {
        let mut b = ChunkBuilder::new();
        b.push(Point::new(0.0, 0.0, 0.0));
        b.push(Point::new(1.0, 0.0, 0.0));
        b.push_front(Point::new(-1.0, 0.0, 0.0));
        let chunk = b.finalize(0.0, -2.0);
        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.first_point().unwrap().x, -1.0);
        assert_eq!(chunk.z_end, -2.0);
    }

    #[test]
    fn test_dedupe_removes_duplicates() {
        let mut c = open_chunk(&[
            (0.0, 0.0, 0.0),
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (2.0, 0.0, 0.0),
        ]);
        assert_eq!(c.dedupe_points(), 2);
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn test_dedupe_idempotent() {
        let mut c = open_chunk(&[
            (0.0, 0.0, 0.0),
            (1e-6, 0.0, 0.0),
            (2e-6, 0.0, 0.0),
            (1.0, 0.0, 0.0),
        ]);
        c.dedupe_points();
        let snapshot = c.clone();
        assert_eq!(c.dedupe_points(), 0);
        assert_eq!(c, snapshot);
    }

    #[test]
    fn test_reverse_round_trip() {
        let mut c = open_chunk(&[(0.0, 0.0, 0.0), (1.0, 2.0, -1.0), (3.0, 1.0, -2.0)]);
        let original = c.clone();
        c.reverse();
        assert_ne!(c, original);
        c.reverse();
        assert_eq!(c, original);
    }

    #[test]
    fn test_length_cache_invalidation() {
        let mut c = open_chunk(&[(0.0, 0.0, 0.0), (3.0, 4.0, 0.0)]);
        assert!((c.get_length() - 5.0).abs() < 1e-12);
        c.append(Point::new(3.0, 4.0, 12.0));
        assert!((c.get_length() - 17.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_meander_uses_closer_end() {
        let c = open_chunk(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)]);
        let pos = Point::new(10.0, 1.0, 0.0);
        let mut policy = MovementPolicy::default();
        assert!((c.distance(&pos, &policy) - 10.05).abs() < 0.01);
        policy.milling = MillingType::Meander;
        assert!((c.distance(&pos, &policy) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_adapt_distance_reverses_open_chunk() {
        let mut c = open_chunk(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)]);
        let mut policy = MovementPolicy::default();
        policy.milling = MillingType::Meander;
        c.adapt_distance(&Point::new(11.0, 0.0, 0.0), &policy);
        assert_eq!(c.first_point().unwrap().x, 10.0);
    }

    #[test]
    fn test_adapt_distance_rotates_closed_chunk() {
        let mut c = Chunk::from_points(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(1.0, 1.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
                Point::new(0.0, 0.0, 0.0),
            ],
            true,
            0.0,
            -1.0,
        );
        c.adapt_distance(&Point::new(1.1, 1.1, 0.0), &MovementPolicy::default());
        assert_eq!(c.len(), 5);
        assert_eq!(*c.first_point().unwrap(), Point::new(1.0, 1.0, 0.0));
        assert_eq!(c.first_point().unwrap(), c.last_point().unwrap());
    }

    #[test]
    fn test_adapt_distance_gated_by_sorted() {
        let mut c = open_chunk(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)]);
        c.sorted = true;
        let mut policy = MovementPolicy::default();
        policy.milling = MillingType::Meander;
        c.adapt_distance(&Point::new(11.0, 0.0, 0.0), &policy);
        assert_eq!(c.first_point().unwrap().x, 0.0);
    }

    #[test]
    fn test_clamp_z() {
        let mut c = open_chunk(&[(0.0, 0.0, -5.0), (1.0, 0.0, -0.5)]);
        c.clamp_z(-1.0);
        assert_eq!(c.points()[0].z, -1.0);
        assert_eq!(c.points()[1].z, -0.5);
        c.clamp_max_z(-0.8);
        assert_eq!(c.points()[1].z, -0.8);
    }

    #[test]
    fn test_adapt_distance_rotates_multi_axis_arrays_in_lockstep() {
        // Closed multi-axis loop with an explicit closing duplicate; the
        // rotation must carry all four parallel arrays together.
        let mut b = ChunkBuilder::new();
        b.set_closed(true);
        let corners = [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)];
        for (i, &(x, y)) in corners.iter().enumerate() {
            let p = Point::new(x, y, -1.0);
            b.push_sample(p, p, Point::new(x, y, -2.0), Rotation::new(0.0, 0.1 * i as f64, 0.0));
        }
        let mut c = b.finalize(0.0, -1.0);
        c.adapt_distance(&Point::new(2.1, 2.1, 0.0), &MovementPolicy::default());
        assert_eq!(c.len(), 5);
        assert_eq!(*c.first_point().unwrap(), Point::new(2.0, 2.0, -1.0));
        assert_eq!(c.first_point().unwrap(), c.last_point().unwrap());
        // Parallel arrays rotated with the points and re-closed.
        assert_eq!(c.start_points()[0], Point::new(2.0, 2.0, -1.0));
        assert_eq!(c.end_points()[0], Point::new(2.0, 2.0, -2.0));
        assert!((c.rotations()[0].y - 0.2).abs() < 1e-12);
        assert_eq!(c.rotations()[0], c.rotations()[4]);
    }

    #[test]
    fn test_multi_axis_reverse_lockstep() {
        let mut b = ChunkBuilder::new();
        for i in 0..3 {
            let p = Point::new(i as f64, 0.0, 0.0);
            b.push_sample(p, p, Point::new(i as f64, 0.0, -1.0), Rotation::new(0.0, 0.1 * i as f64, 0.0));
        }
        let mut c = b.finalize(0.0, -1.0);
        c.reverse();
        assert_eq!(c.points()[0].x, 2.0);
        assert!((c.rotations()[0].y - 0.2).abs() < 1e-12);
        assert_eq!(c.end_points()[2].z, -1.0);
    }
}
