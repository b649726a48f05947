//! Boolean composition of a candidate polygon into the current shelf.
//!
//! [`Model::add_polygon`] dispatches on [`BooleanOpType`] and folds the
//! candidate against every eligible stored polygon. Eligibility is decided
//! by a bounding-box prefilter plus [`Polygon::classify_intersection`]:
//! polygons that merely touch never merge, mirrored and non-mirrored
//! polygons never combine, and open polygons are always plain-added.

use crate::float_types::Real;
use crate::float_types::parry3d::bounding_volume::BoundingVolume;
use crate::polygon::{IntersectionType, Polygon, PolygonFlags};

use super::Model;

/// How [`Model::add_polygon`] composes a candidate with existing geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOpType {
    /// Insert unconditionally; the caller has already resolved overlaps.
    Add,
    /// Fold the candidate into every overlapping coplanar polygon.
    Union,
    /// Clip existing polygons by the candidate; emptied ones are removed.
    SubtractAB,
    /// Clip the candidate by existing polygons and add the remainder;
    /// existing geometry is kept untouched.
    SubtractBA,
    /// Replace existing polygons by their overlap with the candidate;
    /// polygons the candidate never reaches are removed.
    Intersection,
    /// Cut the candidate along existing polygon boundaries and re-add every
    /// piece without removing coverage.
    Split,
    /// Keep the regions covered by exactly one of candidate and existing.
    ExclusiveOr,
}

// margin the overlap prefilter expands bounding boxes by
const QUERY_MARGIN: Real = 0.01;

impl Model {
    /// Compose `candidate` into the current shelf according to `op`.
    ///
    /// Open candidates are staged geometry from interactive drawing and are
    /// always inserted as-is. Returns `false` when the candidate is empty or
    /// a fold step degenerates; the shelf is left unchanged in that case.
    pub fn add_polygon(&mut self, candidate: Polygon, op: BooleanOpType) -> bool {
        if candidate.vertex_count() == 0 {
            return false;
        }
        if op == BooleanOpType::Add || candidate.is_open() {
            self.insert(candidate);
            return true;
        }

        let result = match op {
            BooleanOpType::Add => unreachable!("handled above"),
            BooleanOpType::Union => self.union_polygon(candidate),
            BooleanOpType::SubtractAB => self.subtract_polygon_ab(candidate),
            BooleanOpType::SubtractBA => self.subtract_polygon_ba(candidate),
            BooleanOpType::Intersection => self.intersect_polygon(candidate),
            BooleanOpType::Split => self.split_polygon(candidate),
            BooleanOpType::ExclusiveOr => self.exclusive_or_polygon(candidate),
        };
        if result {
            self.invalidate_bounds(Some(self.shelf()));
        }
        result
    }

    // Indices of current-shelf polygons eligible to combine with the
    // candidate: closed, matching mirror flag, bounding boxes overlapping
    // within a small margin.
    fn combination_candidates(&self, candidate: &Polygon) -> Vec<usize> {
        let mirrored = candidate.flags().contains(PolygonFlags::MIRRORED);
        let aabb = candidate
            .bounding_box()
            .loosened(QUERY_MARGIN);
        self.polygons()
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                !p.is_open()
                    && p.flags().contains(PolygonFlags::MIRRORED) == mirrored
                    && p.vertex_count() > 0
                    && aabb.intersects(&p.bounding_box())
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn remove_indices(&mut self, mut indices: Vec<usize>) {
        indices.sort_unstable_by(|a, b| b.cmp(a));
        for index in indices {
            self.remove_polygon(index);
        }
    }

    fn union_polygon(&mut self, candidate: Polygon) -> bool {
        let shelf = self.shelf().index();
        let mut merged = candidate.clone();
        let mut absorbed: Vec<usize> = Vec::new();

        for i in self.combination_candidates(&candidate) {
            let existing = &self.shelves[shelf][i];
            if Polygon::classify_intersection(existing, &candidate) == IntersectionType::None {
                continue;
            }
            if merged.union_with(existing) {
                absorbed.push(i);
            } else {
                return false;
            }
        }

        if !merged.is_valid() || merged.is_open() {
            return false;
        }
        self.remove_indices(absorbed);
        self.insert_separated(merged);
        true
    }

    fn subtract_polygon_ab(&mut self, candidate: Polygon) -> bool {
        let shelf = self.shelf().index();
        let mut clipped: Vec<(usize, Polygon)> = Vec::new();

        for i in self.combination_candidates(&candidate) {
            let existing = &self.shelves[shelf][i];
            if Polygon::classify_intersection(existing, &candidate)
                != IntersectionType::Intersection
            {
                continue;
            }
            let mut remainder = existing.clone();
            if remainder.subtract(&candidate) {
                clipped.push((i, remainder));
            }
        }

        if clipped.is_empty() {
            // nothing to carve: subtract-drawing on empty space inserts the
            // candidate as new geometry
            self.insert_separated(candidate);
            return true;
        }

        clipped.sort_by(|a, b| b.0.cmp(&a.0));
        for (index, remainder) in clipped {
            self.shelves[shelf].remove(index);
            self.insert_separated(remainder);
        }
        true
    }

    fn subtract_polygon_ba(&mut self, candidate: Polygon) -> bool {
        let shelf = self.shelf().index();
        let mut remainder = candidate.clone();

        for i in self.combination_candidates(&candidate) {
            if !remainder.is_valid() {
                break;
            }
            let existing = self.shelves[shelf][i].clone();
            remainder.subtract(&existing);
        }

        if remainder.is_valid() {
            self.insert_separated(remainder);
        }
        true
    }

    fn intersect_polygon(&mut self, candidate: Polygon) -> bool {
        let shelf = self.shelf().index();
        let mirrored = candidate.flags().contains(PolygonFlags::MIRRORED);
        let mut any_overlap = false;

        let polygons = core::mem::take(&mut self.shelves[shelf]);
        let mut kept: Vec<Polygon> = Vec::new();
        let mut replaced: Vec<Polygon> = Vec::new();
        for mut existing in polygons {
            let combinable = !existing.is_open()
                && existing.flags().contains(PolygonFlags::MIRRORED) == mirrored;
            if !combinable {
                kept.push(existing);
                continue;
            }
            if existing.intersect(&candidate, true) {
                any_overlap = true;
                if existing.is_valid() {
                    replaced.push(existing);
                }
            }
            // polygons the candidate never reaches, and ones reduced to a
            // shared boundary, drop out of the shelf entirely
        }

        self.shelves[shelf] = kept;
        for polygon in replaced {
            self.insert_separated(polygon);
        }
        if !any_overlap {
            self.insert_separated(candidate);
        }
        true
    }

    fn split_polygon(&mut self, candidate: Polygon) -> bool {
        let shelf = self.shelf().index();
        let mut spanned_indices: Vec<usize> = Vec::new();

        for i in self.combination_candidates(&candidate) {
            let existing = &self.shelves[shelf][i];
            if Polygon::classify_intersection(existing, &candidate)
                == IntersectionType::Intersection
            {
                spanned_indices.push(i);
            }
        }

        if spanned_indices.is_empty() {
            self.insert(candidate);
            return true;
        }

        let spanned: Vec<Polygon> = spanned_indices
            .iter()
            .map(|&i| self.shelves[shelf][i].clone())
            .collect();

        // the part of the candidate outside all spanned polygons
        let mut entered = candidate.clone();
        for polygon in &spanned {
            if !entered.subtract(polygon) {
                break;
            }
        }

        // per spanned polygon: the piece shared with the candidate and the
        // piece the candidate leaves behind
        let mut intersected: Vec<Polygon> = Vec::new();
        let mut subtracted: Vec<Polygon> = Vec::new();
        for polygon in &spanned {
            let mut shared = polygon.clone();
            if shared.intersect(&candidate, true) {
                intersected.push(shared);
            }
            let mut rest = polygon.clone();
            if !rest.subtract(&candidate) {
                return false;
            }
            subtracted.push(rest);
        }

        self.remove_indices(spanned_indices);
        for polygon in subtracted {
            self.insert_separated(polygon);
        }
        for polygon in intersected {
            self.insert_separated(polygon);
        }
        if entered.is_valid() {
            self.insert_separated(entered);
        }
        true
    }

    fn exclusive_or_polygon(&mut self, candidate: Polygon) -> bool {
        let shelf = self.shelf().index();
        let mut overlapped: Vec<usize> = Vec::new();
        let mut touched: Vec<usize> = Vec::new();

        for i in self.combination_candidates(&candidate) {
            let existing = &self.shelves[shelf][i];
            if !existing.plane().is_equivalent(candidate.plane()) {
                continue;
            }
            match Polygon::classify_intersection(existing, &candidate) {
                IntersectionType::Intersection => overlapped.push(i),
                // a touched polygon already carrying bridge edges wraps a
                // hole the candidate continues into; treat it as overlapping
                IntersectionType::JustTouch if existing.has_bridge_edges() => {
                    overlapped.push(i);
                },
                IntersectionType::JustTouch => touched.push(i),
                IntersectionType::None => {},
            }
        }

        if overlapped.is_empty() {
            if touched.is_empty() {
                self.insert(candidate);
                return true;
            }
            // only neighbours: grow them around the candidate instead
            let mut merged = self.shelves[shelf][touched[0]].clone();
            if !merged.union_with(&candidate) {
                return false;
            }
            for &i in &touched[1..] {
                let other = self.shelves[shelf][i].clone();
                merged.union_with(&other);
            }
            self.remove_indices(touched);
            self.insert_separated(merged);
            return true;
        }

        let replicas: Vec<Polygon> = overlapped
            .iter()
            .map(|&i| self.shelves[shelf][i].clone())
            .collect();

        if replicas.len() == 1 && candidate.includes_all_edges(&replicas[0]) {
            // the candidate swallows the one polygon it overlaps: what is
            // left of the candidate replaces it, facing the other way
            self.remove_indices(overlapped);
            let mut leftover = candidate.clone();
            leftover.subtract(&replicas[0]);
            if leftover.is_valid() {
                leftover.flip();
                self.insert_separated(leftover);
            }
            return true;
        }

        self.remove_indices(overlapped);
        for (i, original) in replicas.iter().enumerate() {
            if candidate.includes_all_edges(original) {
                continue;
            }

            let mut piece = candidate.clone();
            for (k, other) in replicas.iter().enumerate() {
                if i != k {
                    piece.subtract(other);
                }
            }

            let mut carved = original.clone();
            carved.subtract(&piece);
            if carved.is_valid() {
                self.insert_separated(carved);
            }

            piece.subtract(original);
            if piece.is_valid() {
                piece.flip();
                self.insert_separated(piece);
            }
        }
        true
    }
}
