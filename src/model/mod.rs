//! The owning polygon collection behind one editable brush.
//!
//! A `Model` keeps its polygons on a small fixed number of shelves: shelf
//! [`ShelfId::Base`] holds committed geometry, [`ShelfId::Scratch`] stages
//! the uncommitted result of an in-progress edit gesture. Exactly one shelf
//! is current at a time and every mutation and query applies to it;
//! switching shelves redirects, it never copies. Boolean composition against
//! the stored polygons is dispatched through
//! [`Model::add_polygon`](crate::model::Model::add_polygon), spatial picking
//! lives in [`query`].

mod compose;
mod query;

pub use compose::BooleanOpType;
pub use query::{OppositeDirection, PolygonRelation};

use crate::float_types::Real;
use crate::float_types::parry3d::bounding_volume::{Aabb, BoundingVolume};
use crate::plane::Plane;
use crate::polygon::{Polygon, SeparateMode};
use nalgebra::{Matrix4, Vector3};
use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

/// Number of parallel polygon buffers per model.
pub const SHELF_COUNT: usize = 2;

/// Selects which polygon buffer mutations and queries act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShelfId {
    /// Committed geometry.
    Base,
    /// Staging area for an in-progress edit gesture.
    Scratch,
}

impl ShelfId {
    pub const ALL: [ShelfId; SHELF_COUNT] = [ShelfId::Base, ShelfId::Scratch];

    pub const fn index(self) -> usize {
        match self {
            ShelfId::Base => 0,
            ShelfId::Scratch => 1,
        }
    }
}

/// Editing-mode flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelFlags(pub u32);

impl ModelFlags {
    /// Mirror editing is active; tools maintain mirrored counterparts.
    pub const MIRROR_EDITING: ModelFlags = ModelFlags(1);
    /// Drilling a face leaves a thin frame instead of removing it outright.
    pub const FRAME_REMAIN_AFTER_DRILL: ModelFlags = ModelFlags(2);

    pub const fn contains(self, other: ModelFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn with(self, other: ModelFlags) -> ModelFlags {
        ModelFlags(self.0 | other.0)
    }

    pub const fn without(self, other: ModelFlags) -> ModelFlags {
        ModelFlags(self.0 & !other.0)
    }
}

#[derive(Debug, Clone)]
struct UndoRecord {
    label: String,
    shelves: [Vec<Polygon>; SHELF_COUNT],
}

/// An ordered, owning polygon collection with shelf staging, boolean
/// composition dispatch, snapshot undo and spatial queries.
///
/// Models are exclusively owned by one editable object and deep-cloned on
/// duplication; polygons never refer back to the model holding them.
#[derive(Debug, Clone, Default)]
pub struct Model {
    shelves: [Vec<Polygon>; SHELF_COUNT],
    shelf: ShelfId,
    flags: ModelFlags,
    mirror_plane: Option<Plane>,
    undo_stack: Vec<UndoRecord>,
    bounds: [OnceLock<Option<Aabb>>; SHELF_COUNT],
}

impl Default for ShelfId {
    fn default() -> Self {
        ShelfId::Base
    }
}

/// Scoped shelf selection: restores the previously current shelf when
/// dropped, so temporary switches cannot leak.
pub struct ShelfGuard<'a> {
    model: &'a mut Model,
    previous: ShelfId,
}

impl Deref for ShelfGuard<'_> {
    type Target = Model;

    fn deref(&self) -> &Model {
        self.model
    }
}

impl DerefMut for ShelfGuard<'_> {
    fn deref_mut(&mut self) -> &mut Model {
        self.model
    }
}

impl Drop for ShelfGuard<'_> {
    fn drop(&mut self) {
        self.model.shelf = self.previous;
    }
}

impl Model {
    pub fn new() -> Model {
        Model::default()
    }

    pub const fn shelf(&self) -> ShelfId {
        self.shelf
    }

    pub fn set_shelf(&mut self, shelf: ShelfId) {
        self.shelf = shelf;
    }

    /// Switch to `shelf` for the guard's lifetime; the previous selection is
    /// restored on drop, early returns included.
    pub fn shelf_scope(&mut self, shelf: ShelfId) -> ShelfGuard<'_> {
        let previous = self.shelf;
        self.shelf = shelf;
        ShelfGuard {
            model: self,
            previous,
        }
    }

    /// Polygons on the current shelf, in insertion order.
    pub fn polygons(&self) -> &[Polygon] {
        &self.shelves[self.shelf.index()]
    }

    /// Polygons on a specific shelf.
    pub fn polygons_on(&self, shelf: ShelfId) -> &[Polygon] {
        &self.shelves[shelf.index()]
    }

    pub fn polygon(&self, index: usize) -> Option<&Polygon> {
        self.shelves[self.shelf.index()].get(index)
    }

    pub fn polygon_count(&self) -> usize {
        self.shelves[self.shelf.index()].len()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Polygon> {
        self.shelves[self.shelf.index()].iter()
    }

    pub fn is_empty(&self, shelf: ShelfId) -> bool {
        self.shelves[shelf.index()].is_empty()
    }

    pub fn has_closed_polygon(&self, shelf: ShelfId) -> bool {
        self.shelves[shelf.index()].iter().any(|p| !p.is_open())
    }

    /// The current shelf's closed polygons, the set rendering and export
    /// consume.
    pub fn get_polygon_list(&self) -> Vec<&Polygon> {
        self.shelves[self.shelf.index()]
            .iter()
            .filter(|p| !p.is_open())
            .collect()
    }

    /// Push `polygon` onto the current shelf unless an equivalent polygon is
    /// already there.
    pub fn insert(&mut self, mut polygon: Polygon) -> bool {
        if self.query_equivalent_polygon(&polygon).is_some() {
            return false;
        }
        polygon.update_uvs();
        self.shelves[self.shelf.index()].push(polygon);
        self.invalidate_bounds(Some(self.shelf));
        true
    }

    /// Insert a boolean result, landing multi-island polygons as one polygon
    /// per island. Invalid polygons are dropped.
    pub(crate) fn insert_separated(&mut self, polygon: Polygon) {
        if !polygon.is_valid() {
            return;
        }
        let islands = polygon.get_separated_polygons(SeparateMode::Islands);
        if islands.len() >= 2 {
            for island in islands {
                self.insert(island);
            }
        } else {
            self.insert(polygon);
        }
    }

    /// Index of a polygon on the current shelf enclosing the same region as
    /// `polygon`.
    pub fn query_equivalent_polygon(&self, polygon: &Polygon) -> Option<usize> {
        self.shelves[self.shelf.index()]
            .iter()
            .position(|existing| existing.is_equivalent(polygon))
    }

    pub fn remove_polygon(&mut self, index: usize) -> Option<Polygon> {
        let shelf = self.shelf.index();
        if index >= self.shelves[shelf].len() {
            return None;
        }
        self.invalidate_bounds(Some(self.shelf));
        Some(self.shelves[shelf].remove(index))
    }

    /// Remove the polygon equivalent to `polygon` from the current shelf.
    pub fn remove_equivalent(&mut self, polygon: &Polygon) -> bool {
        match self.query_equivalent_polygon(polygon) {
            Some(index) => self.remove_polygon(index).is_some(),
            None => false,
        }
    }

    pub fn replace(&mut self, index: usize, polygon: Polygon) {
        let shelf = self.shelf.index();
        if index < self.shelves[shelf].len() {
            self.shelves[shelf][index] = polygon;
            self.invalidate_bounds(Some(self.shelf));
        }
    }

    /// Remove every polygon from the current shelf.
    pub fn clear(&mut self) {
        self.shelves[self.shelf.index()].clear();
        self.invalidate_bounds(Some(self.shelf));
    }

    /// Remove every polygon from every shelf.
    pub fn clear_all(&mut self) {
        for shelf in &mut self.shelves {
            shelf.clear();
        }
        self.invalidate_bounds(None);
    }

    /// Transplant every polygon from `src` onto the end of `dst` and leave
    /// `src` empty. Used to commit a staged edit gesture.
    pub fn move_shelf(&mut self, src: ShelfId, dst: ShelfId) {
        if src == dst {
            return;
        }
        let moved = core::mem::take(&mut self.shelves[src.index()]);
        self.shelves[dst.index()].extend(moved);
        self.invalidate_bounds(None);
    }

    /// Capture a labeled snapshot of every shelf for later [`Model::undo`].
    pub fn record_undo(&mut self, label: &str) {
        self.undo_stack.push(UndoRecord {
            label: label.to_string(),
            shelves: self.shelves.clone(),
        });
    }

    /// Restore the most recent snapshot, returning its label.
    pub fn undo(&mut self) -> Option<String> {
        let record = self.undo_stack.pop()?;
        self.shelves = record.shelves;
        self.invalidate_bounds(None);
        Some(record.label)
    }

    /// Apply an affine transform to every polygon on every shelf.
    pub fn transform(&mut self, matrix: &Matrix4<Real>) {
        for shelf in &mut self.shelves {
            for polygon in shelf.iter_mut() {
                polygon.transform(matrix);
            }
        }
        self.invalidate_bounds(None);
    }

    /// Rigid translation of every polygon on every shelf.
    pub fn translate(&mut self, offset: &Vector3<Real>) {
        for shelf in &mut self.shelves {
            for polygon in shelf.iter_mut() {
                polygon.translate(offset);
            }
        }
        self.invalidate_bounds(None);
    }

    /// Bounds of one shelf, or of the whole model when `shelf` is `None`.
    /// `None` result means the queried shelves hold no geometry.
    pub fn bound_box(&self, shelf: Option<ShelfId>) -> Option<Aabb> {
        match shelf {
            Some(id) => self.shelf_bounds(id),
            None => {
                let mut merged: Option<Aabb> = None;
                for id in ShelfId::ALL {
                    if let Some(bounds) = self.shelf_bounds(id) {
                        merged = Some(match merged {
                            Some(acc) => acc.merged(&bounds),
                            None => bounds,
                        });
                    }
                }
                merged
            },
        }
    }

    fn shelf_bounds(&self, id: ShelfId) -> Option<Aabb> {
        *self.bounds[id.index()].get_or_init(|| {
            let polygons = &self.shelves[id.index()];
            let mut merged: Option<Aabb> = None;
            for polygon in polygons {
                if polygon.vertex_count() == 0 {
                    continue;
                }
                let bounds = polygon.bounding_box();
                merged = Some(match merged {
                    Some(acc) => acc.merged(&bounds),
                    None => bounds,
                });
            }
            merged
        })
    }

    pub(crate) fn invalidate_bounds(&mut self, shelf: Option<ShelfId>) {
        match shelf {
            Some(id) => self.bounds[id.index()] = OnceLock::new(),
            None => {
                for cell in &mut self.bounds {
                    *cell = OnceLock::new();
                }
            },
        }
    }

    /// Drop polygons that are neither valid nor open and land multi-island
    /// polygons as separate entries.
    pub fn optimize(&mut self) {
        let shelf = self.shelf.index();
        let polygons = core::mem::take(&mut self.shelves[shelf]);
        for polygon in polygons {
            if polygon.is_open() {
                self.shelves[shelf].push(polygon);
            } else {
                self.insert_separated(polygon);
            }
        }
        self.invalidate_bounds(Some(self.shelf));
    }

    /// Make the coverage of polygons sharing `plane` disjoint again after a
    /// boolean left them overlapping: later polygons are clipped by earlier
    /// ones, emptied polygons are dropped and islands are separated.
    pub fn separate_polygons(&mut self, plane: &Plane) {
        let shelf = self.shelf.index();
        let on_plane: Vec<usize> = self.shelves[shelf]
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_open() && p.is_valid() && p.plane().is_equivalent(plane))
            .map(|(i, _)| i)
            .collect();

        for (a_pos, &a) in on_plane.iter().enumerate() {
            for &b in &on_plane[a_pos + 1..] {
                let first = self.shelves[shelf][a].clone();
                let second = &mut self.shelves[shelf][b];
                if Polygon::classify_intersection(&first, second)
                    == crate::polygon::IntersectionType::Intersection
                {
                    second.subtract(&first);
                }
            }
        }

        let polygons = core::mem::take(&mut self.shelves[shelf]);
        for polygon in polygons {
            if polygon.plane().is_equivalent(plane) && !polygon.is_open() {
                self.insert_separated(polygon);
            } else {
                self.shelves[shelf].push(polygon);
            }
        }
        self.invalidate_bounds(Some(self.shelf));
    }

    /// Remove the polygon at `index`, or, when frames are kept after
    /// drilling, subtract an inset copy so a thin frame of the face remains.
    pub fn drill_polygon(&mut self, index: usize, remain_frame: bool) -> bool {
        let Some(polygon) = self.polygon(index) else {
            return false;
        };
        if remain_frame && self.flags.contains(ModelFlags::FRAME_REMAIN_AFTER_DRILL) {
            let mut frame = polygon.clone();
            frame.remove_inside();
            if frame.inset(0.1) {
                return self.add_polygon(frame, BooleanOpType::SubtractAB);
            }
        }
        self.remove_polygon(index).is_some()
    }

    pub const fn flags(&self) -> ModelFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ModelFlags) {
        self.flags = flags;
    }

    pub const fn mirror_plane(&self) -> Option<Plane> {
        self.mirror_plane
    }

    pub fn set_mirror_plane(&mut self, plane: Option<Plane>) {
        self.mirror_plane = plane;
    }
}
