//! A polygon-soup **brush modeling** core for level editors: planar polygons
//! with holes, a boolean composition algebra (*union*, *subtract*,
//! *intersect*, *split*, *exclusive-or*) folding candidate polygons into an
//! owning [`Model`], adjacency and intersection queries, and ear-cut
//! [decomposition](decompose) of polygons-with-holes into renderable
//! triangles.
//!
//! The library is a pure in-process geometry core: it never logs, never
//! panics on degenerate input, and reports every "invalid / not found"
//! outcome through sentinel values the caller checks.
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//! - **earcut**: use `geo`s `earcutr` feature for triangulation
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64

#![forbid(unsafe_code)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod decompose;
pub mod edge;
pub mod errors;
pub mod float_types;
pub mod model;
pub mod plane;
pub mod polygon;
pub mod shapes;
pub mod vertex;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

#[cfg(not(feature = "earcut"))]
compile_error!("The 'earcut' feature must be specified");

pub use decompose::TriangleMesh;
pub use model::{BooleanOpType, Model, ShelfId};
pub use plane::Plane;
pub use polygon::Polygon;
pub use vertex::Vertex;
