//! # Pipenet-Kernel
//!
//! CAD kernel boundary for the pipenet pipeline. Pipe solids are built from
//! B-rep primitives, positioned by rigid transforms, joined by boolean
//! fusion, and meshed; this crate defines the trait through which all of
//! that happens, without committing to a particular kernel.
//!
//! ## Architecture
//!
//! ```text
//! Kernel trait (primitives, booleans, queries, meshing)
//!       ↓
//! Session<K> (initialize on construction, finalize on drop)
//!       ↓
//! MockKernel (analytic in-memory implementation for tests)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use glam::DVec3;
//! use pipenet_kernel::{Kernel, MockKernel, Session};
//!
//! let mut session = Session::new(MockKernel::new()).unwrap();
//! let kernel = session.kernel();
//! let vol = kernel
//!     .add_cylinder(DVec3::ZERO, DVec3::new(0.0, 0.0, 2.0), 0.5)
//!     .unwrap();
//! kernel.synchronize().unwrap();
//! let com = kernel.center_of_mass(vol).unwrap();
//! assert!((com.z - 1.0).abs() < 1e-12);
//! session.finish().unwrap();
//! ```

use std::fmt;
use std::path::Path;

use glam::DVec3;

pub mod error;
pub mod mock;
pub mod session;

pub use error::{KernelError, KernelResult};
pub use mock::MockKernel;
pub use session::Session;

// =============================================================================
// ENTITY HANDLES
// =============================================================================

/// Handle to a kernel entity: a (dimension, tag) pair.
///
/// Dimension 3 is a volume, 2 a face, 1 an edge, 0 a point. Tags are unique
/// per dimension and remain stable across rigid transforms, but boolean
/// operations consume their inputs and mint fresh tags for the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimTag {
    /// Topological dimension (0-3).
    pub dim: i32,
    /// Kernel-assigned tag, unique within the dimension.
    pub tag: i32,
}

impl DimTag {
    /// Creates a handle from raw parts.
    pub fn new(dim: i32, tag: i32) -> Self {
        Self { dim, tag }
    }

    /// Creates a volume (dimension 3) handle.
    pub fn volume(tag: i32) -> Self {
        Self { dim: 3, tag }
    }

    /// Creates a face (dimension 2) handle.
    pub fn face(tag: i32) -> Self {
        Self { dim: 2, tag }
    }

    /// Creates an edge (dimension 1) handle.
    pub fn edge(tag: i32) -> Self {
        Self { dim: 1, tag }
    }
}

impl fmt::Display for DimTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dim, self.tag)
    }
}

// =============================================================================
// MESH OUTPUT FORMAT
// =============================================================================

/// On-disk mesh format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshFormat {
    /// Legacy MSH 2.2, the widest-compatibility format.
    #[default]
    Msh2,
    /// Current MSH 4.1.
    Msh4,
}

// =============================================================================
// KERNEL TRAIT
// =============================================================================

/// The CAD kernel boundary.
///
/// Everything the pipeline needs from a solid-modelling kernel: primitive
/// construction, rigid transforms, boolean fusion/intersection, geometry
/// queries, physical group bookkeeping, and mesh generation.
///
/// ## Synchronization Contract
///
/// Construction and transform calls accumulate pending operations. Geometry
/// queries ([`boundary`](Kernel::boundary), [`center_of_mass`](Kernel::center_of_mass),
/// [`planar_face_normal`](Kernel::planar_face_normal)) must be preceded by
/// [`synchronize`](Kernel::synchronize); querying a stale model is an error,
/// never a silently wrong answer.
pub trait Kernel {
    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Brings the kernel up. Must be called exactly once before anything else.
    fn initialize(&mut self) -> KernelResult<()>;

    /// Tears the kernel down, releasing all entities.
    fn finalize(&mut self) -> KernelResult<()>;

    // -------------------------------------------------------------------------
    // Primitive construction
    // -------------------------------------------------------------------------

    /// Adds a solid cylinder from `base` along `extent` with radius `radius`.
    fn add_cylinder(&mut self, base: DVec3, extent: DVec3, radius: f64) -> KernelResult<DimTag>;

    /// Adds a flat elliptical disk face centred at `centre` in the plane
    /// z = centre.z, with semi-axes `rx` along x and `ry` along y.
    fn add_disk(&mut self, centre: DVec3, rx: f64, ry: f64) -> KernelResult<DimTag>;

    /// Adds an axis-aligned solid box from `corner` spanning `extent`.
    fn add_box(&mut self, corner: DVec3, extent: DVec3) -> KernelResult<DimTag>;

    /// Revolves entities about the axis through `point` along `axis` by
    /// `angle` radians (right-handed). Returns all created entities; the
    /// revolution of a face is a volume plus its side entities.
    fn revolve(
        &mut self,
        entities: &[DimTag],
        point: DVec3,
        axis: DVec3,
        angle: f64,
    ) -> KernelResult<Vec<DimTag>>;

    // -------------------------------------------------------------------------
    // Rigid transforms
    // -------------------------------------------------------------------------

    /// Rotates entities about the axis through `point` along `axis` by
    /// `angle` radians (right-handed). Tags are preserved.
    fn rotate(
        &mut self,
        entities: &[DimTag],
        point: DVec3,
        axis: DVec3,
        angle: f64,
    ) -> KernelResult<()>;

    /// Translates entities by `offset`. Tags are preserved.
    fn translate(&mut self, entities: &[DimTag], offset: DVec3) -> KernelResult<()>;

    /// Mirrors entities across the plane `ax + by + cz = d` given as
    /// `[a, b, c, d]`. Tags are preserved.
    fn symmetrize(&mut self, entities: &[DimTag], plane: [f64; 4]) -> KernelResult<()>;

    /// Copies entities, returning fresh tags for the duplicates.
    fn copy(&mut self, entities: &[DimTag]) -> KernelResult<Vec<DimTag>>;

    // -------------------------------------------------------------------------
    // Booleans and local operations
    // -------------------------------------------------------------------------

    /// Chamfers `edge` of `volume`, measuring distance `distances[0]` on
    /// `face` and `distances[1]` on the adjacent face. Returns the tag of
    /// the modified volume.
    fn chamfer(
        &mut self,
        volume: DimTag,
        edge: DimTag,
        face: DimTag,
        distances: [f64; 2],
    ) -> KernelResult<DimTag>;

    /// Boolean intersection of `objects` with `tools`.
    fn intersect(
        &mut self,
        objects: &[DimTag],
        tools: &[DimTag],
        remove_object: bool,
        remove_tool: bool,
    ) -> KernelResult<Vec<DimTag>>;

    /// Boolean union of `objects` with `tools`.
    fn fuse(
        &mut self,
        objects: &[DimTag],
        tools: &[DimTag],
        remove_object: bool,
        remove_tool: bool,
    ) -> KernelResult<Vec<DimTag>>;

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Flushes pending construction and transform operations into the
    /// queryable model.
    fn synchronize(&mut self) -> KernelResult<()>;

    /// Returns the boundary entities of `entities` (one dimension lower).
    ///
    /// With `combined` the boundaries are merged and interior entities
    /// cancel; `oriented` keeps sign information on tags.
    fn boundary(
        &mut self,
        entities: &[DimTag],
        combined: bool,
        oriented: bool,
    ) -> KernelResult<Vec<DimTag>>;

    /// Returns the centroid of an entity.
    fn center_of_mass(&mut self, entity: DimTag) -> KernelResult<DVec3>;

    /// Returns the outward unit normal of a planar face, or `None` when the
    /// face is curved.
    fn planar_face_normal(&mut self, face: DimTag) -> KernelResult<Option<DVec3>>;

    // -------------------------------------------------------------------------
    // Physical groups and meshing
    // -------------------------------------------------------------------------

    /// Registers a physical group over entities of dimension `dim`, returning
    /// its identifier. Identifiers count up from 1 per dimension.
    fn add_physical_group(&mut self, dim: i32, tags: &[i32]) -> KernelResult<i32>;

    /// Sets the global maximum element size.
    fn set_max_mesh_size(&mut self, size: f64) -> KernelResult<()>;

    /// Embeds a sizing seed point carrying a local element size, returning
    /// its tag.
    fn add_seed_point(&mut self, point: DVec3, mesh_size: f64) -> KernelResult<i32>;

    /// Adds a distance field measuring from the given seed points.
    fn add_distance_field(&mut self, seed_points: &[i32]) -> KernelResult<i32>;

    /// Adds a threshold field mapping `input` distance to element size:
    /// `size_min` inside `dist_min`, `size_max` beyond `dist_max`.
    fn add_threshold_field(
        &mut self,
        input: i32,
        size_min: f64,
        size_max: f64,
        dist_min: f64,
        dist_max: f64,
    ) -> KernelResult<i32>;

    /// Adds a field taking the pointwise minimum of the given fields.
    fn add_min_field(&mut self, fields: &[i32]) -> KernelResult<i32>;

    /// Installs a field as the background sizing field.
    fn set_background_field(&mut self, field: i32) -> KernelResult<()>;

    /// Generates a mesh of the given dimension.
    fn generate_mesh(&mut self, dim: i32) -> KernelResult<()>;

    /// Writes the generated mesh to `path`.
    fn write_mesh(&mut self, path: &Path, format: MeshFormat, binary: bool) -> KernelResult<()>;
}

// =============================================================================
// TESTS
// =============================================================================
