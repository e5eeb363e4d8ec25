//! # Mock Kernel
//!
//! Analytic in-memory implementation of the [`Kernel`] trait. Solids are
//! tracked as exact parametric shapes (cylinders, frusta, boxes, revolved
//! tubes and compounds of those), so centroids, normals and containment are
//! computed in closed form rather than from a tessellation.
//!
//! The mock honors the synchronization contract: geometry queries fail with
//! [`KernelError::StaleModel`] while construction or transform calls are
//! pending. Mesh generation is bookkeeping only; [`write_mesh`] emits a
//! minimal MSH header plus the physical-name table.
//!
//! [`write_mesh`]: MockKernel::write_mesh

use std::collections::HashMap;
use std::io::Write as _;
use std::path::Path;

use glam::{DQuat, DVec3};
use tracing::trace;

use crate::error::{KernelError, KernelResult};
use crate::{DimTag, Kernel, MeshFormat};

#[cfg(test)]
mod tests;

/// Inclusive slack for containment tests.
const CONTAIN_TOLERANCE: f64 = 1e-9;

/// Coincident-centroid threshold for cap welding during fusion.
const WELD_TOLERANCE: f64 = 1e-9;

/// Probe offset used to detect caps buried inside another solid.
const PROBE_OFFSET: f64 = 1e-6;

/// Margin by which interior sample points stay away from solid boundaries,
/// so touching pieces never register as overlapping.
const SAMPLE_MARGIN: f64 = 1e-6;

// =============================================================================
// GEOMETRY PRIMITIVES
// =============================================================================

/// Oriented cutting plane. The kept half-space is `normal . (p - point) <= 0`.
#[derive(Debug, Clone, Copy)]
struct Plane {
    point: DVec3,
    normal: DVec3,
}

impl Plane {
    fn keeps(&self, p: DVec3, tol: f64) -> bool {
        self.normal.dot(p - self.point) <= tol
    }
}

/// Exact parametric solid tracked by the mock.
#[derive(Debug, Clone)]
enum Shape {
    /// Right circular cylinder, optionally truncated by a plane.
    Cylinder {
        base: DVec3,
        axis: DVec3,
        length: f64,
        radius: f64,
        cut: Option<Plane>,
    },
    /// Conical frustum from `r_base` at `base` to `r_top` at the far end.
    Frustum {
        base: DVec3,
        axis: DVec3,
        length: f64,
        r_base: f64,
        r_top: f64,
    },
    /// Parallelepiped spanned by three orthogonal edges, optionally cut.
    Cuboid {
        corner: DVec3,
        ex: DVec3,
        ey: DVec3,
        ez: DVec3,
        cut: Option<Plane>,
    },
    /// Tube swept along a circular arc: the arc lies in the plane through
    /// `centre` perpendicular to `axis`, starts at `centre + bend * start`,
    /// and spans `angle` radians right-handed about `axis`.
    Revolved {
        centre: DVec3,
        axis: DVec3,
        start: DVec3,
        bend: f64,
        radius: f64,
        angle: f64,
    },
    /// Union of member shapes.
    Compound(Vec<Shape>),
}

/// Rigid (or improper) motion applied to shapes and cached face data.
#[derive(Debug, Clone, Copy)]
enum Motion {
    Rotation { point: DVec3, quat: DQuat },
    Translation(DVec3),
    /// Mirror across the plane `normal . p + offset = 0` (unit normal).
    Reflection { normal: DVec3, offset: f64 },
}

impl Motion {
    fn point(&self, p: DVec3) -> DVec3 {
        match *self {
            Motion::Rotation { point, quat } => point + quat * (p - point),
            Motion::Translation(offset) => p + offset,
            Motion::Reflection { normal, offset } => {
                p - 2.0 * (normal.dot(p) + offset) * normal
            }
        }
    }

    fn vector(&self, v: DVec3) -> DVec3 {
        match *self {
            Motion::Rotation { quat, .. } => quat * v,
            Motion::Translation(_) => v,
            Motion::Reflection { normal, .. } => v - 2.0 * v.dot(normal) * normal,
        }
    }

    /// Pseudo-vectors (rotation axes) flip sign under reflection so sweep
    /// angles keep their orientation.
    fn axis(&self, v: DVec3) -> DVec3 {
        match *self {
            Motion::Reflection { .. } => -self.vector(v),
            _ => self.vector(v),
        }
    }
}

impl Shape {
    fn apply(&mut self, m: &Motion) {
        match self {
            Shape::Cylinder {
                base, axis, cut, ..
            } => {
                *base = m.point(*base);
                *axis = m.vector(*axis);
                if let Some(plane) = cut {
                    plane.point = m.point(plane.point);
                    plane.normal = m.vector(plane.normal);
                }
            }
            Shape::Frustum { base, axis, .. } => {
                *base = m.point(*base);
                *axis = m.vector(*axis);
            }
            Shape::Cuboid {
                corner,
                ex,
                ey,
                ez,
                cut,
            } => {
                *corner = m.point(*corner);
                *ex = m.vector(*ex);
                *ey = m.vector(*ey);
                *ez = m.vector(*ez);
                if let Some(plane) = cut {
                    plane.point = m.point(plane.point);
                    plane.normal = m.vector(plane.normal);
                }
            }
            Shape::Revolved {
                centre,
                axis,
                start,
                ..
            } => {
                *centre = m.point(*centre);
                *axis = m.axis(*axis);
                *start = m.vector(*start);
            }
            Shape::Compound(members) => {
                for member in members {
                    member.apply(m);
                }
            }
        }
    }

    fn contains(&self, p: DVec3) -> bool {
        let tol = CONTAIN_TOLERANCE;
        match *self {
            Shape::Cylinder {
                base,
                axis,
                length,
                radius,
                cut,
            } => {
                let t = (p - base).dot(axis);
                if t < -tol || t > length + tol {
                    return false;
                }
                let radial = (p - base) - t * axis;
                if radial.length() > radius + tol {
                    return false;
                }
                cut.map_or(true, |plane| plane.keeps(p, tol))
            }
            Shape::Frustum {
                base,
                axis,
                length,
                r_base,
                r_top,
            } => {
                let t = (p - base).dot(axis);
                if t < -tol || t > length + tol {
                    return false;
                }
                let r_here = r_base + (r_top - r_base) * (t / length).clamp(0.0, 1.0);
                let radial = (p - base) - t * axis;
                radial.length() <= r_here + tol
            }
            Shape::Cuboid {
                corner,
                ex,
                ey,
                ez,
                cut,
            } => {
                for edge in [ex, ey, ez] {
                    let len = edge.length();
                    let t = (p - corner).dot(edge / len);
                    if t < -tol || t > len + tol {
                        return false;
                    }
                }
                cut.map_or(true, |plane| plane.keeps(p, tol))
            }
            Shape::Revolved {
                centre,
                axis,
                start,
                bend,
                radius,
                angle,
            } => {
                let d = p - centre;
                let h = d.dot(axis);
                let radial = d - h * axis;
                let rho = radial.length();
                if rho < tol {
                    return false;
                }
                let u = radial / rho;
                let mut phi = start.cross(u).dot(axis).atan2(start.dot(u));
                if phi < 0.0 {
                    phi += std::f64::consts::TAU;
                }
                if phi > angle + tol && (std::f64::consts::TAU - phi) > tol {
                    return false;
                }
                let off = rho - bend;
                off * off + h * h <= radius * radius + tol
            }
            Shape::Compound(ref members) => members.iter().any(|s| s.contains(p)),
        }
    }

    /// Collects points strictly inside the solid, kept [`SAMPLE_MARGIN`]
    /// away from every boundary. Used for the conservative overlap test.
    fn sample_interior(&self, out: &mut Vec<DVec3>) {
        let m = SAMPLE_MARGIN;
        match *self {
            Shape::Cylinder {
                base,
                axis,
                length,
                radius,
                cut,
            } => {
                let (u, v) = orthonormal_frame(axis);
                for i in 0..9 {
                    let t = m + (length - 2.0 * m) * f64::from(i) / 8.0;
                    let centre = base + t * axis;
                    for j in 0..3 {
                        let rho = (radius - m) * f64::from(j) / 2.0;
                        for k in 0..12 {
                            let phi = std::f64::consts::TAU * f64::from(k) / 12.0;
                            let p = centre + rho * (phi.cos() * u + phi.sin() * v);
                            let keep = cut.map_or(true, |pl| pl.keeps(p, -m));
                            if keep {
                                out.push(p);
                            }
                        }
                    }
                }
            }
            Shape::Frustum {
                base,
                axis,
                length,
                r_base,
                r_top,
            } => {
                let (u, v) = orthonormal_frame(axis);
                for i in 0..5 {
                    let t = m + (length - 2.0 * m) * f64::from(i) / 4.0;
                    let r_here = r_base + (r_top - r_base) * t / length;
                    let centre = base + t * axis;
                    for j in 0..3 {
                        let rho = (r_here - m).max(0.0) * f64::from(j) / 2.0;
                        for k in 0..8 {
                            let phi = std::f64::consts::TAU * f64::from(k) / 8.0;
                            out.push(centre + rho * (phi.cos() * u + phi.sin() * v));
                        }
                    }
                }
            }
            Shape::Cuboid {
                corner,
                ex,
                ey,
                ez,
                cut,
            } => {
                for i in 0..5 {
                    for j in 0..5 {
                        for k in 0..5 {
                            let f = |n: u32| m + (1.0 - 2.0 * m) * f64::from(n) / 4.0;
                            let p = corner + f(i) * ex + f(j) * ey + f(k) * ez;
                            let keep = cut.map_or(true, |pl| pl.keeps(p, -m));
                            if keep {
                                out.push(p);
                            }
                        }
                    }
                }
            }
            Shape::Revolved {
                centre,
                axis,
                start,
                bend,
                radius,
                angle,
            } => {
                let phi_margin = m / bend;
                for i in 0..17 {
                    let phi = phi_margin + (angle - 2.0 * phi_margin) * f64::from(i) / 16.0;
                    let quat = DQuat::from_axis_angle(axis, phi);
                    let spoke = quat * start;
                    let tube_centre = centre + bend * spoke;
                    for j in 0..3 {
                        let rho = (radius - m) * f64::from(j) / 2.0;
                        for k in 0..8 {
                            let psi = std::f64::consts::TAU * f64::from(k) / 8.0;
                            out.push(tube_centre + rho * (psi.cos() * spoke + psi.sin() * axis));
                        }
                    }
                }
            }
            Shape::Compound(ref members) => {
                for member in members {
                    member.sample_interior(out);
                }
            }
        }
    }
}

/// Any unit pair perpendicular to `axis`.
fn orthonormal_frame(axis: DVec3) -> (DVec3, DVec3) {
    let helper = if axis.x.abs() < 0.9 { DVec3::X } else { DVec3::Y };
    let u = axis.cross(helper).normalize();
    let v = axis.cross(u);
    (u, v)
}

// =============================================================================
// ENTITY STORE
// =============================================================================

#[derive(Debug, Clone)]
struct Solid {
    shape: Shape,
    volume: f64,
    centroid: DVec3,
    faces: Vec<i32>,
}

#[derive(Debug, Clone)]
struct FaceData {
    centroid: DVec3,
    /// Outward unit normal for planar faces, `None` for curved ones.
    normal: Option<DVec3>,
    /// Radius of circular caps and lateral surfaces, where meaningful.
    radius: Option<f64>,
    edges: Vec<i32>,
}

#[derive(Debug, Clone)]
struct EdgeData {
    midpoint: DVec3,
}

#[derive(Debug, Clone)]
enum Entity {
    Volume(Solid),
    Face(FaceData),
    Edge(EdgeData),
}

#[derive(Debug, Clone)]
enum Field {
    Distance { seeds: Vec<i32> },
    Threshold,
    Min { inputs: Vec<i32> },
}

// =============================================================================
// MOCK KERNEL
// =============================================================================

/// Analytic in-memory CAD kernel for tests.
///
/// Tracks solids as exact parametric shapes and answers geometry queries in
/// closed form. See the module docs for the supported operation subset.
#[derive(Debug, Default)]
pub struct MockKernel {
    initialized: bool,
    dirty: bool,
    next_tag: [i32; 4],
    entities: HashMap<DimTag, Entity>,
    seeds: HashMap<i32, (DVec3, f64)>,
    physical_counters: [i32; 4],
    physical_groups: HashMap<(i32, i32), Vec<i32>>,
    fields: HashMap<i32, Field>,
    next_field: i32,
    background_field: Option<i32>,
    max_mesh_size: Option<f64>,
    mesh_dim: Option<i32>,
}

impl MockKernel {
    /// Creates an uninitialized mock kernel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the face tags registered under physical group `id` of
    /// dimension `dim`, if any.
    pub fn physical_group_tags(&self, dim: i32, id: i32) -> Option<&[i32]> {
        self.physical_groups.get(&(dim, id)).map(Vec::as_slice)
    }

    /// Returns the configured global maximum element size.
    pub fn max_mesh_size(&self) -> Option<f64> {
        self.max_mesh_size
    }

    /// Returns the number of sizing seed points embedded so far.
    pub fn seed_count(&self) -> usize {
        self.seeds.len()
    }

    /// Returns the installed background field, if any.
    pub fn background_field(&self) -> Option<i32> {
        self.background_field
    }

    fn require_init(&self) -> KernelResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(KernelError::NotInitialized)
        }
    }

    fn require_synced(&self, query: &'static str) -> KernelResult<()> {
        if self.dirty {
            Err(KernelError::StaleModel { query })
        } else {
            Ok(())
        }
    }

    fn mint(&mut self, dim: i32) -> DimTag {
        let slot = &mut self.next_tag[dim as usize];
        *slot += 1;
        DimTag::new(dim, *slot)
    }

    fn solid(&self, dimtag: DimTag) -> KernelResult<&Solid> {
        match self.entities.get(&dimtag) {
            Some(Entity::Volume(solid)) if dimtag.dim == 3 => Ok(solid),
            _ => Err(KernelError::UnknownEntity(dimtag)),
        }
    }

    fn face(&self, dimtag: DimTag) -> KernelResult<&FaceData> {
        match self.entities.get(&dimtag) {
            Some(Entity::Face(face)) if dimtag.dim == 2 => Ok(face),
            _ => Err(KernelError::UnknownEntity(dimtag)),
        }
    }

    fn new_edge(&mut self, midpoint: DVec3) -> i32 {
        let dimtag = self.mint(1);
        self.entities
            .insert(dimtag, Entity::Edge(EdgeData { midpoint }));
        dimtag.tag
    }

    fn new_face(&mut self, face: FaceData) -> i32 {
        let dimtag = self.mint(2);
        self.entities.insert(dimtag, Entity::Face(face));
        dimtag.tag
    }

    fn new_volume(&mut self, solid: Solid) -> DimTag {
        let dimtag = self.mint(3);
        self.entities.insert(dimtag, Entity::Volume(solid));
        dimtag
    }

    /// Removes a volume and all faces and edges hanging off it.
    fn remove_volume(&mut self, dimtag: DimTag) -> KernelResult<Solid> {
        let solid = match self.entities.remove(&dimtag) {
            Some(Entity::Volume(solid)) => solid,
            Some(other) => {
                self.entities.insert(dimtag, other);
                return Err(KernelError::UnknownEntity(dimtag));
            }
            None => return Err(KernelError::UnknownEntity(dimtag)),
        };
        for face_tag in &solid.faces {
            if let Some(Entity::Face(face)) = self.entities.remove(&DimTag::face(*face_tag)) {
                for edge_tag in face.edges {
                    self.entities.remove(&DimTag::edge(edge_tag));
                }
            }
        }
        Ok(solid)
    }

    fn apply_motion(&mut self, entities: &[DimTag], motion: Motion) -> KernelResult<()> {
        for &dimtag in entities {
            // Validate before mutating anything.
            self.solid(dimtag)?;
        }
        for &dimtag in entities {
            let face_tags = match self.entities.get_mut(&dimtag) {
                Some(Entity::Volume(solid)) => {
                    solid.shape.apply(&motion);
                    solid.centroid = motion.point(solid.centroid);
                    solid.faces.clone()
                }
                _ => return Err(KernelError::UnknownEntity(dimtag)),
            };
            for face_tag in face_tags {
                let edge_tags = match self.entities.get_mut(&DimTag::face(face_tag)) {
                    Some(Entity::Face(face)) => {
                        face.centroid = motion.point(face.centroid);
                        face.normal = face.normal.map(|n| motion.vector(n));
                        face.edges.clone()
                    }
                    _ => continue,
                };
                for edge_tag in edge_tags {
                    if let Some(Entity::Edge(edge)) =
                        self.entities.get_mut(&DimTag::edge(edge_tag))
                    {
                        edge.midpoint = motion.point(edge.midpoint);
                    }
                }
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Builds the cylinder face set: two circular caps (each carrying its rim
    /// edge) and one curved lateral surface.
    fn cylinder_faces(&mut self, base: DVec3, axis: DVec3, length: f64, radius: f64) -> Vec<i32> {
        let top = base + length * axis;
        let bottom_edge = self.new_edge(base);
        let bottom = self.new_face(FaceData {
            centroid: base,
            normal: Some(-axis),
            radius: Some(radius),
            edges: vec![bottom_edge],
        });
        let top_edge = self.new_edge(top);
        let top_face = self.new_face(FaceData {
            centroid: top,
            normal: Some(axis),
            radius: Some(radius),
            edges: vec![top_edge],
        });
        let lateral = self.new_face(FaceData {
            centroid: base + 0.5 * length * axis,
            normal: None,
            radius: Some(radius),
            edges: vec![],
        });
        vec![bottom, top_face, lateral]
    }

    /// Truncates a plain cylinder by the cutting plane of a chamfered box.
    /// This is the only boolean intersection the mock evaluates exactly; it
    /// is what turns a straight stub into one half of a mitered bend.
    fn intersect_cut_cylinder(
        &mut self,
        plane: Plane,
        base: DVec3,
        axis: DVec3,
        length: f64,
        radius: f64,
    ) -> KernelResult<DimTag> {
        let slope = plane.normal.dot(axis);
        if slope.abs() < 1e-12 {
            return Err(KernelError::InvalidShape(
                "cutting plane is parallel to the cylinder axis".to_string(),
            ));
        }
        let t_star = plane.normal.dot(plane.point - base) / slope;
        if t_star <= 0.0 || t_star >= length {
            return Err(KernelError::InvalidShape(
                "cutting plane misses the cylinder axis segment".to_string(),
            ));
        }
        // The cap on the kept side survives; the other is cut away.
        let keep_base = slope > 0.0;
        let ellipse_centre = base + t_star * axis;
        let ellipse_normal = if keep_base { plane.normal } else { -plane.normal };
        let (cap_centre, cap_normal, kept_height) = if keep_base {
            (base, -axis, t_star)
        } else {
            (base + length * axis, axis, length - t_star)
        };
        let cap_edge = self.new_edge(cap_centre);
        let cap = self.new_face(FaceData {
            centroid: cap_centre,
            normal: Some(cap_normal),
            radius: Some(radius),
            edges: vec![cap_edge],
        });
        let ellipse = self.new_face(FaceData {
            centroid: ellipse_centre,
            normal: Some(ellipse_normal.normalize()),
            radius: None,
            edges: vec![],
        });
        let lateral = self.new_face(FaceData {
            centroid: cap_centre + 0.5 * kept_height * -cap_normal,
            normal: None,
            radius: Some(radius),
            edges: vec![],
        });
        let cut = if keep_base {
            plane
        } else {
            Plane {
                point: plane.point,
                normal: -plane.normal,
            }
        };
        let volume = std::f64::consts::PI * radius * radius * kept_height;
        let centroid = cap_centre + 0.5 * kept_height * -cap_normal;
        Ok(self.new_volume(Solid {
            shape: Shape::Cylinder {
                base,
                axis,
                length,
                radius,
                cut: Some(cut),
            },
            volume,
            centroid,
            faces: vec![cap, ellipse, lateral],
        }))
    }

    /// Conservative overlap test: interior sample points of one solid are
    /// checked for containment in the other. Touching boundaries never
    /// trigger; overlaps thinner than the sampling grid may be missed.
    fn solids_overlap(&self, a: &Solid, b: &Solid) -> bool {
        let mut samples = Vec::new();
        a.shape.sample_interior(&mut samples);
        if samples.iter().any(|&p| b.shape.contains(p)) {
            return true;
        }
        samples.clear();
        b.shape.sample_interior(&mut samples);
        samples.iter().any(|&p| a.shape.contains(p))
    }
}

// =============================================================================
// KERNEL IMPLEMENTATION
// =============================================================================

impl Kernel for MockKernel {
    fn initialize(&mut self) -> KernelResult<()> {
        if self.initialized {
            return Err(KernelError::AlreadyInitialized);
        }
        self.initialized = true;
        trace!("mock kernel initialized");
        Ok(())
    }

    fn finalize(&mut self) -> KernelResult<()> {
        self.require_init()?;
        *self = Self::default();
        trace!("mock kernel finalized");
        Ok(())
    }

    fn add_cylinder(&mut self, base: DVec3, extent: DVec3, radius: f64) -> KernelResult<DimTag> {
        self.require_init()?;
        let length = extent.length();
        if length <= 0.0 || radius <= 0.0 {
            return Err(KernelError::InvalidShape(
                "cylinder needs positive length and radius".to_string(),
            ));
        }
        let axis = extent / length;
        let faces = self.cylinder_faces(base, axis, length, radius);
        let volume = std::f64::consts::PI * radius * radius * length;
        let dimtag = self.new_volume(Solid {
            shape: Shape::Cylinder {
                base,
                axis,
                length,
                radius,
                cut: None,
            },
            volume,
            centroid: base + 0.5 * length * axis,
            faces,
        });
        self.dirty = true;
        Ok(dimtag)
    }

    fn add_disk(&mut self, centre: DVec3, rx: f64, ry: f64) -> KernelResult<DimTag> {
        self.require_init()?;
        if rx <= 0.0 || ry <= 0.0 {
            return Err(KernelError::InvalidShape(
                "disk needs positive semi-axes".to_string(),
            ));
        }
        let tag = self.new_face(FaceData {
            centroid: centre,
            normal: Some(DVec3::Z),
            radius: Some(rx),
            edges: vec![],
        });
        self.dirty = true;
        Ok(DimTag::face(tag))
    }

    fn add_box(&mut self, corner: DVec3, extent: DVec3) -> KernelResult<DimTag> {
        self.require_init()?;
        if extent.x <= 0.0 || extent.y <= 0.0 || extent.z <= 0.0 {
            return Err(KernelError::InvalidShape(
                "box needs positive extents".to_string(),
            ));
        }
        let centre = corner + 0.5 * extent;
        let mut faces = Vec::with_capacity(6);
        for (normal, half) in [
            (-DVec3::X, extent.x),
            (DVec3::X, extent.x),
            (-DVec3::Y, extent.y),
            (DVec3::Y, extent.y),
            (-DVec3::Z, extent.z),
            (DVec3::Z, extent.z),
        ] {
            let face_centre = centre + 0.5 * half * normal;
            // Rim edges: midpoints sit halfway to each neighbouring face.
            let mut edges = Vec::with_capacity(4);
            for other in [DVec3::X, DVec3::Y, DVec3::Z] {
                if other.dot(normal).abs() > 0.5 {
                    continue;
                }
                let span = extent.dot(other);
                edges.push(self.new_edge(face_centre + 0.5 * span * other));
                edges.push(self.new_edge(face_centre - 0.5 * span * other));
            }
            faces.push(self.new_face(FaceData {
                centroid: face_centre,
                normal: Some(normal),
                radius: None,
                edges,
            }));
        }
        let dimtag = self.new_volume(Solid {
            shape: Shape::Cuboid {
                corner,
                ex: DVec3::new(extent.x, 0.0, 0.0),
                ey: DVec3::new(0.0, extent.y, 0.0),
                ez: DVec3::new(0.0, 0.0, extent.z),
                cut: None,
            },
            volume: extent.x * extent.y * extent.z,
            centroid: centre,
            faces,
        });
        self.dirty = true;
        Ok(dimtag)
    }

    fn revolve(
        &mut self,
        entities: &[DimTag],
        point: DVec3,
        axis: DVec3,
        angle: f64,
    ) -> KernelResult<Vec<DimTag>> {
        self.require_init()?;
        let [disk_tag] = entities else {
            return Err(KernelError::UnsupportedOperation(
                "revolve expects exactly one face".to_string(),
            ));
        };
        let disk_tag = *disk_tag;
        if !(angle > 0.0 && angle < std::f64::consts::TAU) {
            return Err(KernelError::InvalidShape(
                "revolve angle must be in (0, 2*pi)".to_string(),
            ));
        }
        let disk = self.face(disk_tag)?.clone();
        let radius = disk.radius.ok_or_else(|| {
            KernelError::UnsupportedOperation("revolve supports circular disks only".to_string())
        })?;
        let axis = axis.normalize();
        let offset = disk.centroid - point;
        let spoke = offset - offset.dot(axis) * axis;
        let bend = spoke.length();
        if bend <= 0.0 {
            return Err(KernelError::InvalidShape(
                "revolved face centre lies on the axis".to_string(),
            ));
        }
        let start = spoke / bend;
        let flow0 = axis.cross(start);
        let quat = DQuat::from_axis_angle(axis, angle);
        let end_centre = point + offset.dot(axis) * axis + bend * (quat * start);
        let end_normal = quat * flow0;

        // Solid centroid sits on the bisector, pulled in by the chord factor.
        let half = DQuat::from_axis_angle(axis, 0.5 * angle);
        let chord = (0.5 * angle).sin() / (0.5 * angle);
        let centroid = point + offset.dot(axis) * axis + bend * chord * (half * start);
        let volume = angle * bend * std::f64::consts::PI * radius * radius;

        // The input disk becomes the start cap.
        if let Some(Entity::Face(face)) = self.entities.get_mut(&disk_tag) {
            face.normal = Some(-flow0);
            face.radius = Some(radius);
        }
        let end_cap = self.new_face(FaceData {
            centroid: end_centre,
            normal: Some(end_normal),
            radius: Some(radius),
            edges: vec![],
        });
        let lateral = self.new_face(FaceData {
            centroid,
            normal: None,
            radius: Some(radius),
            edges: vec![],
        });
        let vol = self.new_volume(Solid {
            shape: Shape::Revolved {
                centre: point + offset.dot(axis) * axis,
                axis,
                start,
                bend,
                radius,
                angle,
            },
            volume,
            centroid,
            faces: vec![disk_tag.tag, end_cap, lateral],
        });
        self.dirty = true;
        Ok(vec![DimTag::face(end_cap), vol, DimTag::face(lateral)])
    }

    fn rotate(
        &mut self,
        entities: &[DimTag],
        point: DVec3,
        axis: DVec3,
        angle: f64,
    ) -> KernelResult<()> {
        self.require_init()?;
        let quat = DQuat::from_axis_angle(axis.normalize(), angle);
        self.apply_motion(entities, Motion::Rotation { point, quat })
    }

    fn translate(&mut self, entities: &[DimTag], offset: DVec3) -> KernelResult<()> {
        self.require_init()?;
        self.apply_motion(entities, Motion::Translation(offset))
    }

    fn symmetrize(&mut self, entities: &[DimTag], plane: [f64; 4]) -> KernelResult<()> {
        self.require_init()?;
        let normal = DVec3::new(plane[0], plane[1], plane[2]);
        let len = normal.length();
        if len <= 0.0 {
            return Err(KernelError::InvalidShape(
                "mirror plane needs a nonzero normal".to_string(),
            ));
        }
        self.apply_motion(
            entities,
            Motion::Reflection {
                normal: normal / len,
                offset: plane[3] / len,
            },
        )
    }

    fn copy(&mut self, entities: &[DimTag]) -> KernelResult<Vec<DimTag>> {
        self.require_init()?;
        let mut copies = Vec::with_capacity(entities.len());
        for &dimtag in entities {
            let solid = self.solid(dimtag)?.clone();
            let mut faces = Vec::with_capacity(solid.faces.len());
            for face_tag in &solid.faces {
                let face = self.face(DimTag::face(*face_tag))?.clone();
                let mut edges = Vec::with_capacity(face.edges.len());
                for edge_tag in &face.edges {
                    let midpoint = match self.entities.get(&DimTag::edge(*edge_tag)) {
                        Some(Entity::Edge(edge)) => edge.midpoint,
                        _ => return Err(KernelError::UnknownEntity(DimTag::edge(*edge_tag))),
                    };
                    edges.push(self.new_edge(midpoint));
                }
                faces.push(self.new_face(FaceData { edges, ..face }));
            }
            copies.push(self.new_volume(Solid { faces, ..solid }));
        }
        self.dirty = true;
        Ok(copies)
    }

    fn chamfer(
        &mut self,
        volume: DimTag,
        edge: DimTag,
        face: DimTag,
        distances: [f64; 2],
    ) -> KernelResult<DimTag> {
        self.require_init()?;
        let [d1, d2] = distances;
        if d1 <= 0.0 || d2 <= 0.0 {
            return Err(KernelError::InvalidShape(
                "chamfer distances must be positive".to_string(),
            ));
        }
        let solid = self.solid(volume)?.clone();
        if !solid.faces.contains(&face.tag) {
            return Err(KernelError::UnknownEntity(face));
        }
        let face_data = self.face(face)?.clone();
        if !face_data.edges.contains(&edge.tag) {
            return Err(KernelError::UnknownEntity(edge));
        }
        let face_normal = face_data.normal.ok_or_else(|| {
            KernelError::UnsupportedOperation("cannot chamfer a curved face".to_string())
        })?;
        let midpoint = match self.entities.get(&DimTag::edge(edge.tag)) {
            Some(Entity::Edge(e)) => e.midpoint,
            _ => return Err(KernelError::UnknownEntity(edge)),
        };

        match solid.shape {
            // Box chamfer: record the cutting plane through the two offset
            // lines. The box is only ever used as an intersection tool, so
            // its own volume and face set are left alone.
            Shape::Cuboid { cut: None, .. } => {
                let inward = (face_data.centroid - midpoint).normalize();
                let p1 = midpoint + d1 * inward;
                let p2 = midpoint - d2 * face_normal;
                let edge_dir = face_normal.cross(inward);
                let mut normal = edge_dir.cross(p2 - p1).normalize();
                if normal.dot(midpoint - p1) < 0.0 {
                    normal = -normal;
                }
                if let Some(Entity::Volume(s)) = self.entities.get_mut(&volume) {
                    if let Shape::Cuboid { cut, .. } = &mut s.shape {
                        *cut = Some(Plane { point: p1, normal });
                    }
                }
                self.dirty = true;
                Ok(volume)
            }
            // Cap chamfer on a cylinder: the cap shrinks by d1 and a conical
            // transition of length d2 joins it back to the full radius.
            Shape::Cylinder {
                length,
                radius,
                cut: None,
                ..
            } => {
                let cap_radius = face_data.radius.ok_or_else(|| {
                    KernelError::UnsupportedOperation(
                        "cylinder chamfer must start from a cap".to_string(),
                    )
                })?;
                if d1 >= cap_radius || d2 >= length {
                    return Err(KernelError::InvalidShape(
                        "chamfer distances exceed the cylinder".to_string(),
                    ));
                }
                // Axis direction pointing into the solid from the cap.
                let inward = -face_normal;
                let cap_centre = face_data.centroid;
                let r0 = cap_radius - d1;
                let r1 = radius;
                let v_cone = std::f64::consts::PI * d2 / 3.0 * (r0 * r0 + r0 * r1 + r1 * r1);
                let v_cyl = std::f64::consts::PI * r1 * r1 * (length - d2);
                let z_cone =
                    d2 * (r0 * r0 + 2.0 * r0 * r1 + 3.0 * r1 * r1)
                        / (4.0 * (r0 * r0 + r0 * r1 + r1 * r1));
                let z_cyl = d2 + 0.5 * (length - d2);
                let centroid =
                    cap_centre + inward * (v_cone * z_cone + v_cyl * z_cyl) / (v_cone + v_cyl);
                let cone_face = self.new_face(FaceData {
                    centroid: cap_centre + 0.5 * d2 * inward,
                    normal: None,
                    radius: None,
                    edges: vec![],
                });
                if let Some(Entity::Face(f)) = self.entities.get_mut(&face) {
                    f.radius = Some(r0);
                }
                // Recentre the lateral wall over the remaining straight run.
                let lateral_tag = solid
                    .faces
                    .iter()
                    .copied()
                    .find(|&t| {
                        matches!(
                            self.entities.get(&DimTag::face(t)),
                            Some(Entity::Face(f)) if f.normal.is_none()
                        )
                    });
                if let Some(tag) = lateral_tag {
                    if let Some(Entity::Face(f)) = self.entities.get_mut(&DimTag::face(tag)) {
                        f.centroid = cap_centre + (d2 + 0.5 * (length - d2)) * inward;
                    }
                }
                if let Some(Entity::Volume(s)) = self.entities.get_mut(&volume) {
                    s.shape = Shape::Compound(vec![
                        Shape::Frustum {
                            base: cap_centre,
                            axis: inward,
                            length: d2,
                            r_base: r0,
                            r_top: r1,
                        },
                        Shape::Cylinder {
                            base: cap_centre + d2 * inward,
                            axis: inward,
                            length: length - d2,
                            radius: r1,
                            cut: None,
                        },
                    ]);
                    s.volume = v_cone + v_cyl;
                    s.centroid = centroid;
                    s.faces.push(cone_face);
                }
                self.dirty = true;
                Ok(volume)
            }
            _ => Err(KernelError::UnsupportedOperation(
                "chamfer supports plain boxes and cylinder caps only".to_string(),
            )),
        }
    }

    fn intersect(
        &mut self,
        objects: &[DimTag],
        tools: &[DimTag],
        remove_object: bool,
        remove_tool: bool,
    ) -> KernelResult<Vec<DimTag>> {
        self.require_init()?;
        // Exact case: chamfered box masking a plain cylinder.
        if let ([obj], [tool]) = (objects, tools) {
            let obj_shape = self.solid(*obj)?.shape.clone();
            let tool_shape = self.solid(*tool)?.shape.clone();
            if let (
                Shape::Cuboid {
                    cut: Some(plane), ..
                },
                Shape::Cylinder {
                    base,
                    axis,
                    length,
                    radius,
                    cut: None,
                },
            ) = (obj_shape, tool_shape)
            {
                let result = self.intersect_cut_cylinder(plane, base, axis, length, radius)?;
                if remove_object {
                    self.remove_volume(*obj)?;
                }
                if remove_tool {
                    self.remove_volume(*tool)?;
                }
                self.dirty = true;
                return Ok(vec![result]);
            }
        }
        // Conservative case: detect whether the inputs overlap at all. Used
        // by the pre-fusion safety check, which only cares about emptiness.
        let mut hit = false;
        'outer: for &obj in objects {
            let a = self.solid(obj)?;
            for &tool in tools {
                let b = self.solid(tool)?;
                if self.solids_overlap(a, b) {
                    hit = true;
                    break 'outer;
                }
            }
        }
        if remove_object || remove_tool {
            return Err(KernelError::UnsupportedOperation(
                "general consuming intersection is not modelled".to_string(),
            ));
        }
        if hit {
            let marker = self.new_volume(Solid {
                shape: Shape::Compound(vec![]),
                volume: 0.0,
                centroid: DVec3::ZERO,
                faces: vec![],
            });
            self.dirty = true;
            Ok(vec![marker])
        } else {
            Ok(vec![])
        }
    }

    fn fuse(
        &mut self,
        objects: &[DimTag],
        tools: &[DimTag],
        remove_object: bool,
        remove_tool: bool,
    ) -> KernelResult<Vec<DimTag>> {
        self.require_init()?;
        if objects.is_empty() || tools.is_empty() {
            return Err(KernelError::UnsupportedOperation(
                "fuse needs at least one object and one tool".to_string(),
            ));
        }
        let inputs: Vec<DimTag> = objects.iter().chain(tools.iter()).copied().collect();
        let mut solids = Vec::with_capacity(inputs.len());
        for &dimtag in &inputs {
            solids.push((dimtag, self.solid(dimtag)?.clone()));
        }

        // Decide which faces survive. A planar cap is welded away when it
        // coincides with an opposing cap of another input, or when it is
        // buried inside another input solid. Curved faces always survive.
        let mut kept_faces = Vec::new();
        let mut dropped = Vec::new();
        for (i, (_, solid)) in solids.iter().enumerate() {
            'faces: for &face_tag in &solid.faces {
                let face = self.face(DimTag::face(face_tag))?.clone();
                let Some(normal) = face.normal else {
                    kept_faces.push(face_tag);
                    continue;
                };
                for (j, (_, other)) in solids.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    for &other_tag in &other.faces {
                        if other_tag == face_tag {
                            continue;
                        }
                        let other_face = self.face(DimTag::face(other_tag))?;
                        let Some(other_normal) = other_face.normal else {
                            continue;
                        };
                        if (other_face.centroid - face.centroid).length() < WELD_TOLERANCE
                            && normal.dot(other_normal) < -1.0 + 1e-6
                        {
                            dropped.push(face_tag);
                            continue 'faces;
                        }
                    }
                    let probe = face.centroid + PROBE_OFFSET * normal;
                    if other.shape.contains(probe) {
                        dropped.push(face_tag);
                        continue 'faces;
                    }
                }
                kept_faces.push(face_tag);
            }
        }

        let total_volume: f64 = solids.iter().map(|(_, s)| s.volume).sum();
        let centroid = solids
            .iter()
            .map(|(_, s)| s.volume * s.centroid)
            .sum::<DVec3>()
            / total_volume;
        let shape = Shape::Compound(solids.iter().map(|(_, s)| s.shape.clone()).collect());

        for face_tag in dropped {
            if let Some(Entity::Face(face)) = self.entities.remove(&DimTag::face(face_tag)) {
                for edge_tag in face.edges {
                    self.entities.remove(&DimTag::edge(edge_tag));
                }
            }
        }
        if remove_object || remove_tool {
            // Kept faces are re-homed on the fused volume, so only the
            // volume entities themselves disappear.
            for &dimtag in &inputs {
                self.entities.remove(&dimtag);
            }
        }
        let fused = self.new_volume(Solid {
            shape,
            volume: total_volume,
            centroid,
            faces: kept_faces,
        });
        self.dirty = true;
        Ok(vec![fused])
    }

    fn synchronize(&mut self) -> KernelResult<()> {
        self.require_init()?;
        self.dirty = false;
        Ok(())
    }

    fn boundary(
        &mut self,
        entities: &[DimTag],
        _combined: bool,
        _oriented: bool,
    ) -> KernelResult<Vec<DimTag>> {
        self.require_init()?;
        self.require_synced("boundary")?;
        let mut out = Vec::new();
        for &dimtag in entities {
            match dimtag.dim {
                3 => out.extend(self.solid(dimtag)?.faces.iter().map(|&t| DimTag::face(t))),
                2 => out.extend(self.face(dimtag)?.edges.iter().map(|&t| DimTag::edge(t))),
                _ => return Err(KernelError::UnknownEntity(dimtag)),
            }
        }
        Ok(out)
    }

    fn center_of_mass(&mut self, entity: DimTag) -> KernelResult<DVec3> {
        self.require_init()?;
        self.require_synced("center_of_mass")?;
        match self.entities.get(&entity) {
            Some(Entity::Volume(solid)) => Ok(solid.centroid),
            Some(Entity::Face(face)) => Ok(face.centroid),
            Some(Entity::Edge(edge)) => Ok(edge.midpoint),
            None => Err(KernelError::UnknownEntity(entity)),
        }
    }

    fn planar_face_normal(&mut self, face: DimTag) -> KernelResult<Option<DVec3>> {
        self.require_init()?;
        self.require_synced("planar_face_normal")?;
        Ok(self.face(face)?.normal.map(DVec3::normalize))
    }

    fn add_physical_group(&mut self, dim: i32, tags: &[i32]) -> KernelResult<i32> {
        self.require_init()?;
        if !(0..=3).contains(&dim) {
            return Err(KernelError::InvalidShape(format!(
                "no entities of dimension {dim}"
            )));
        }
        for &tag in tags {
            let dimtag = DimTag::new(dim, tag);
            if !self.entities.contains_key(&dimtag) {
                return Err(KernelError::UnknownEntity(dimtag));
            }
        }
        let counter = &mut self.physical_counters[dim as usize];
        *counter += 1;
        let id = *counter;
        self.physical_groups.insert((dim, id), tags.to_vec());
        Ok(id)
    }

    fn set_max_mesh_size(&mut self, size: f64) -> KernelResult<()> {
        self.require_init()?;
        if size <= 0.0 {
            return Err(KernelError::InvalidShape(
                "mesh size must be positive".to_string(),
            ));
        }
        self.max_mesh_size = Some(size);
        Ok(())
    }

    fn add_seed_point(&mut self, point: DVec3, mesh_size: f64) -> KernelResult<i32> {
        self.require_init()?;
        let dimtag = self.mint(0);
        self.seeds.insert(dimtag.tag, (point, mesh_size));
        self.dirty = true;
        Ok(dimtag.tag)
    }

    fn add_distance_field(&mut self, seed_points: &[i32]) -> KernelResult<i32> {
        self.require_init()?;
        for tag in seed_points {
            if !self.seeds.contains_key(tag) {
                return Err(KernelError::UnknownEntity(DimTag::new(0, *tag)));
            }
        }
        self.next_field += 1;
        self.fields.insert(
            self.next_field,
            Field::Distance {
                seeds: seed_points.to_vec(),
            },
        );
        Ok(self.next_field)
    }

    fn add_threshold_field(
        &mut self,
        input: i32,
        size_min: f64,
        size_max: f64,
        dist_min: f64,
        dist_max: f64,
    ) -> KernelResult<i32> {
        self.require_init()?;
        if !self.fields.contains_key(&input) {
            return Err(KernelError::UnsupportedOperation(format!(
                "unknown field {input}"
            )));
        }
        if size_min > size_max || dist_min > dist_max {
            return Err(KernelError::InvalidShape(
                "threshold bounds out of order".to_string(),
            ));
        }
        self.next_field += 1;
        self.fields.insert(self.next_field, Field::Threshold);
        Ok(self.next_field)
    }

    fn add_min_field(&mut self, fields: &[i32]) -> KernelResult<i32> {
        self.require_init()?;
        for field in fields {
            if !self.fields.contains_key(field) {
                return Err(KernelError::UnsupportedOperation(format!(
                    "unknown field {field}"
                )));
            }
        }
        self.next_field += 1;
        self.fields.insert(
            self.next_field,
            Field::Min {
                inputs: fields.to_vec(),
            },
        );
        Ok(self.next_field)
    }

    fn set_background_field(&mut self, field: i32) -> KernelResult<()> {
        self.require_init()?;
        if !self.fields.contains_key(&field) {
            return Err(KernelError::UnsupportedOperation(format!(
                "unknown field {field}"
            )));
        }
        self.background_field = Some(field);
        Ok(())
    }

    fn generate_mesh(&mut self, dim: i32) -> KernelResult<()> {
        self.require_init()?;
        self.require_synced("generate_mesh")?;
        if !(0..=3).contains(&dim) {
            return Err(KernelError::InvalidShape(format!(
                "cannot mesh dimension {dim}"
            )));
        }
        self.mesh_dim = Some(dim);
        Ok(())
    }

    fn write_mesh(&mut self, path: &Path, format: MeshFormat, binary: bool) -> KernelResult<()> {
        self.require_init()?;
        if self.mesh_dim.is_none() {
            return Err(KernelError::MeshNotGenerated);
        }
        let version = match format {
            MeshFormat::Msh2 => "2.2",
            MeshFormat::Msh4 => "4.1",
        };
        let file_type = i32::from(binary);
        let mut file = std::fs::File::create(path)?;
        writeln!(file, "$MeshFormat")?;
        writeln!(file, "{version} {file_type} 8")?;
        writeln!(file, "$EndMeshFormat")?;
        let mut groups: Vec<(&(i32, i32), &Vec<i32>)> = self.physical_groups.iter().collect();
        groups.sort_by_key(|(key, _)| **key);
        writeln!(file, "$PhysicalNames")?;
        writeln!(file, "{}", groups.len())?;
        for ((dim, id), _) in &groups {
            writeln!(file, "{dim} {id} \"physical_{dim}_{id}\"")?;
        }
        writeln!(file, "$EndPhysicalNames")?;
        Ok(())
    }
}
