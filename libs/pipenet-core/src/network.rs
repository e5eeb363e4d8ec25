//! # Pipe Network
//!
//! A [`Network`] grows a branching pipe solid from an inlet cylinder. Each
//! `add_*` call builds a piece at the origin, orients it, and translates it
//! onto one of the network's open outlets; a T-junction opens a second
//! outlet that later pieces can attach to.
//!
//! [`Network::generate`] is the point of no return: it installs the sizing
//! fields, fuses the pieces into one solid, registers the physical groups,
//! meshes, and writes the requested output files. After that the network is
//! frozen; adding pieces or transforming it is an [`Error::InvalidState`].
//!
//! ## Physical identifiers
//!
//! Surface identifiers count from 1: the inlet first, then the open outlets
//! in the order their pieces were added, then the no-slip walls. The volume
//! gets identifier 1 in dimension 3.

use std::path::PathBuf;

use glam::DVec3;
use tracing::{debug, warn};

use config::constants::{
    BACKGROUND_MESH_SIZE, DEFAULT_MESH_SIZE, MATCH_TOLERANCE, MIN_BEND_RADIUS_FACTOR,
};
use pipenet_kernel::{DimTag, Kernel, MeshFormat, Session};

use crate::algebra::unit;
use crate::error::{Error, Result};
use crate::orient::Rotation;
use crate::pieces::{self, PipePiece};
use crate::report::{self, round_small, JunctionReport, NetworkReport, SurfaceReport, WallReport};
use crate::sizing;
use crate::surface::Surface;

// =============================================================================
// GENERATION OPTIONS
// =============================================================================

/// Output options for [`Network::generate`].
///
/// With no filename the mesh is generated but nothing is written; asking for
/// the info or XML report without a filename is an error.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Output basename; extensions are appended per file kind.
    pub filename: Option<PathBuf>,
    /// Write the mesh in binary rather than ASCII.
    pub binary: bool,
    /// On-disk mesh format.
    pub format: MeshFormat,
    /// Also write `<filename>.txt` with surface identifiers and poses.
    pub write_info: bool,
    /// Also write `<filename>.xml` with the same information.
    pub write_xml: bool,
}

// =============================================================================
// NETWORK
// =============================================================================

/// An open outlet: either a piece's downstream end or its branch end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutletRef {
    Main(usize),
    Tee(usize),
}

/// A registered no-slip wall group.
#[derive(Debug, Clone)]
struct WallGroup {
    id: i32,
    centre: DVec3,
}

/// A branching pipe network under construction.
///
/// Borrows the kernel session for its whole lifetime, so two networks can
/// never fight over one model.
pub struct Network<'s, K: Kernel> {
    session: &'s mut Session<K>,
    pieces: Vec<PipePiece>,
    /// Open outlets, in physical-identifier order.
    frontier: Vec<OutletRef>,
    /// The fused solid, present once [`Network::generate`] has run.
    vol: Option<DimTag>,
    /// Physical surface id plus a snapshot of the surface it covers,
    /// inlet first.
    physical_in_out: Vec<(i32, Surface)>,
    physical_walls: Vec<WallGroup>,
    physical_volume: Option<i32>,
}

impl<'s, K: Kernel> Network<'s, K> {
    /// Starts a network with its inlet cylinder.
    ///
    /// The inlet surface's stored direction points outward (against the
    /// flow), so boundary-condition vectors can be computed uniformly for
    /// every in/out surface. A non-positive `mesh_size` falls back to the
    /// default with a warning.
    pub fn new(
        session: &'s mut Session<K>,
        length: f64,
        radius: f64,
        direction: DVec3,
        mesh_size: f64,
    ) -> Result<Self> {
        let mesh_size = effective_mesh_size(mesh_size);
        let kernel = session.kernel();
        kernel.set_max_mesh_size(mesh_size)?;
        let mut piece = pieces::cylinder(kernel, length, radius, direction, mesh_size)?;
        piece.in_surface.direction = -piece.in_surface.direction;
        debug!(length, radius, "started network");
        Ok(Self {
            session,
            pieces: vec![piece],
            frontier: vec![OutletRef::Main(0)],
            vol: None,
            physical_in_out: Vec::new(),
            physical_walls: Vec::new(),
            physical_volume: None,
        })
    }

    // -------------------------------------------------------------------------
    // Growing the network
    // -------------------------------------------------------------------------

    /// Adds a straight pipe at outlet `out_number`.
    ///
    /// `out_number` counts outlets from 1 in the order they were opened;
    /// zero (or one) means the first outlet.
    pub fn add_cylinder(&mut self, length: f64, mesh_size: f64, out_number: usize) -> Result<()> {
        self.require_open()?;
        let mesh_size = effective_mesh_size(mesh_size);
        let slot = self.resolve_out_number(out_number)?;
        let outlet = self.outlet_surface(self.frontier[slot])?.clone();
        let kernel = self.session.kernel();
        let piece = pieces::cylinder(kernel, length, outlet.radius, outlet.direction, mesh_size)?;
        self.attach(slot, piece, false)
    }

    /// Adds a smooth bend turning the flow to `out_direction`.
    ///
    /// The bend radius must clear the pipe radius with some margin or the
    /// swept solid self-intersects.
    pub fn add_curve(
        &mut self,
        out_direction: DVec3,
        bend_radius: f64,
        mesh_size: f64,
        out_number: usize,
    ) -> Result<()> {
        self.require_open()?;
        let mesh_size = effective_mesh_size(mesh_size);
        let slot = self.resolve_out_number(out_number)?;
        let outlet = self.outlet_surface(self.frontier[slot])?.clone();
        if bend_radius < MIN_BEND_RADIUS_FACTOR * outlet.radius {
            return Err(Error::InvalidArgument(
                "bend radius is not large enough".to_string(),
            ));
        }
        let kernel = self.session.kernel();
        let piece = pieces::curve(
            kernel,
            outlet.radius,
            outlet.direction,
            out_direction,
            bend_radius,
            mesh_size,
        )?;
        self.attach(slot, piece, false)
    }

    /// Adds a sharp (mitered) bend turning the flow to `out_direction`.
    pub fn add_mitered(
        &mut self,
        out_direction: DVec3,
        mesh_size: f64,
        out_number: usize,
    ) -> Result<()> {
        self.require_open()?;
        let mesh_size = effective_mesh_size(mesh_size);
        let slot = self.resolve_out_number(out_number)?;
        let outlet = self.outlet_surface(self.frontier[slot])?.clone();
        let kernel = self.session.kernel();
        let piece = pieces::mitered(
            kernel,
            outlet.radius,
            outlet.direction,
            out_direction,
            mesh_size,
        )?;
        self.attach(slot, piece, false)
    }

    /// Adds a straight pipe whose radius transitions to `new_radius` over
    /// the final `change_length` of its run.
    pub fn add_change_radius(
        &mut self,
        length: f64,
        new_radius: f64,
        change_length: f64,
        mesh_size: f64,
        out_number: usize,
    ) -> Result<()> {
        self.require_open()?;
        let mesh_size = effective_mesh_size(mesh_size);
        let slot = self.resolve_out_number(out_number)?;
        let outlet = self.outlet_surface(self.frontier[slot])?.clone();
        let kernel = self.session.kernel();
        let piece = pieces::change_radius(
            kernel,
            length,
            change_length,
            outlet.radius,
            new_radius,
            outlet.direction,
            mesh_size,
        )?;
        self.attach(slot, piece, false)
    }

    /// Adds a T-junction whose branch faces `t_direction`, opening a new
    /// outlet on the branch. `None` or a non-positive `t_radius` defaults to
    /// the pipe radius.
    pub fn add_t_junction(
        &mut self,
        t_direction: DVec3,
        t_radius: Option<f64>,
        mesh_size: f64,
        out_number: usize,
    ) -> Result<()> {
        self.require_open()?;
        let mesh_size = effective_mesh_size(mesh_size);
        let slot = self.resolve_out_number(out_number)?;
        let outlet = self.outlet_surface(self.frontier[slot])?.clone();
        let t_radius = t_radius.filter(|&r| r > 0.0).unwrap_or(outlet.radius);
        let kernel = self.session.kernel();
        let piece = pieces::t_junction(
            kernel,
            outlet.radius,
            t_radius,
            outlet.direction,
            t_direction,
            mesh_size,
        )?;
        self.attach(slot, piece, true)
    }

    /// Translates the oriented piece onto the chosen outlet and records it.
    fn attach(&mut self, slot: usize, mut piece: PipePiece, opens_tee: bool) -> Result<()> {
        let target = self.outlet_surface(self.frontier[slot])?.centre;
        let vol = piece
            .vol
            .ok_or_else(|| Error::InternalInvariant("piece has no volume".to_string()))?;
        let kernel = self.session.kernel();
        kernel.translate(&[vol], target - piece.in_surface.centre)?;
        kernel.synchronize()?;
        piece.refresh_centres(kernel)?;
        debug!(piece = self.pieces.len(), "attached piece");
        self.pieces.push(piece);
        let index = self.pieces.len() - 1;
        if opens_tee {
            self.frontier.push(OutletRef::Tee(index));
        }
        self.frontier[slot] = OutletRef::Main(index);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Whole-network transforms
    // -------------------------------------------------------------------------

    /// Rotates the whole network about the axis through the origin.
    ///
    /// Only valid before [`Network::generate`].
    pub fn rotate_network(&mut self, axis: DVec3, angle: f64) -> Result<()> {
        self.require_open()?;
        let axis = unit(axis)?;
        let vols = self.piece_volumes()?;
        let kernel = self.session.kernel();
        kernel.rotate(&vols, DVec3::ZERO, axis, angle)?;
        kernel.synchronize()?;
        let rotation = Rotation { axis, angle };
        for piece in &mut self.pieces {
            piece.refresh_centres(kernel)?;
            piece.rotate_directions(&rotation);
        }
        Ok(())
    }

    /// Translates the whole network by `offset`.
    ///
    /// Only valid before [`Network::generate`].
    pub fn translate_network(&mut self, offset: DVec3) -> Result<()> {
        self.require_open()?;
        let vols = self.piece_volumes()?;
        let kernel = self.session.kernel();
        kernel.translate(&vols, offset)?;
        kernel.synchronize()?;
        for piece in &mut self.pieces {
            piece.refresh_centres(kernel)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Generation
    // -------------------------------------------------------------------------

    /// Fuses, meshes, and writes the network.
    ///
    /// Returns the report of physical identifiers and surface poses whether
    /// or not any files were requested.
    pub fn generate(&mut self, options: &GenerateOptions) -> Result<NetworkReport> {
        if options.filename.is_none() && (options.write_info || options.write_xml) {
            return Err(Error::InvalidArgument(
                "write_info and write_xml need a filename".to_string(),
            ));
        }
        self.require_open()?;

        sizing::apply_mesh_fields(self.session.kernel(), &self.pieces, BACKGROUND_MESH_SIZE)?;
        let walls = self.fuse_network()?;
        self.assign_physical_groups(&walls)?;
        self.session.kernel().generate_mesh(3)?;

        let report = self.build_report()?;
        if let Some(base) = &options.filename {
            self.session
                .kernel()
                .write_mesh(&base.with_extension("msh"), options.format, options.binary)?;
            if options.write_info {
                report::write_info(&report, &base.with_extension("txt"))?;
            }
            if options.write_xml {
                report::write_xml(&report, &base.with_extension("xml"))?;
            }
        }
        Ok(report)
    }

    /// Fuses all pieces into one solid and re-homes the end surfaces onto
    /// it, returning the remaining (wall) faces.
    fn fuse_network(&mut self) -> Result<Vec<DimTag>> {
        if self.vol.is_some() {
            return Err(Error::InvalidState(
                "network is already fused".to_string(),
            ));
        }
        let vols = self.piece_volumes()?;
        let vol = if vols.len() == 1 {
            vols[0]
        } else {
            let kernel = self.session.kernel();
            // Touching caps are fine; any deeper contact would fuse into a
            // solid that is not a pipe.
            for (i, &candidate) in vols.iter().enumerate() {
                let rest: Vec<DimTag> = vols
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &v)| v)
                    .collect();
                if !kernel.intersect(&[candidate], &rest, false, false)?.is_empty() {
                    return Err(Error::GeometryOverlap);
                }
            }
            let fused = kernel
                .fuse(&vols[..1], &vols[1..], true, true)?
                .first()
                .copied()
                .ok_or_else(|| {
                    Error::InternalInvariant("network fusion produced no volume".to_string())
                })?;
            kernel.synchronize()?;
            for piece in &mut self.pieces {
                piece.vol = None;
            }
            fused
        };
        self.vol = Some(vol);
        self.match_end_faces(vol)
    }

    /// Matches the fused solid's boundary faces to the expected end
    /// surfaces by centroid and updates the surface handles. Every end
    /// surface must match exactly one face; anything else means the fusion
    /// changed the network's topology.
    fn match_end_faces(&mut self, vol: DimTag) -> Result<Vec<DimTag>> {
        let mut expected = vec![self.pieces[0].in_surface.centre];
        let frontier = self.frontier.clone();
        for &outlet in &frontier {
            expected.push(self.outlet_surface(outlet)?.centre);
        }

        let kernel = self.session.kernel();
        let faces = kernel.boundary(&[vol], false, false)?;
        let mut assigned: Vec<Option<DimTag>> = vec![None; expected.len()];
        let mut walls = Vec::new();
        for face in faces {
            let centroid = kernel.center_of_mass(face)?;
            let hits: Vec<usize> = expected
                .iter()
                .enumerate()
                .filter(|&(_, centre)| (*centre - centroid).length() < MATCH_TOLERANCE)
                .map(|(i, _)| i)
                .collect();
            match hits[..] {
                [] => walls.push(face),
                [index] => {
                    if assigned[index].is_some() {
                        return Err(Error::InternalInvariant(format!(
                            "two faces match the end surface at {}",
                            expected[index]
                        )));
                    }
                    assigned[index] = Some(face);
                }
                _ => {
                    return Err(Error::InternalInvariant(format!(
                        "face {face} matches more than one end surface"
                    )))
                }
            }
        }

        let mut tags = Vec::with_capacity(assigned.len());
        for (i, slot) in assigned.into_iter().enumerate() {
            tags.push(slot.ok_or_else(|| {
                Error::InternalInvariant(format!(
                    "end surface at {} was lost in fusion",
                    expected[i]
                ))
            })?);
        }
        self.pieces[0].in_surface.dimtag = tags[0];
        for (i, &outlet) in frontier.iter().enumerate() {
            self.outlet_surface_mut(outlet)?.dimtag = tags[i + 1];
        }
        Ok(walls)
    }

    /// Registers physical groups: in/out surfaces first, then walls, then
    /// the volume.
    fn assign_physical_groups(&mut self, walls: &[DimTag]) -> Result<()> {
        let vol = self
            .vol
            .ok_or_else(|| Error::InternalInvariant("groups before fusion".to_string()))?;
        let mut ends = vec![self.pieces[0].in_surface.clone()];
        let frontier = self.frontier.clone();
        for &outlet in &frontier {
            ends.push(self.outlet_surface(outlet)?.clone());
        }

        let kernel = self.session.kernel();
        for surface in ends {
            let id = kernel.add_physical_group(2, &[surface.dimtag.tag])?;
            self.physical_in_out.push((id, surface));
        }
        for &face in walls {
            let centre = kernel.center_of_mass(face)?;
            let id = kernel.add_physical_group(2, &[face.tag])?;
            self.physical_walls.push(WallGroup { id, centre });
        }
        self.physical_volume = Some(kernel.add_physical_group(3, &[vol.tag])?);
        Ok(())
    }

    fn build_report(&self) -> Result<NetworkReport> {
        let volume_id = self.physical_volume.ok_or_else(|| {
            Error::InternalInvariant("report requested before physical groups".to_string())
        })?;
        let in_out = self
            .physical_in_out
            .iter()
            .map(|(id, surface)| SurfaceReport {
                physical_id: *id,
                centre: round_small(surface.centre),
                outward_direction: round_small(surface.direction),
            })
            .collect();
        let walls = self
            .physical_walls
            .iter()
            .map(|wall| WallReport {
                physical_id: wall.id,
                centre: round_small(wall.centre),
            })
            .collect();
        let mut junctions = Vec::new();
        for piece in &self.pieces {
            junctions.push(JunctionReport {
                centre: round_small(piece.out_surface.centre),
                direction: round_small(piece.out_surface.direction),
            });
            if let Some(t_surface) = &piece.t_surface {
                junctions.push(JunctionReport {
                    centre: round_small(t_surface.centre),
                    direction: round_small(t_surface.direction),
                });
            }
        }
        Ok(NetworkReport {
            in_out,
            walls,
            junctions,
            volume_id,
        })
    }

    // -------------------------------------------------------------------------
    // Boundary conditions
    // -------------------------------------------------------------------------

    /// Inflow velocity vectors for the given physical surface identifiers,
    /// with the magnitude set by a Reynolds number.
    ///
    /// The magnitude is `Re * viscosity / (2 * radius * density)` per
    /// surface; the direction points into the pipe. At least one in/out
    /// surface must be left unassigned to carry the zero-pressure outlet.
    pub fn velocities_by_reynolds(
        &self,
        ids: &[i32],
        reynolds: f64,
        density: f64,
        viscosity: f64,
    ) -> Result<Vec<DVec3>> {
        self.velocities(ids, |surface| {
            reynolds * viscosity / (2.0 * surface.radius * density)
        })
    }

    /// Inflow velocity vectors for the given physical surface identifiers,
    /// all with the same speed.
    pub fn velocities_by_magnitude(&self, ids: &[i32], magnitude: f64) -> Result<Vec<DVec3>> {
        self.velocities(ids, |_| magnitude.abs())
    }

    fn velocities(&self, ids: &[i32], speed: impl Fn(&Surface) -> f64) -> Result<Vec<DVec3>> {
        if self.physical_in_out.is_empty() {
            return Err(Error::InvalidState(
                "velocities need a generated network".to_string(),
            ));
        }
        if ids.len() > self.physical_in_out.len() - 1 {
            return Err(Error::InvalidArgument(
                "at least one surface must be left for the outlet".to_string(),
            ));
        }
        ids.iter()
            .map(|&id| {
                let index = usize::try_from(id - 1).map_err(|_| {
                    Error::InvalidArgument("physical surface ids count from 1".to_string())
                })?;
                let (_, surface) = self.physical_in_out.get(index).ok_or_else(|| {
                    Error::InvalidArgument(format!("no in/out surface with id {id}"))
                })?;
                Ok(-unit(surface.direction)? * speed(surface))
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The pieces added so far, in insertion order.
    pub fn pieces(&self) -> &[PipePiece] {
        &self.pieces
    }

    /// Number of open outlets.
    pub fn outlet_count(&self) -> usize {
        self.frontier.len()
    }

    /// Physical identifiers of the in/out surfaces, inlet first. Empty
    /// before [`Network::generate`].
    pub fn inlet_outlet_ids(&self) -> Vec<i32> {
        self.physical_in_out.iter().map(|(id, _)| *id).collect()
    }

    /// Physical identifiers of the wall surfaces. Empty before
    /// [`Network::generate`].
    pub fn wall_ids(&self) -> Vec<i32> {
        self.physical_walls.iter().map(|wall| wall.id).collect()
    }

    /// Physical identifier of the fused volume, once generated.
    pub fn volume_id(&self) -> Option<i32> {
        self.physical_volume
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require_open(&self) -> Result<()> {
        if self.vol.is_some() {
            return Err(Error::InvalidState(
                "network is already fused".to_string(),
            ));
        }
        Ok(())
    }

    /// Maps a 1-based outlet number to a frontier index; zero means the
    /// first outlet.
    fn resolve_out_number(&self, out_number: usize) -> Result<usize> {
        if out_number > self.frontier.len() {
            return Err(Error::InvalidArgument(
                "out piece does not exist".to_string(),
            ));
        }
        Ok(out_number.saturating_sub(1))
    }

    fn outlet_surface(&self, outlet: OutletRef) -> Result<&Surface> {
        match outlet {
            OutletRef::Main(index) => Ok(&self.pieces[index].out_surface),
            OutletRef::Tee(index) => self.pieces[index].t_surface.as_ref().ok_or_else(|| {
                Error::InternalInvariant("branch outlet on a piece with no branch".to_string())
            }),
        }
    }

    fn outlet_surface_mut(&mut self, outlet: OutletRef) -> Result<&mut Surface> {
        match outlet {
            OutletRef::Main(index) => Ok(&mut self.pieces[index].out_surface),
            OutletRef::Tee(index) => self.pieces[index].t_surface.as_mut().ok_or_else(|| {
                Error::InternalInvariant("branch outlet on a piece with no branch".to_string())
            }),
        }
    }

    fn piece_volumes(&self) -> Result<Vec<DimTag>> {
        self.pieces
            .iter()
            .map(|piece| {
                piece.vol.ok_or_else(|| {
                    Error::InternalInvariant("piece volume already consumed".to_string())
                })
            })
            .collect()
    }
}

/// Falls back to the default mesh size on non-positive input.
fn effective_mesh_size(mesh_size: f64) -> f64 {
    if mesh_size <= 0.0 {
        warn!(
            mesh_size,
            default = DEFAULT_MESH_SIZE,
            "non-positive mesh size, using default"
        );
        DEFAULT_MESH_SIZE
    } else {
        mesh_size
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    use pipenet_kernel::MockKernel;

    fn session() -> Session<MockKernel> {
        Session::new(MockKernel::new()).expect("mock session")
    }

    fn vec_eq(a: DVec3, b: DVec3) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-9);
    }

    #[test]
    fn test_inlet_direction_points_outward() {
        let mut session = session();
        let network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        vec_eq(network.pieces()[0].in_surface.direction, -DVec3::X);
        vec_eq(network.pieces()[0].out_surface.direction, DVec3::X);
        assert_eq!(network.outlet_count(), 1);
    }

    #[test]
    fn test_non_positive_mesh_size_defaults() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.0).unwrap();
        assert_eq!(
            network.session.kernel().max_mesh_size(),
            Some(DEFAULT_MESH_SIZE)
        );
    }

    #[test]
    fn test_pieces_chain_along_outlets() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        network.add_cylinder(2.0, 0.1, 0).unwrap();
        network.add_curve(DVec3::Z, 1.0, 0.1, 0).unwrap();

        let pieces = network.pieces();
        vec_eq(pieces[1].in_surface.centre, DVec3::X);
        vec_eq(pieces[1].out_surface.centre, DVec3::new(3.0, 0.0, 0.0));
        // Quarter bend of radius 1 starting at x = 3.
        vec_eq(pieces[2].out_surface.centre, DVec3::new(4.0, 0.0, 1.0));
        vec_eq(pieces[2].out_surface.direction, DVec3::Z);
        // Straight pieces and bends never open new outlets.
        assert_eq!(network.outlet_count(), 1);
    }

    #[test]
    fn test_out_number_past_frontier_is_rejected() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        assert!(matches!(
            network.add_cylinder(1.0, 0.1, 5),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_small_bend_radius_is_rejected() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        assert!(matches!(
            network.add_curve(DVec3::Z, 0.25, 0.1, 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_generate_straight_pipe_ids() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        let report = network.generate(&GenerateOptions::default()).unwrap();

        assert_eq!(network.inlet_outlet_ids(), vec![1, 2]);
        assert_eq!(network.wall_ids(), vec![3]);
        assert_eq!(network.volume_id(), Some(1));

        assert_eq!(report.in_out.len(), 2);
        vec_eq(report.in_out[0].centre, DVec3::ZERO);
        vec_eq(report.in_out[0].outward_direction, -DVec3::X);
        vec_eq(report.in_out[1].centre, DVec3::X);
        assert_eq!(report.volume_id, 1);
    }

    #[test]
    fn test_generate_twice_is_an_error() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        network.generate(&GenerateOptions::default()).unwrap();
        assert!(matches!(
            network.generate(&GenerateOptions::default()),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_add_after_generate_is_an_error() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        network.generate(&GenerateOptions::default()).unwrap();
        assert!(matches!(
            network.add_cylinder(1.0, 0.1, 0),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            network.rotate_network(DVec3::Y, 1.0),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            network.translate_network(DVec3::X),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_t_junction_network_ids() {
        let mut session = session();
        let mut network =
            Network::new(&mut session, 1.0, 0.25, DVec3::new(1.0, 1.0, 1.0), 0.1).unwrap();
        network.add_t_junction(DVec3::X, None, 0.1, 0).unwrap();
        // The junction opens a second outlet.
        assert_eq!(network.outlet_count(), 2);
        network.generate(&GenerateOptions::default()).unwrap();

        assert_eq!(network.inlet_outlet_ids(), vec![1, 2, 3]);
        assert_eq!(network.wall_ids(), vec![4, 5, 6, 7]);
        assert_eq!(network.volume_id(), Some(1));
    }

    #[test]
    fn test_non_positive_t_radius_defaults_to_pipe_radius() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        network
            .add_t_junction(DVec3::Z, Some(-1.0), 0.1, 0)
            .unwrap();

        let tee = network.pieces()[1]
            .t_surface
            .as_ref()
            .expect("junction has a branch surface");
        assert_relative_eq!(tee.radius, 0.25);
    }

    #[test]
    fn test_lost_end_surface_is_fatal() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        // A centroid no boundary face can match makes the inlet unmatchable.
        network.pieces[0].in_surface.centre = DVec3::new(9.0, 9.0, 9.0);
        assert!(matches!(
            network.generate(&GenerateOptions::default()),
            Err(Error::InternalInvariant(_))
        ));
    }

    #[test]
    fn test_ambiguous_end_surface_match_is_fatal() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        // Two expected centroids on the same point: the outlet face now
        // matches both, which must not be resolved silently.
        network.pieces[0].in_surface.centre = network.pieces[0].out_surface.centre;
        assert!(matches!(
            network.generate(&GenerateOptions::default()),
            Err(Error::InternalInvariant(_))
        ));
    }

    #[test]
    fn test_velocities_on_t_junction() {
        let mut session = session();
        let mut network =
            Network::new(&mut session, 1.0, 0.25, DVec3::new(1.0, 1.0, 1.0), 0.1).unwrap();
        network.add_t_junction(DVec3::X, None, 0.1, 0).unwrap();
        network.generate(&GenerateOptions::default()).unwrap();

        // Re = 10000 in water-like material at r = 0.25 gives 0.02 m/s.
        let velocities = network
            .velocities_by_reynolds(&[1, 3], 10000.0, 1000.0, 0.001)
            .unwrap();
        vec_eq(velocities[1], DVec3::new(-0.02, 0.0, 0.0));
        // The inlet inflow opposes its outward direction.
        vec_eq(velocities[0], 0.02 * DVec3::new(1.0, 1.0, 1.0).normalize());

        let velocities = network.velocities_by_magnitude(&[1, 3], 0.02).unwrap();
        vec_eq(velocities[1], DVec3::new(-0.02, 0.0, 0.0));
    }

    #[test]
    fn test_velocities_argument_checks() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();

        // Before generation there are no physical surfaces.
        assert!(matches!(
            network.velocities_by_magnitude(&[1], 0.02),
            Err(Error::InvalidState(_))
        ));

        network.generate(&GenerateOptions::default()).unwrap();
        // One surface must remain for the zero-pressure outlet.
        assert!(matches!(
            network.velocities_by_magnitude(&[1, 2], 0.02),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            network.velocities_by_magnitude(&[0], 0.02),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            network.velocities_by_magnitude(&[9], 0.02),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rotate_network_carries_directions() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        network.add_curve(DVec3::Z, 1.0, 0.1, 0).unwrap();
        network.rotate_network(DVec3::Y, -FRAC_PI_2).unwrap();

        let pieces = network.pieces();
        vec_eq(pieces[1].out_surface.direction, -DVec3::X);
        vec_eq(pieces[0].in_surface.direction, -DVec3::Z);
        // The curve outlet was at (2, 0, 1); x -> -z, z -> x.
        vec_eq(pieces[1].out_surface.centre, DVec3::new(-1.0, 0.0, 2.0));
    }

    #[test]
    fn test_translate_network_moves_centres() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        let offset = DVec3::new(1.0, 2.0, 3.0);
        network.translate_network(offset).unwrap();
        vec_eq(network.pieces()[0].in_surface.centre, offset);
        vec_eq(network.pieces()[0].out_surface.centre, DVec3::X + offset);
    }

    #[test]
    fn test_overlapping_pieces_fail_fusion() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        // Force a second piece over the same span as the first.
        let piece = {
            let kernel = network.session.kernel();
            pieces::cylinder(kernel, 1.0, 0.25, DVec3::X, 0.1).unwrap()
        };
        network.pieces.push(piece);
        assert!(matches!(
            network.generate(&GenerateOptions::default()),
            Err(Error::GeometryOverlap)
        ));
    }

    #[test]
    fn test_reports_need_a_filename() {
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        let options = GenerateOptions {
            write_info: true,
            ..GenerateOptions::default()
        };
        assert!(matches!(
            network.generate(&options),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_generate_writes_requested_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session();
        let mut network = Network::new(&mut session, 1.0, 0.25, DVec3::X, 0.1).unwrap();
        let options = GenerateOptions {
            filename: Some(dir.path().join("net")),
            write_info: true,
            write_xml: true,
            ..GenerateOptions::default()
        };
        network.generate(&options).unwrap();

        assert!(dir.path().join("net.msh").exists());
        assert!(dir.path().join("net.txt").exists());
        assert!(dir.path().join("net.xml").exists());
    }
}
