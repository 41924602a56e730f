//! The geometry store: vertices, walls, objects and regions.

use indexmap::IndexMap;
use mote_core::{
    Aabb, MoleculeId, NotifyLevel, ObjectId, RegionIndex, ReleaseIndex, ResourceError, Vec3,
    VertexIndex, WallIndex,
};
use smallvec::SmallVec;

use crate::edge::EdgeTransform;
use crate::error::GeometryError;
use crate::grid::SurfaceGrid;
use crate::object::{walk, ObjectKind, ObjectNode, PolygonMesh};
use crate::region::Region;
use crate::transform::Transform;
use crate::wall::{Wall, WallFrame};

/// Direction of the enclosure-test ray. Deliberately not axis-aligned so
/// rays rarely graze mesh edges.
const ENCLOSURE_RAY: Vec3 = Vec3::new(1.0, 0.367_879_441, 0.119_202_922);

/// An instantiated polygon or box object.
#[derive(Clone, Debug)]
pub struct ObjectInfo {
    /// Dotted path in the object tree.
    pub path: String,
    /// Walls created for the object (degenerate triangles excluded).
    pub walls: Vec<WallIndex>,
    /// The object's implicit whole-object region.
    pub all_region: RegionIndex,
}

/// A release site found in the object tree.
#[derive(Clone, Debug)]
pub struct ReleaseSite {
    /// Dotted path in the object tree.
    pub path: String,
    /// The release program anchored here.
    pub release: ReleaseIndex,
    /// Composed transform of the site.
    pub transform: Transform,
}

/// Displacement of one vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexMove {
    /// The vertex to move.
    pub vertex: VertexIndex,
    /// Translation to apply.
    pub displacement: Vec3,
}

/// What a [`GeometryStore::move_vertices`] call changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovedWalls {
    /// Walls whose frame was recomputed, ascending.
    pub walls: Vec<WallIndex>,
    /// Surface molecules removed from grids that shrank.
    pub displaced: Vec<(WallIndex, MoleculeId)>,
}

/// Owns every vertex, wall, object and region of a simulation.
#[derive(Clone, Debug, Default)]
pub struct GeometryStore {
    vertices: Vec<Vec3>,
    vertex_walls: Vec<SmallVec<[WallIndex; 8]>>,
    walls: Vec<Wall>,
    objects: Vec<ObjectInfo>,
    object_names: IndexMap<String, ObjectId>,
    regions: Vec<Region>,
    region_names: IndexMap<String, RegionIndex>,
    release_sites: Vec<ReleaseSite>,
    removed_walls: usize,
}

impl GeometryStore {
    /// Instantiate an object tree.
    ///
    /// Degenerate triangles are handled according to `degenerate`:
    /// rejected with [`GeometryError::DegenerateWall`], or removed (with a
    /// warning under [`NotifyLevel::Warn`]).
    pub fn build(roots: &[ObjectNode], degenerate: NotifyLevel) -> Result<Self, GeometryError> {
        let mut store = Self::default();
        for inst in walk(roots) {
            match &inst.node.kind {
                ObjectKind::Meta(_) => {}
                ObjectKind::Polygon(mesh) => {
                    store.add_mesh(&inst.path, &inst.transform, mesh, degenerate)?;
                }
                ObjectKind::Box(spec) => {
                    store.add_mesh(&inst.path, &inst.transform, &spec.to_mesh(), degenerate)?;
                }
                ObjectKind::ReleaseSite(release) => store.release_sites.push(ReleaseSite {
                    path: inst.path.clone(),
                    release: *release,
                    transform: inst.transform,
                }),
            }
        }
        store.connect_edges();
        store.mark_closed_regions();
        log::debug!(
            "geometry: {} vertices, {} walls, {} regions, {} degenerate removed",
            store.vertices.len(),
            store.walls.len(),
            store.regions.len(),
            store.removed_walls
        );
        Ok(store)
    }

    fn add_mesh(
        &mut self,
        path: &str,
        transform: &Transform,
        mesh: &PolygonMesh,
        degenerate: NotifyLevel,
    ) -> Result<(), GeometryError> {
        if self.object_names.contains_key(path) {
            return Err(GeometryError::DuplicateObject { path: path.to_string() });
        }
        let object = ObjectId(self.objects.len() as u32);
        let base = self.vertices.len() as u32;

        for (i, v) in mesh.vertices.iter().enumerate() {
            let p = transform.apply_point(*v);
            if !p.is_finite() {
                return Err(GeometryError::NonFiniteVertex {
                    object: path.to_string(),
                    vertex: i,
                });
            }
            self.vertices.push(p);
            self.vertex_walls.push(SmallVec::new());
        }

        let mut local_walls: Vec<Option<WallIndex>> = vec![None; mesh.triangles.len()];
        let mut object_walls = Vec::with_capacity(mesh.triangles.len());
        for (polygon, tri) in mesh.triangles.iter().enumerate() {
            if let Some(&bad) = tri.iter().find(|&&c| c as usize >= mesh.vertices.len()) {
                return Err(GeometryError::VertexOutOfRange {
                    object: path.to_string(),
                    polygon,
                    vertex: bad as usize,
                    count: mesh.vertices.len(),
                });
            }
            let vertices = tri.map(|c| VertexIndex(base + c));
            let corners = vertices.map(|v| self.vertices[v.index()]);
            let Some(frame) = WallFrame::compute(&corners) else {
                let area = WallFrame::area_of(&corners);
                match degenerate {
                    NotifyLevel::Error => {
                        return Err(GeometryError::DegenerateWall {
                            object: path.to_string(),
                            polygon,
                            area,
                        })
                    }
                    NotifyLevel::Warn => log::warn!(
                        "removing degenerate polygon {polygon} of '{path}' (area {area:e})"
                    ),
                    NotifyLevel::Cope => {}
                }
                self.removed_walls += 1;
                continue;
            };

            let idx = WallIndex(self.walls.len() as u32);
            for v in vertices {
                self.vertex_walls[v.index()].push(idx);
            }
            self.walls.push(Wall {
                vertices,
                object,
                polygon: polygon as u32,
                frame,
                neighbors: [None; 3],
                edges: [None; 3],
                regions: SmallVec::new(),
                surface_class: None,
                report_hits: false,
                grid: None,
            });
            local_walls[polygon] = Some(idx);
            object_walls.push(idx);
        }

        let all_def = mesh.regions.iter().find(|r| r.name == "ALL");
        let all_region = self.add_region(
            format!("{path}[ALL]"),
            object,
            object_walls.clone(),
            all_def.and_then(|d| d.surface_class),
            all_def.is_some_and(|d| d.counted),
            all_def.is_some_and(|d| d.report_hits),
        );
        for def in mesh.regions.iter().filter(|r| r.name != "ALL") {
            let name = format!("{path}[{}]", def.name);
            let mut walls = Vec::with_capacity(def.polygons.len());
            for &p in &def.polygons {
                let slot = local_walls.get(p as usize).ok_or_else(|| {
                    GeometryError::RegionPolygonOutOfRange {
                        region: name.clone(),
                        polygon: p as usize,
                        count: mesh.triangles.len(),
                    }
                })?;
                // Removed degenerate polygons drop out of their regions.
                walls.extend(*slot);
            }
            walls.sort_unstable();
            walls.dedup();
            self.add_region(name, object, walls, def.surface_class, def.counted, def.report_hits);
        }

        self.object_names.insert(path.to_string(), object);
        self.objects.push(ObjectInfo {
            path: path.to_string(),
            walls: object_walls,
            all_region,
        });
        Ok(())
    }

    fn add_region(
        &mut self,
        name: String,
        object: ObjectId,
        walls: Vec<WallIndex>,
        surface_class: Option<mote_core::SpeciesId>,
        counted: bool,
        report_hits: bool,
    ) -> RegionIndex {
        let idx = RegionIndex(self.regions.len() as u32);
        let mut area = 0.0;
        for &w in &walls {
            let wall = &mut self.walls[w.index()];
            wall.regions.push(idx);
            if surface_class.is_some() {
                wall.surface_class = surface_class;
            }
            wall.report_hits |= report_hits;
            area += wall.frame.area;
        }
        self.region_names.insert(name.clone(), idx);
        self.regions.push(Region {
            name,
            object,
            walls,
            surface_class,
            counted,
            report_hits,
            closed: false,
            area,
        });
        idx
    }

    /// Link walls that share an edge and compute their edge transforms.
    fn connect_edges(&mut self) {
        let mut by_edge: IndexMap<(VertexIndex, VertexIndex), SmallVec<[(WallIndex, u8); 2]>> =
            IndexMap::new();
        for (w, wall) in self.walls.iter().enumerate() {
            for e in 0..3 {
                let a = wall.vertices[e];
                let b = wall.vertices[(e + 1) % 3];
                let key = if a < b { (a, b) } else { (b, a) };
                by_edge
                    .entry(key)
                    .or_default()
                    .push((WallIndex(w as u32), e as u8));
            }
        }
        for (key, sharing) in by_edge {
            if sharing.len() > 2 {
                log::debug!(
                    "edge {}-{} shared by {} walls; linking the first two",
                    key.0,
                    key.1,
                    sharing.len()
                );
            }
            if let [(a, ea), (b, eb), ..] = sharing[..] {
                self.walls[a.index()].neighbors[ea as usize] = Some(b);
                self.walls[b.index()].neighbors[eb as usize] = Some(a);
            }
        }
        for w in 0..self.walls.len() {
            self.refresh_edges(WallIndex(w as u32));
        }
    }

    /// Recompute the transforms of every linked edge of `w`.
    fn refresh_edges(&mut self, w: WallIndex) {
        for e in 0..3 {
            let edge = self.compute_edge(w, e);
            self.walls[w.index()].edges[e] = edge;
        }
    }

    fn compute_edge(&self, w: WallIndex, e: usize) -> Option<EdgeTransform> {
        let wall = &self.walls[w.index()];
        let nb = wall.neighbors[e]?;
        let other = &self.walls[nb.index()];
        let nb_edge = other.edge_towards(w)?;
        let shared = [
            self.vertices[wall.vertices[e].index()],
            self.vertices[wall.vertices[(e + 1) % 3].index()],
        ];
        EdgeTransform::compute(&wall.frame, &other.frame, shared, nb, nb_edge as u8)
    }

    fn mark_closed_regions(&mut self) {
        let mut member = vec![false; self.walls.len()];
        for r in 0..self.regions.len() {
            for &w in &self.regions[r].walls {
                member[w.index()] = true;
            }
            let closed = !self.regions[r].walls.is_empty()
                && self.regions[r].walls.iter().all(|&w| {
                    self.walls[w.index()]
                        .neighbors
                        .iter()
                        .all(|n| n.is_some_and(|n| member[n.index()]))
                });
            for &w in &self.regions[r].walls {
                member[w.index()] = false;
            }
            self.regions[r].closed = closed;
        }
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// All vertices.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Position of one vertex.
    pub fn vertex(&self, v: VertexIndex) -> Vec3 {
        self.vertices[v.index()]
    }

    /// All walls.
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// One wall.
    pub fn wall(&self, w: WallIndex) -> &Wall {
        &self.walls[w.index()]
    }

    /// One wall, mutably.
    pub fn wall_mut(&mut self, w: WallIndex) -> &mut Wall {
        &mut self.walls[w.index()]
    }

    /// Corner positions of a wall.
    pub fn wall_corners(&self, w: WallIndex) -> [Vec3; 3] {
        self.walls[w.index()].vertices.map(|v| self.vertices[v.index()])
    }

    /// Instantiated objects.
    pub fn objects(&self) -> &[ObjectInfo] {
        &self.objects
    }

    /// Look up an object by path.
    pub fn object_by_path(&self, path: &str) -> Option<ObjectId> {
        self.object_names.get(path).copied()
    }

    /// All regions.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// One region.
    pub fn region(&self, r: RegionIndex) -> &Region {
        &self.regions[r.index()]
    }

    /// Look up a region by full name (`path[name]`).
    pub fn region_by_name(&self, name: &str) -> Option<RegionIndex> {
        self.region_names.get(name).copied()
    }

    /// Release sites found in the tree.
    pub fn release_sites(&self) -> &[ReleaseSite] {
        &self.release_sites
    }

    /// Number of degenerate triangles removed during build.
    pub fn removed_wall_count(&self) -> usize {
        self.removed_walls
    }

    /// Bounding box of all vertices.
    pub fn bounding_box(&self) -> Aabb {
        let mut bb = Aabb::empty();
        self.vertices.iter().for_each(|v| bb.include(*v));
        bb
    }

    /// Bounding box of one wall.
    pub fn wall_bounds(&self, w: WallIndex) -> Aabb {
        let [a, b, c] = self.wall_corners(w);
        let mut bb = Aabb::new(a, b);
        bb.include(c);
        bb
    }

    /// The wall's surface grid, creating it on first use.
    pub fn ensure_grid(&mut self, w: WallIndex) -> Result<&mut SurfaceGrid, ResourceError> {
        let wall = &mut self.walls[w.index()];
        if wall.grid.is_none() {
            wall.grid = Some(SurfaceGrid::new(&wall.frame)?);
        }
        wall.grid.as_mut().ok_or(ResourceError::exhausted("surface grid"))
    }

    // ── Enclosure ──────────────────────────────────────────────────

    /// Whether `p` lies inside closed region `r`, by ray parity.
    pub fn point_in_region(&self, p: Vec3, r: RegionIndex) -> bool {
        let region = &self.regions[r.index()];
        if !region.closed {
            return false;
        }
        let bb = self.bounding_box();
        let reach = (bb.extent().length() + (p - bb.center()).length()) * 2.0 + 1.0;
        let ray = ENCLOSURE_RAY.normalized() * reach;
        let crossings = region
            .walls
            .iter()
            .filter(|w| self.walls[w.index()].frame.intersect_segment(p, ray).is_some())
            .count();
        crossings % 2 == 1
    }

    /// Counted closed regions that contain `p`.
    pub fn regions_enclosing(&self, p: Vec3) -> SmallVec<[RegionIndex; 4]> {
        (0..self.regions.len())
            .map(|r| RegionIndex(r as u32))
            .filter(|&r| {
                let region = &self.regions[r.index()];
                region.counted && region.closed
            })
            .filter(|&r| self.point_in_region(p, r))
            .collect()
    }

    // ── Dynamic geometry ───────────────────────────────────────────

    /// Move vertices and recompute every dependent wall, grid and edge.
    ///
    /// All moves are validated before any is applied: if a wall would
    /// become degenerate the store is left unchanged.
    pub fn move_vertices(&mut self, moves: &[VertexMove]) -> Result<MovedWalls, GeometryError> {
        let count = self.vertices.len();
        if let Some(bad) = moves.iter().find(|m| m.vertex.index() >= count) {
            return Err(GeometryError::UnknownVertex {
                vertex: bad.vertex.index(),
                count,
            });
        }

        let saved: Vec<Vec3> = moves.iter().map(|m| self.vertices[m.vertex.index()]).collect();
        for m in moves {
            self.vertices[m.vertex.index()] += m.displacement;
        }

        let mut walls: Vec<WallIndex> = moves
            .iter()
            .flat_map(|m| self.vertex_walls[m.vertex.index()].iter().copied())
            .collect();
        walls.sort_unstable();
        walls.dedup();

        let mut frames = Vec::with_capacity(walls.len());
        for &w in &walls {
            let corners = self.wall_corners(w);
            match WallFrame::compute(&corners) {
                Some(f) => frames.push(f),
                None => {
                    for (m, old) in moves.iter().zip(&saved).rev() {
                        self.vertices[m.vertex.index()] = *old;
                    }
                    let wall = &self.walls[w.index()];
                    return Err(GeometryError::DegenerateWall {
                        object: self.objects[wall.object.index()].path.clone(),
                        polygon: wall.polygon as usize,
                        area: WallFrame::area_of(&corners),
                    });
                }
            }
        }

        let mut displaced = Vec::new();
        for (&w, frame) in walls.iter().zip(frames) {
            let wall = &mut self.walls[w.index()];
            wall.frame = frame;
            if let Some(grid) = wall.grid.as_mut() {
                displaced.extend(grid.initialize(&frame)?.into_iter().map(|m| (w, m)));
            }
        }

        let mut touched = walls.clone();
        for &w in &walls {
            touched.extend(self.walls[w.index()].neighbors.iter().flatten().copied());
        }
        touched.sort_unstable();
        touched.dedup();
        for w in touched {
            self.refresh_edges(w);
        }

        for r in 0..self.regions.len() {
            let area = self.regions[r]
                .walls
                .iter()
                .map(|w| self.walls[w.index()].frame.area)
                .sum();
            self.regions[r].area = area;
        }

        Ok(MovedWalls { walls, displaced })
    }
}
