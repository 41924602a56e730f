//! The geometry object tree handed over by the model compiler.
//!
//! Objects form a small closed set of kinds ([`ObjectKind`]). The tree is
//! flattened by [`walk`], an explicit stack traversal that carries each
//! node's dotted path and its composed transform.

use mote_core::{Aabb, ReleaseIndex, SpeciesId, Vec3};

use crate::transform::Transform;

/// A named node of the object tree.
#[derive(Clone, Debug)]
pub struct ObjectNode {
    /// Name, unique among siblings.
    pub name: String,
    /// Placement relative to the parent.
    pub transform: Transform,
    /// What the node is.
    pub kind: ObjectKind,
}

/// The kinds of geometry object.
#[derive(Clone, Debug)]
pub enum ObjectKind {
    /// A grouping node.
    Meta(Vec<ObjectNode>),
    /// A triangle mesh.
    Polygon(PolygonMesh),
    /// An axis-aligned box, expanded to twelve triangles.
    Box(BoxSpec),
    /// A release program anchored in the tree; its location is moved by
    /// the accumulated transform.
    ReleaseSite(ReleaseIndex),
}

impl ObjectNode {
    /// A grouping node.
    pub fn meta(name: impl Into<String>, children: Vec<ObjectNode>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            kind: ObjectKind::Meta(children),
        }
    }

    /// A mesh node.
    pub fn polygon(name: impl Into<String>, mesh: PolygonMesh) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            kind: ObjectKind::Polygon(mesh),
        }
    }

    /// A box node.
    pub fn cuboid(name: impl Into<String>, spec: BoxSpec) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            kind: ObjectKind::Box(spec),
        }
    }

    /// A release-site node.
    pub fn release_site(name: impl Into<String>, release: ReleaseIndex) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            kind: ObjectKind::ReleaseSite(release),
        }
    }

    /// Replace the node's transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Triangle mesh with named regions.
#[derive(Clone, Debug, Default)]
pub struct PolygonMesh {
    /// Corner positions in object space.
    pub vertices: Vec<Vec3>,
    /// Corner indices, counter-clockwise seen from the front.
    pub triangles: Vec<[u32; 3]>,
    /// Named subsets of triangles. A region named `ALL` sets the
    /// properties of the implicit whole-object region.
    pub regions: Vec<RegionDef>,
}

/// Definition of a named set of triangles.
#[derive(Clone, Debug, Default)]
pub struct RegionDef {
    /// Name within the object.
    pub name: String,
    /// Triangle indices within the object.
    pub polygons: Vec<u32>,
    /// Surface class applied to the region's walls.
    pub surface_class: Option<SpeciesId>,
    /// Whether per-species counts are kept for this region.
    pub counted: bool,
    /// Whether molecule hits on the region's walls are reported.
    pub report_hits: bool,
}

impl RegionDef {
    /// A plain region over `polygons`.
    pub fn new(name: impl Into<String>, polygons: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            polygons,
            ..Self::default()
        }
    }
}

/// Faces of a [`BoxSpec`], in triangle order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoxFace {
    /// The `-x` face.
    Left,
    /// The `+x` face.
    Right,
    /// The `-y` face.
    Front,
    /// The `+y` face.
    Back,
    /// The `-z` face.
    Bottom,
    /// The `+z` face.
    Top,
}

impl BoxFace {
    /// All faces in triangle order.
    pub const ALL: [BoxFace; 6] = [
        BoxFace::Left,
        BoxFace::Right,
        BoxFace::Front,
        BoxFace::Back,
        BoxFace::Bottom,
        BoxFace::Top,
    ];

    /// The two triangle indices of this face in [`BoxSpec::to_mesh`].
    pub fn polygons(self) -> [u32; 2] {
        let i = self as u32;
        [2 * i, 2 * i + 1]
    }
}

/// An axis-aligned box between two corners.
#[derive(Clone, Debug)]
pub struct BoxSpec {
    /// One corner.
    pub corner: Vec3,
    /// The opposite corner.
    pub opposite: Vec3,
    /// Regions over the box's twelve triangles (see [`BoxFace::polygons`]).
    pub regions: Vec<RegionDef>,
}

impl BoxSpec {
    /// A box with no named regions.
    pub fn new(corner: Vec3, opposite: Vec3) -> Self {
        Self {
            corner,
            opposite,
            regions: Vec::new(),
        }
    }

    /// Expand to a closed mesh with outward normals.
    pub fn to_mesh(&self) -> PolygonMesh {
        let lo = self.corner.min(self.opposite);
        let hi = self.corner.max(self.opposite);
        // Corner `i` takes x from bit 0, y from bit 1, z from bit 2.
        let vertices = (0..8u32)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { lo.x } else { hi.x },
                    if i & 2 == 0 { lo.y } else { hi.y },
                    if i & 4 == 0 { lo.z } else { hi.z },
                )
            })
            .collect();
        let triangles = vec![
            [0, 4, 6],
            [0, 6, 2],
            [1, 3, 7],
            [1, 7, 5],
            [0, 1, 5],
            [0, 5, 4],
            [2, 6, 7],
            [2, 7, 3],
            [0, 2, 3],
            [0, 3, 1],
            [4, 5, 7],
            [4, 7, 6],
        ];
        PolygonMesh {
            vertices,
            triangles,
            regions: self.regions.clone(),
        }
    }
}

/// A node reached by [`walk`].
#[derive(Clone, Debug)]
pub struct Instance<'a> {
    /// Dotted path from the root.
    pub path: String,
    /// Composed transform from object space to world space.
    pub transform: Transform,
    /// The node itself.
    pub node: &'a ObjectNode,
}

/// Visit every node in pre-order (children in declaration order).
pub fn walk(roots: &[ObjectNode]) -> Vec<Instance<'_>> {
    let mut out = Vec::new();
    let mut stack: Vec<(&ObjectNode, Option<usize>)> = roots.iter().rev().map(|n| (n, None)).collect();

    while let Some((node, parent)) = stack.pop() {
        let (path, transform) = match parent.map(|p| &out[p]) {
            Some(Instance { path, transform, .. }) => {
                let mut full = String::with_capacity(path.len() + 1 + node.name.len());
                full.push_str(path);
                full.push('.');
                full.push_str(&node.name);
                (full, node.transform.then(transform))
            }
            None => (node.name.clone(), node.transform),
        };
        let me = out.len();
        out.push(Instance { path, transform, node });
        if let ObjectKind::Meta(children) = &node.kind {
            stack.extend(children.iter().rev().map(|c| (c, Some(me))));
        }
    }
    out
}

/// World-space bounding box of every mesh and box in the tree.
pub fn bounding_box(roots: &[ObjectNode]) -> Aabb {
    let mut bb = Aabb::empty();
    for inst in walk(roots) {
        match &inst.node.kind {
            ObjectKind::Polygon(mesh) => {
                mesh.vertices
                    .iter()
                    .for_each(|v| bb.include(inst.transform.apply_point(*v)));
            }
            ObjectKind::Box(spec) => {
                spec.to_mesh()
                    .vertices
                    .iter()
                    .for_each(|v| bb.include(inst.transform.apply_point(*v)));
            }
            ObjectKind::Meta(_) | ObjectKind::ReleaseSite(_) => {}
        }
    }
    bb
}
