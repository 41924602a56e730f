//! Integration test: edge transforms across shared triangle edges.
//!
//! For randomly folded pairs of triangles, mapping a point from wall A's
//! frame to wall B's and back through B's own (independently computed)
//! edge constants must return the original point.

use mote_core::{NotifyLevel, Vec2, Vec3, WallIndex};
use mote_geom::{GeometryStore, ObjectNode, PolygonMesh, VertexMove};
use proptest::prelude::*;

fn pair(apex_a: Vec3, apex_b: Vec3) -> GeometryStore {
    let mesh = PolygonMesh {
        vertices: vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), apex_a, apex_b],
        // Edge 0-1 is shared; the second triangle walks it backwards.
        triangles: vec![[0, 1, 2], [1, 0, 3]],
        regions: Vec::new(),
    };
    GeometryStore::build(&[ObjectNode::polygon("pair", mesh)], NotifyLevel::Error).unwrap()
}

fn round_trip(store: &GeometryStore, p: Vec2) -> Vec2 {
    let a = store.wall(WallIndex(0));
    let b = store.wall(WallIndex(1));
    let e_ab = a.edge_towards(WallIndex(1)).unwrap();
    let e_ba = b.edge_towards(WallIndex(0)).unwrap();
    let fwd = a.edges[e_ab].unwrap();
    let back = b.edges[e_ba].unwrap();
    back.apply(fwd.apply(p))
}

#[test]
fn coplanar_pair_maps_shared_corners() {
    let store = pair(Vec3::new(0.2, 1.0, 0.0), Vec3::new(0.7, -1.0, 0.0));
    let a = store.wall(WallIndex(0));
    let b = store.wall(WallIndex(1));
    let t = a.edges[0].unwrap();
    for v in [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)] {
        let mapped = t.apply(a.frame.xyz_to_uv(v));
        assert!((mapped - b.frame.xyz_to_uv(v)).length() < 1e-12);
    }
    // Unfolding a coplanar pair is just a change of frame.
    let p = Vec3::new(0.5, -0.3, 0.0);
    let mapped = t.apply(a.frame.xyz_to_uv(p));
    assert!((mapped - b.frame.xyz_to_uv(p)).length() < 1e-12);
}

#[test]
fn edges_follow_moved_vertices() {
    let mut store = pair(Vec3::new(0.2, 1.0, 0.0), Vec3::new(0.7, -1.0, 0.3));
    store
        .move_vertices(&[VertexMove {
            vertex: mote_core::VertexIndex(1),
            displacement: Vec3::new(0.5, 0.2, -0.1),
        }])
        .unwrap();
    let p = Vec2::new(0.3, 0.1);
    assert!((round_trip(&store, p) - p).length() < 1e-9);
    let a = store.wall(WallIndex(0));
    let b = store.wall(WallIndex(1));
    let moved = store.vertex(mote_core::VertexIndex(1));
    let mapped = a.edges[0].unwrap().apply(a.frame.xyz_to_uv(moved));
    assert!((mapped - b.frame.xyz_to_uv(moved)).length() < 1e-9);
}

proptest! {
    #[test]
    fn edge_crossing_round_trip(
        ax in -2.0f64..2.0, ay in 0.2f64..2.0, az in -2.0f64..2.0,
        bx in -2.0f64..2.0, by in -2.0f64..-0.2, bz in -2.0f64..2.0,
        pu in -1.0f64..2.0, pv in -1.0f64..2.0,
    ) {
        let store = pair(Vec3::new(ax, ay, az), Vec3::new(bx, by, bz));
        let p = Vec2::new(pu, pv);
        prop_assert!((round_trip(&store, p) - p).length() < 1e-9);
    }
}
