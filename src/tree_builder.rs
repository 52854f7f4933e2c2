//! Spatial matching between a point and the tree, and committing a finished
//! branch into the tree.

use crate::config::Variant;
use crate::node::{Node, NodeType, Tree, PARENT_UNRESOLVED, SOMA_ID};
use crate::tracer::{ConnectHint, StopReason};

/// Test whether `p` (with query radius `query_radius`) touches the nearest
/// existing node closely enough to count as reaching the tree.
///
/// Rivulet-2: `touched = query_radius > d || nearest.radius > d`.
/// Rivulet-1 (with `wiring` slack): `touched = query_radius > wiring*d ||
/// nearest.radius*wiring > d`.
///
/// Returns `(false, -2)` if the tree is empty.
pub fn match_point(tree: &Tree, p: [f64; 3], query_radius: f64, variant: Variant, wiring: f64) -> (bool, i64) {
    let Some((nearest, d)) = tree.nearest(p) else {
        return (false, -2);
    };
    let touched = match variant {
        Variant::Rivulet2 => query_radius > d || nearest.radius > d,
        Variant::Rivulet1 => query_radius > wiring * d || nearest.radius * wiring > d,
    };
    (touched, nearest.id)
}

/// Commit a finished branch to the tree, assigning contiguous ids starting
/// at `tree.next_id()`, wiring parent links tail-ward per `connect_hint`,
/// and attempting to attach the new head back onto the pre-existing tree.
///
/// `points[0]` is the episode head (the furthest unvisited voxel the
/// episode started from); `points.last()` is the tail (the end nearest
/// existing tissue or the soma). A single-point branch gets the plain
/// dendrite type rather than `ENDPOINT`, matching the source's `add2swc`,
/// which only marks a head as an endpoint when the branch has more than
/// one node. A touched node is re-typed to `FORK` unless its id is `1`,
/// preserving the source's `connectid is not 1` guard (`add2swc`,
/// trace.py:591) under the equality semantics spec §9 calls for.
pub fn add_branch(
    tree: &mut Tree,
    points: &[[f64; 3]],
    radii: &[f64],
    connect_hint: ConnectHint,
    stop_reason: StopReason,
) {
    assert_eq!(points.len(), radii.len());
    assert!(!points.is_empty(), "cannot commit an empty branch");

    let n = points.len();
    let start_id = tree.next_id();

    // Head-to-tree attachment: matched against the tree as it stood before
    // this branch's own nodes are inserted.
    if let Some((nearest, d)) = tree.nearest(points[0]) {
        let touched = radii[0] > d || nearest.radius > d;
        if touched {
            let matched_id = nearest.id;
            if let Some(m) = tree.get_mut(matched_id) {
                if m.parent_id == PARENT_UNRESOLVED {
                    m.parent_id = start_id;
                }
            }
        }
    }

    let connect_id = match connect_hint {
        ConnectHint::Soma => Some(SOMA_ID),
        ConnectHint::Touched(id) => Some(id),
        ConnectHint::Unresolved => None,
    };

    for (i, (&pos, &radius)) in points.iter().zip(radii.iter()).enumerate() {
        let id = start_id + i as i64;
        let is_tail = i == n - 1;

        let (parent_id, mut node_type) = if is_tail {
            (connect_id.unwrap_or(PARENT_UNRESOLVED), NodeType::DENDRITE)
        } else {
            let pid = start_id + i as i64 + 1;
            let nt = if i == 0 && n > 1 { NodeType::ENDPOINT } else { NodeType::DENDRITE };
            (pid, nt)
        };

        if is_tail {
            node_type = match stop_reason {
                StopReason::NotMoving => NodeType::STALLED,
                StopReason::ValueError => NodeType::VALUE_ERROR,
                _ => node_type,
            };
        }

        tree.push(Node { id, node_type, pos, radius, parent_id });
    }

    if let ConnectHint::Touched(id) = connect_hint {
        if id != 1 {
            if let Some(m) = tree.get_mut(id) {
                m.node_type = NodeType::FORK;
            }
        }
    }
}
