//! Crate root: public surface for reconstructing a centerline tree from a
//! binary segmentation.
//!
//! This module is the single canonical entry point for downstream users.
//! The public surface is one function, [`trace`], plus the `Volume`,
//! `BinaryMask`, `Tree`/`Node`, and `TraceConfig` types it operates on.
//!
//! ## Invariants
//!
//! - Every committed node id is unique and at least `1`; the soma is id `0`.
//! - After `trace` returns, every non-soma node's `parent_id` references an
//!   existing node.
//! - `WorkingTime` state is monotonic: a voxel that leaves `Unvisited` never
//!   returns to it.
//! - Every node's radius is at least `1`.
//!
//! These invariants are enforced by construction across the submodules; a
//! violation surfaces as a precise `Err`, never silently.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Dense 3D volumes addressed by integer voxel coordinates.
pub mod volume;
/// Spatial gradient of the time-crossing map and trilinear sampling.
pub mod gradient;
/// Fourth-order Runge–Kutta stepping against the gradient.
pub mod integrator;
/// Local radius estimation from the binary mask.
pub mod radius;
/// Forward confidence accounting along a branch.
pub mod confidence;
/// The mutable tri-state time map episodes consume voxels from.
pub mod working_time;
/// Tracer configuration and validation.
pub mod config;
/// Tree/node model and the seven-column text serialization.
pub mod node;
/// A single back-tracking episode.
pub mod tracer;
/// Spatial matching and committing branches into the tree.
pub mod tree_builder;
/// Sweeps a finished branch's tube out of the working time map.
pub mod eraser;
/// Drives episodes until the coverage target is reached.
pub mod trace_loop;
/// Reattachment, leaf pruning, and connected-component cleanup.
pub mod postprocess;
/// Speed-image helper for preparing fast-marching input.
pub mod speed;

pub use crate::config::{ConfigError, TraceConfig, Variant};
pub use crate::gradient::GradientError;
pub use crate::node::{Node, NodeType, Tree};
pub use crate::volume::{BinaryMask, Volume};

use crate::eraser::Eraser;
use crate::gradient::GradientField;
use crate::working_time::WorkingTime;

/// Errors that can prevent [`trace`] from producing a tree at all.
///
/// Conditions that the original tool treats as ordinary termination
/// (an empty foreground, or the working time map running dry before the
/// coverage target is hit) are not represented here — both still return
/// `Ok(Tree)`, per the error design in the design notes. Only malformed
/// input reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// The supplied configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// A gradient sample failed outside the guarded stepping path (not
    /// expected in normal operation, where out-of-bounds and non-finite
    /// samples are handled as stop reasons instead).
    #[error("gradient field error: {0}")]
    Gradient(#[from] GradientError),
    /// `binary_mask` and `time_map` were built with different shapes.
    #[error("mask shape {mask:?} does not match time map shape {time_map:?}")]
    ShapeMismatch { mask: (usize, usize, usize), time_map: (usize, usize, usize) },
}

/// Reconstruct a centerline tree from `binary_mask` and `time_map` (a
/// fast-marching time-crossing map seeded from `soma_pos`), rooted at a soma
/// of `soma_radius`.
///
/// Validates `config`, then drives [`trace_loop::run`] followed by
/// [`postprocess::run`]. An empty foreground short-circuits to a tree
/// containing only the soma node.
pub fn trace(
    binary_mask: &volume::BinaryMask,
    time_map: &volume::Volume<f64>,
    soma_pos: [f64; 3],
    soma_radius: f64,
    config: &TraceConfig,
) -> Result<node::Tree, TraceError> {
    config.validate()?;

    if binary_mask.shape() != time_map.shape() {
        tracing::error!(mask = ?binary_mask.shape(), time_map = ?time_map.shape(), "shape mismatch");
        return Err(TraceError::ShapeMismatch { mask: binary_mask.shape(), time_map: time_map.shape() });
    }

    if binary_mask.foreground_count() == 0 {
        let mut tree = node::Tree::new();
        tree.push(node::Node::soma(soma_pos, soma_radius));
        return Ok(tree);
    }

    let field = GradientField::from_time_map(time_map);
    if field_is_degenerate(&field, binary_mask) {
        tracing::warn!("gradient field is degenerate (all-zero) over the foreground region");
    }

    let mut working = WorkingTime::new(time_map, binary_mask);
    let mut eraser = Eraser::new(binary_mask.shape());
    let mut tree = node::Tree::new();

    trace_loop::run(&mut tree, &field, binary_mask, &mut working, &mut eraser, config, soma_pos, soma_radius);

    postprocess::run(&mut tree, binary_mask, config, soma_pos, soma_radius);

    Ok(tree)
}

fn field_is_degenerate(field: &GradientField, mask: &volume::BinaryMask) -> bool {
    mask.iter().filter(|&(_, &fg)| fg).all(|(c, _)| {
        let p = [c.0 as f64, c.1 as f64, c.2 as f64];
        field.sample(p).map(|g| g == [0.0, 0.0, 0.0]).unwrap_or(true)
    })
}
