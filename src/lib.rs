//! Arena spatial state manager for swarm-foraging simulations
//!
//! A concurrent 2D grid tracking blocks, caches, and a nest, with:
//!
//! - Block distribution strategies (random, cluster, multi-cluster,
//!   power-law) selected by a dispatcher at initialization
//! - A composable lock-mask protocol over the blocks/caches/grid critical
//!   sections, so operations acquire only what their caller does not already
//!   hold
//! - Priority-ordered drop dispatch: into a cache, rerouted on spatial
//!   conflict, or placed directly
//!
//! The surrounding simulation owns robot control, cache formation policy,
//! block respawn policy, and metrics aggregation; this crate owns the shared
//! spatial state they all act on.

pub mod arena;
pub mod config;
pub mod dist;
pub mod metrics;
pub mod util;
