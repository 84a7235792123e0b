//! Wayfarer turns a position and an appetite for walking into a real-world quest.
//!
//! The pieces, leaves first:
//!
//! - [`geo`]: great-circle distance, projection, and bearings.
//! - [`smoother`]: stabilizes a noisy stream of position fixes.
//! - [`path`]: remaining distance along a street path and deviation from it.
//! - [`discovery`]: concurrent multi-tier place search with randomized ranking.
//! - [`rotation`]: place history, daily themes, headings, and narrative seeds.
//! - [`orchestrator`]: the mission lifecycle that ties them together.
//!
//! External services are reached through the traits in [`collaborators`];
//! [`offline`] provides network-free stand-ins.

pub mod collaborators;
pub mod config;
pub mod discovery;
pub mod generation;
pub mod geo;
pub mod model;
pub mod narrative;
pub mod offline;
pub mod orchestrator;
pub mod path;
pub mod rotation;
pub mod smoother;
pub mod storage;
