//! Replay side of the mirror: rebuilds a tree from a snapshot and keeps it in
//! sync by applying [`mirror::DiffBatch`]es in order.
//!
//! The target is anything implementing [`TreeMutator`]; [`dom::Document`] is
//! the in-tree implementation.

mod applier;
mod config;
mod error;
mod session;
mod target;

pub use crate::applier::{Applier, ApplyReport, retry_budget};
pub use crate::config::ReplayConfig;
pub use crate::error::ApplyError;
pub use crate::session::ReplaySession;
pub use crate::target::TreeMutator;
