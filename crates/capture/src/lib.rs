//! Capture side of the mirror: serializes a live [`dom::Document`] and turns
//! its observed mutations into [`mirror::DiffBatch`]es.
//!
//! Ids come from the session's [`mirror::Registry`]; every node that travels
//! in a snapshot or an addition is bound before it is serialized.

mod batcher;
mod config;
mod normalize;
mod session;
mod snapshot;

pub use crate::batcher::MutationBatcher;
pub use crate::config::CaptureConfig;
pub use crate::normalize::INERT_TAG;
pub use crate::session::CaptureSession;
pub use crate::snapshot::Snapshotter;
