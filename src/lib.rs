//! LEAP: evidence-driven transcript end extension
//!
//! Reconciles a reference gene annotation with capOrTail peak clusters
//! (CAGE / poly-A sites) corroborated by two transcript evidence sources,
//! then rewrites the annotation's terminal coordinates with provenance tags.

pub mod commands;
pub mod filter;
pub mod gff;
pub mod grab;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod peaks;
pub mod prep;
pub mod reconcile;
pub mod rewriter;
pub mod selector;
pub mod split;
pub mod stats;
pub mod types;

pub use types::*;
