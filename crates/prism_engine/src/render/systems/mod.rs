//! Active rendering systems
//!
//! Stateful runtime systems that feed the frame pipeline.

pub mod lighting;
