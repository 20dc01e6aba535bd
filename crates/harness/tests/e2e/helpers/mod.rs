//! Shared E2E test helpers.
//!
//! Provides scripted implementations of the harness seams (environment,
//! image build, probe writer, record stream, container runtime) plus
//! wire-frame factories, so scenarios can exercise full lifecycle flows
//! deterministically.

pub mod doubles;
pub mod frames;
