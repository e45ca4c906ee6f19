//! Neural separation model interfaces
//!
//! Provides the [`SeparationModel`] trait the pipeline consumes, the
//! [`NullModel`] stand-in for "no model installed", and (behind the
//! `model-mock` feature or in tests) a deterministic mock implementation.

mod model;

#[cfg(any(test, feature = "model-mock"))]
mod mock;

pub use model::{ModelStems, NullModel, SeparationModel};

#[cfg(any(test, feature = "model-mock"))]
pub use mock::MockSeparationModel;
