//! Controller layer: routing UI actions onto the backend command queue.

pub mod orchestration;
