//! Core domain model and rules for TutorBot.
//!
//! Nothing in this crate performs I/O: generated text comes in as strings,
//! persistence happens elsewhere.

pub mod catalog;
pub mod exam;
pub mod model;
pub mod normalize;
pub mod practice;
pub mod session;
pub mod text;

pub use model::*;
