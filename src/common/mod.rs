//! Common types, traits, and error definitions for rrt_dubins
//!
//! This module provides the foundational building blocks used across
//! the geometry kernel and the planners.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
