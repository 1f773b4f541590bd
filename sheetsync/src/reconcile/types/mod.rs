//! Core types for reconciliation

mod batch;
mod lookup;
mod outcome;
mod value;

pub use batch::*;
pub use lookup::*;
pub use outcome::*;
pub use value::*;
