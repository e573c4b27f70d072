//! Safe SQL builder for descriptor-driven entities: identifiers from descriptors only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
