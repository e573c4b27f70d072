pub mod entities;
pub mod resolved;
pub mod settings;
pub mod types;

pub use resolved::*;
pub use settings::*;
pub use types::*;
