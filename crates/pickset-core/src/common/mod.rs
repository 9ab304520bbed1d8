mod candidate;
mod filter;
mod types;

pub use candidate::*;
pub use filter::*;
pub use types::*;
