pub mod constants;
pub mod error;
pub mod transaction;
pub mod types;

pub use constants::*;
pub use error::{KhuError, KhuResult};
pub use transaction::*;
pub use types::*;
