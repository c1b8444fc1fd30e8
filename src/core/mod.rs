pub mod constants;
pub mod session;
pub mod types;

pub use constants::*;
pub use session::*;
pub use types::*;
