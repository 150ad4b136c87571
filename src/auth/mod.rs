pub mod permissions;
pub mod principal;

pub use permissions::*;
pub use principal::*;
