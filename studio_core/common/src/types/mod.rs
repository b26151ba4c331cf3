pub mod connections;
pub mod files;

pub use connections::*;
pub use files::*;
