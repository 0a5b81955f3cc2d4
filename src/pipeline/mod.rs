pub mod corrector;
pub mod generator;

pub use corrector::*;
pub use generator::*;
