pub mod part;
pub mod speaker;

pub use part::*;
pub use speaker::*;
