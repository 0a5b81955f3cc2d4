pub mod combine;
pub mod overlap;
pub mod speakers;

pub use combine::*;
pub use overlap::*;
pub use speakers::*;
