pub mod paper;
pub mod shelf;
pub mod tag;

pub use paper::*;
pub use shelf::*;
pub use tag::*;
