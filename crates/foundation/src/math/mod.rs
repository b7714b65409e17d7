pub mod local;
pub mod mercator;
pub mod vec;

pub use local::*;
pub use mercator::*;
pub use vec::*;
