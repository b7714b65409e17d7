pub mod buildings;
pub mod curve;
pub mod model;
pub mod motion;
pub mod search;

pub use buildings::*;
pub use curve::*;
pub use model::*;
pub use motion::*;
pub use search::*;
