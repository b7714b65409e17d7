pub mod city;
pub mod elevation;
pub mod geojson;
pub mod metro;

pub use city::*;
pub use elevation::*;
pub use geojson::*;
pub use metro::*;
