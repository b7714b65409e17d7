pub mod composition;
pub mod request;
pub mod source;

pub use composition::*;
pub use request::*;
pub use source::*;
