pub mod error;
pub mod request;
pub mod traits;
pub mod types;

pub use error::*;
pub use request::*;
pub use traits::*;
pub use types::*;
