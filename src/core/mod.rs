pub mod entity;
pub mod error;
pub mod value;

pub use entity::Entity;
pub use error::{DataError, Result, ValidationErrors, Violation};
pub use value::{DataType, Value};
