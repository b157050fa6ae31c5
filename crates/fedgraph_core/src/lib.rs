pub mod error;
pub mod registry;
pub mod schema;
pub mod statement;
pub mod tables;
pub mod value;

pub use error::{StoreError, StoreResult};
pub use registry::{SchemaRegistry, registry};
pub use schema::*;
pub use tables::*;
pub use value::*;
