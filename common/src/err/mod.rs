use crate::err::schema_error::SchemaError;

pub mod schema_error;

pub type SResult<T> = Result<T, SchemaError>;
