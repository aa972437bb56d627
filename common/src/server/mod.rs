use crate::err::schema_error::SchemaError;

/// Server have start / shutdown functions
#[async_trait::async_trait]
pub trait Server: Send {
    async fn start(&mut self) -> Result<(), SchemaError>;

    async fn shutdown(&mut self, graceful: bool) -> Result<(), SchemaError>;
}
