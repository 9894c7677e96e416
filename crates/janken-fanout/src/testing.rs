//! Test doubles shared by this crate's unit tests.

use async_trait::async_trait;
use janken_core::Connection;
use janken_registry::ConnectionRegistry;
use mockall::mock;

mock! {
    pub Registry {}

    #[async_trait]
    impl ConnectionRegistry for Registry {
        async fn list_connections(&self) -> janken_registry::Result<Vec<Connection>>;
        async fn register(&self, connection: Connection) -> janken_registry::Result<()>;
        async fn remove(&self, connection_id: &str) -> janken_registry::Result<bool>;
    }
}
