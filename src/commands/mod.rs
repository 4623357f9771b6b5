use crate::context::AppContext;
use async_trait::async_trait;

pub mod embed;

pub use embed::EmbedCommand;

#[async_trait]
pub trait Command: Send + Sync {
    async fn execute(&self, ctx: &AppContext) -> anyhow::Result<()>;
}
