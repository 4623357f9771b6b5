use super::Command;
use crate::context::AppContext;
use crate::docker::composer::{DockerComposer, EmbedRequest};
use crate::docker::image_manager::DockerImageManager;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};

/// Command to embed the Falcon sidecar into an existing image
pub struct EmbedCommand {
    /// The existing image to modify
    pub source_image: String,
    /// The Falcon image to copy files and directories from
    pub falcon_image: String,
    /// The tag of the modified image to create
    pub target_image: String,
    /// The Falcon CID value to embed in the final image
    pub cid: String,
}

#[async_trait]
impl Command for EmbedCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let image_manager = DockerImageManager::new(ctx);

        let source = image_manager.ensure_image(&self.source_image).await?;
        let startup_command = source.startup.startup_command();
        info!(
            "Source image {} (pulled: {}) resolves to command {:?}",
            source.reference,
            source.pulled,
            startup_command.args()
        );
        if startup_command.is_empty() {
            warn!(
                "Source image {} defines neither an entrypoint nor a cmd; the embedded image will start with CMD []",
                source.reference
            );
        }

        let composer = DockerComposer::new(ctx.embed_env().staging_image());
        let composed = composer.compose(&EmbedRequest {
            falcon_image: &self.falcon_image,
            source_image: &self.source_image,
            target_image: &self.target_image,
            startup_command: &startup_command,
            cid: &self.cid,
        })?;
        composer
            .validate_dockerfile(&composed.dockerfile_content)
            .context("Dockerfile validation failed")?;

        println!("Resulting dockerfile:\n\n{}\n", composed.dockerfile_content);

        debug!(
            "Building {} with staging image {}",
            composed.image_tag,
            ctx.embed_env().staging_image()
        );
        image_manager.build_image(&composed).await?;

        println!("Successfully built new image {}", composed.image_tag);
        Ok(())
    }
}
