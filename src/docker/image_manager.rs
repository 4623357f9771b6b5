//! Docker image management for embed runs
//!
//! This module resolves the source image (pulling it when it is missing
//! locally) and submits composed Dockerfiles to the daemon.

use futures_util::StreamExt;
use log::debug;
use std::fmt;
use std::io::Write;

use crate::context::AppContext;
use crate::context::docker_client::{ImageLookupError, ProgressStream};
use crate::docker::composer::ComposedDockerfile;
use crate::docker::startup_command::ImageStartup;
use crate::error::EmbedError;

/// Repository and tag (or digest) of a reference, as the pull API wants them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullTarget {
    pub repository: String,
    pub tag: String,
}

impl PullTarget {
    /// Split a reference into repository and tag.
    ///
    /// A missing tag means `latest`; pulling with an empty tag would fetch
    /// every tag of the repository. Digests are kept as the tag.
    pub fn parse(reference: &str) -> Self {
        if let Some((repository, digest)) = reference.split_once('@') {
            return Self {
                repository: repository.to_string(),
                tag: digest.to_string(),
            };
        }

        // A ':' before the last '/' belongs to a registry host:port
        let name_start = reference.rfind('/').map_or(0, |i| i + 1);
        match reference[name_start..].rfind(':') {
            Some(i) => Self {
                repository: reference[..name_start + i].to_string(),
                tag: reference[name_start + i + 1..].to_string(),
            },
            None => Self {
                repository: reference.to_string(),
                tag: "latest".to_string(),
            },
        }
    }

    fn is_digest(&self) -> bool {
        self.tag.contains(':')
    }
}

impl fmt::Display for PullTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.is_digest() { '@' } else { ':' };
        write!(f, "{}{separator}{}", self.repository, self.tag)
    }
}

/// Information about a resolved source image
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// The reference as given on the command line
    pub reference: String,
    /// Entrypoint and cmd from the image configuration
    pub startup: ImageStartup,
    /// Whether the image had to be pulled first
    pub pulled: bool,
}

/// Manages the Docker images of an embed run
pub struct DockerImageManager {
    ctx: AppContext,
}

impl DockerImageManager {
    /// Creates a new DockerImageManager from AppContext
    pub fn new(ctx: &AppContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Ensure the source image is available locally and read its configuration
    ///
    /// This method:
    /// - Looks the image up in the local daemon
    /// - If it is missing, pulls it once and looks it up again
    /// - Fails without pulling on any other API error
    pub async fn ensure_image(&self, reference: &str) -> Result<SourceImage, EmbedError> {
        let docker_client = self.ctx.docker_client();

        let (inspect, pulled) = match docker_client.inspect_image(reference).await {
            Ok(inspect) => (inspect, false),
            Err(e @ ImageLookupError::NotFound) => {
                debug!("Lookup of {reference} failed: {e}");
                println!("Source image {reference} is not present locally, pulling");
                self.pull_image(reference).await?;

                let inspect = docker_client
                    .inspect_image(reference)
                    .await
                    .map_err(|e| match e {
                        ImageLookupError::NotFound => {
                            EmbedError::NotFoundAfterPull(reference.to_string())
                        }
                        ImageLookupError::Api(message) => EmbedError::Lookup {
                            reference: reference.to_string(),
                            message,
                        },
                    })?;
                (inspect, true)
            }
            Err(ImageLookupError::Api(message)) => {
                return Err(EmbedError::Lookup {
                    reference: reference.to_string(),
                    message,
                });
            }
        };

        let startup =
            ImageStartup::from_inspect_json(&inspect).map_err(|message| EmbedError::Metadata {
                reference: reference.to_string(),
                message,
            })?;

        Ok(SourceImage {
            reference: reference.to_string(),
            startup,
            pulled,
        })
    }

    /// Pull an image, surfacing the first error the registry reports
    async fn pull_image(&self, reference: &str) -> Result<(), EmbedError> {
        let target = PullTarget::parse(reference);
        debug!(
            "Pulling repository {} with tag {}",
            target.repository, target.tag
        );

        let pull_error = |message: String| EmbedError::Pull {
            reference: reference.to_string(),
            message,
        };

        let mut pull_stream = self
            .ctx
            .docker_client()
            .pull_image(&target.repository, &target.tag)
            .await
            .map_err(pull_error)?;

        while let Some(result) = pull_stream.next().await {
            match result {
                Ok(status) => debug!("{status}"),
                Err(e) => return Err(pull_error(e)),
            }
        }

        Ok(())
    }

    /// Build a Docker image from composed content, streaming the build output
    pub async fn build_image(&self, composed: &ComposedDockerfile) -> Result<(), EmbedError> {
        let tar_archive = create_tar_archive(composed)?;
        debug!(
            "Submitting {} byte build context for {}",
            tar_archive.len(),
            composed.image_tag
        );

        let build_stream = self
            .ctx
            .docker_client()
            .build_image(&composed.image_tag, tar_archive)
            .await
            .map_err(EmbedError::Build)?;

        stream_output(build_stream).await.map_err(EmbedError::Build)
    }
}

/// Print build output as it arrives
async fn stream_output(mut stream: ProgressStream) -> Result<(), String> {
    while let Some(result) = stream.next().await {
        let line = result?;
        print!("{line}");
        // Ensure output is flushed immediately
        std::io::stdout().flush().unwrap_or(());
    }
    Ok(())
}

/// Create an in-memory build context holding only the Dockerfile
fn create_tar_archive(composed: &ComposedDockerfile) -> Result<Vec<u8>, EmbedError> {
    use tar::Builder;

    let mut tar_data = Vec::new();
    {
        let mut builder = Builder::new(&mut tar_data);

        let dockerfile_bytes = composed.dockerfile_content.as_bytes();
        let mut header = tar::Header::new_gnu();
        header.set_path("Dockerfile")?;
        header.set_size(dockerfile_bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, dockerfile_bytes)?;

        builder.finish()?;
    }

    Ok(tar_data)
}
