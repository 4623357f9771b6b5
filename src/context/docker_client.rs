use async_trait::async_trait;
use bollard::Docker;
use bollard::errors::Error as BollardError;
use bollard::models::{BuildInfo, CreateImageInfo, ErrorDetail};
use bollard::query_parameters::{BuildImageOptionsBuilder, CreateImageOptionsBuilder};
use futures_util::stream::{Stream, StreamExt};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::EmbedError;

/// Stream of progress lines reported by the Docker daemon
pub type ProgressStream = Box<dyn Stream<Item = Result<String, String>> + Send + Unpin>;

/// Why a local image lookup failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLookupError {
    /// The daemon has no image with this reference
    NotFound,
    /// Any other API failure, such as an unreachable daemon
    Api(String),
}

impl std::fmt::Display for ImageLookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageLookupError::NotFound => write!(f, "image not found"),
            ImageLookupError::Api(message) => write!(f, "{message}"),
        }
    }
}

#[async_trait]
pub trait DockerClient: Send + Sync {
    #[cfg(test)]
    fn as_any(&self) -> &dyn std::any::Any;

    /// Inspect a local image
    ///
    /// # Arguments
    /// * `reference` - Image reference (e.g., "nginx:1.27" or "nginx@sha256:...")
    ///
    /// # Returns
    /// Image inspection data as a JSON string
    async fn inspect_image(&self, reference: &str) -> Result<String, ImageLookupError>;

    /// Pull an image from its registry with streaming progress
    ///
    /// # Arguments
    /// * `repository` - Repository part of the reference (e.g., "docker.io/library/nginx")
    /// * `tag` - Tag or digest to pull
    ///
    /// # Returns
    /// A stream of pull status messages, or an error if the pull fails to start
    async fn pull_image(&self, repository: &str, tag: &str) -> Result<ProgressStream, String>;

    /// Build a Docker image from a tar archive containing a Dockerfile with streaming output
    ///
    /// Intermediate containers are always removed.
    ///
    /// # Arguments
    /// * `tag` - Tag given to the built image
    /// * `tar_archive` - Tar archive containing the Dockerfile
    ///
    /// # Returns
    /// A stream of build output messages, or an error if the build fails to start
    async fn build_image(&self, tag: &str, tar_archive: Vec<u8>)
    -> Result<ProgressStream, String>;
}

#[derive(Clone)]
pub struct DefaultDockerClient {
    docker: Docker,
}

impl DefaultDockerClient {
    /// Connect using the local defaults (`DOCKER_HOST` or the platform socket)
    pub fn connect() -> Result<Self, EmbedError> {
        Docker::connect_with_local_defaults()
            .map(|docker| Self { docker })
            .map_err(|e| {
                EmbedError::Connection(format!(
                    "{e}\n\n\
                    Please ensure Docker is installed and running:\n\
                      - On macOS: Open Docker Desktop application\n\
                      - On Linux: Run 'sudo systemctl start docker' or 'sudo service docker start'\n\
                      - Check Docker status with: 'docker ps'"
                ))
            })
    }
}

type ProgressSender = tokio::sync::mpsc::UnboundedSender<Result<String, String>>;

/// Forward daemon progress into `tx` until the stream ends or reports an error
async fn forward_progress<S, T, F>(stream: S, tx: ProgressSender, describe: F)
where
    S: Stream<Item = Result<T, BollardError>>,
    F: Fn(T) -> Option<Result<String, String>>,
{
    let mut stream = Box::pin(stream);
    while let Some(item) = stream.next().await {
        let message = match item {
            Ok(info) => describe(info),
            Err(e) => Some(Err(e.to_string())),
        };
        match message {
            Some(Err(e)) => {
                let _ = tx.send(Err(e));
                break;
            }
            Some(Ok(line)) => {
                if tx.send(Ok(line)).is_err() {
                    break; // Receiver dropped
                }
            }
            None => {}
        }
    }
}

fn error_message(detail: ErrorDetail) -> String {
    detail
        .message
        .unwrap_or_else(|| "Unknown error".to_string())
}

#[async_trait]
impl DockerClient for DefaultDockerClient {
    #[cfg(test)]
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    async fn inspect_image(&self, reference: &str) -> Result<String, ImageLookupError> {
        let image = self
            .docker
            .inspect_image(reference)
            .await
            .map_err(|e| match e {
                BollardError::DockerResponseServerError {
                    status_code: 404, ..
                } => ImageLookupError::NotFound,
                e => ImageLookupError::Api(format!("Failed to inspect image: {e}")),
            })?;

        serde_json::to_string(&image)
            .map_err(|e| ImageLookupError::Api(format!("Failed to serialize image info: {e}")))
    }

    async fn pull_image(&self, repository: &str, tag: &str) -> Result<ProgressStream, String> {
        use tokio::sync::mpsc;

        let options = CreateImageOptionsBuilder::default()
            .from_image(repository)
            .tag(tag)
            .build();

        let (tx, rx) = mpsc::unbounded_channel();
        let docker = self.docker.clone();

        tokio::spawn(async move {
            let stream = docker.create_image(Some(options), None, None);
            forward_progress(stream, tx, |info: CreateImageInfo| {
                if let Some(error_detail) = info.error_detail {
                    return Some(Err(error_message(error_detail)));
                }
                let status = info.status?;
                Some(Ok(match info.id {
                    Some(id) => format!("{id}: {status}"),
                    None => status,
                }))
            })
            .await;
        });

        Ok(Box::new(UnboundedReceiverStream::new(rx)))
    }

    async fn build_image(
        &self,
        tag: &str,
        tar_archive: Vec<u8>,
    ) -> Result<ProgressStream, String> {
        use bytes::Bytes;
        use tokio::sync::mpsc;

        let options = BuildImageOptionsBuilder::default()
            .dockerfile("Dockerfile")
            .t(tag)
            .rm(true)
            .forcerm(true)
            .build();

        let (tx, rx) = mpsc::unbounded_channel();
        let docker = self.docker.clone();

        // Spawn a task to handle the streaming
        tokio::spawn(async move {
            let body = bollard::body_full(Bytes::from(tar_archive));
            let stream = docker.build_image(options, None, Some(body));
            forward_progress(stream, tx, |info: BuildInfo| {
                if let Some(error_detail) = info.error_detail {
                    return Some(Err(error_message(error_detail)));
                }
                info.stream.filter(|s| !s.is_empty()).map(Ok)
            })
            .await;
        });

        Ok(Box::new(UnboundedReceiverStream::new(rx)))
    }
}
