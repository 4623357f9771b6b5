use thiserror::Error;

/// Failures that abort an embed run before a target image is tagged
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Failed to connect to Docker: {0}")]
    Connection(String),
    #[error("Error occurred while getting the source image {reference}: {message}")]
    Lookup { reference: String, message: String },
    #[error("Error occurred while pulling the source image {reference}: {message}")]
    Pull { reference: String, message: String },
    #[error("Source image {0} is still missing after pulling it")]
    NotFoundAfterPull(String),
    #[error("Unable to read the configuration of image {reference}: {message}")]
    Metadata { reference: String, message: String },
    #[error("Invalid {role} image reference {reference:?}: {reason}")]
    InvalidReference {
        role: &'static str,
        reference: String,
        reason: &'static str,
    },
    #[error("Invalid CID value: {0}")]
    InvalidToken(&'static str),
    #[error("Generated Dockerfile is malformed: {0}")]
    MalformedDockerfile(String),
    #[error("Failed to create build context: {0}")]
    Archive(#[from] std::io::Error),
    #[error("Error occurred during image build: {0}")]
    Build(String),
}
