use std::env;

/// Base image of the intermediate staging stage when none is configured
pub const DEFAULT_STAGING_IMAGE: &str = "alpine:latest";

/// Environment variable overriding the staging stage's base image
pub const STAGING_IMAGE_VAR: &str = "FALCON_EMBED_STAGING_IMAGE";

/// Runtime environment configuration for an embed run
///
/// Resolution priority (highest to lowest):
/// 1. Builder override (test-only)
/// 2. `FALCON_EMBED_STAGING_IMAGE`
/// 3. `alpine:latest`
///
/// Docker connection settings (`DOCKER_HOST` and friends) are read by the
/// Docker client itself.
#[derive(Debug, Clone)]
pub struct EmbedEnv {
    staging_image: String,
}

impl EmbedEnv {
    /// Create the environment from the process environment
    pub fn new() -> Self {
        Self {
            staging_image: Self::resolve_staging_image(None),
        }
    }

    /// Create a builder for EmbedEnv with custom overrides
    #[cfg(test)]
    pub fn builder() -> EmbedEnvBuilder {
        EmbedEnvBuilder::default()
    }

    /// Gets the base image of the staging stage
    pub fn staging_image(&self) -> &str {
        &self.staging_image
    }

    fn resolve_staging_image(override_value: Option<String>) -> String {
        override_value
            .or_else(|| env::var(STAGING_IMAGE_VAR).ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_STAGING_IMAGE.to_string())
    }
}

impl Default for EmbedEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct EmbedEnvBuilder {
    staging_image: Option<String>,
}

#[cfg(test)]
impl EmbedEnvBuilder {
    pub fn with_staging_image(mut self, staging_image: impl Into<String>) -> Self {
        self.staging_image = Some(staging_image.into());
        self
    }

    pub fn build(self) -> EmbedEnv {
        EmbedEnv {
            staging_image: EmbedEnv::resolve_staging_image(self.staging_image),
        }
    }
}
