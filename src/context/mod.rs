pub mod docker_client;
pub mod embed_env;

use crate::error::EmbedError;
use docker_client::DockerClient;
use embed_env::EmbedEnv;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    docker_client: Arc<dyn DockerClient>,
    embed_env: Arc<EmbedEnv>,
}

impl AppContext {
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }

    pub fn docker_client(&self) -> Arc<dyn DockerClient> {
        Arc::clone(&self.docker_client)
    }

    pub fn embed_env(&self) -> Arc<EmbedEnv> {
        Arc::clone(&self.embed_env)
    }
}

#[derive(Default)]
pub struct AppContextBuilder {
    docker_client: Option<Arc<dyn DockerClient>>,
    embed_env: Option<Arc<EmbedEnv>>,
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docker_client(mut self, docker_client: Arc<dyn DockerClient>) -> Self {
        self.docker_client = Some(docker_client);
        self
    }

    pub fn with_embed_env(mut self, embed_env: Arc<EmbedEnv>) -> Self {
        self.embed_env = Some(embed_env);
        self
    }

    /// Build the context, connecting to Docker unless a client was injected
    pub fn build(self) -> Result<AppContext, EmbedError> {
        let docker_client = match self.docker_client {
            Some(client) => client,
            None => Arc::new(docker_client::DefaultDockerClient::connect()?),
        };

        Ok(AppContext {
            docker_client,
            embed_env: self.embed_env.unwrap_or_else(|| Arc::new(EmbedEnv::new())),
        })
    }
}
