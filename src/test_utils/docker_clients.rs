use crate::context::docker_client::{DockerClient, ImageLookupError, ProgressStream};
use crate::docker::image_manager::PullTarget;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Inspect output for an image with the given `Entrypoint` and `Cmd` values
pub fn inspect_json(entrypoint: serde_json::Value, cmd: serde_json::Value) -> String {
    serde_json::json!({
        "Id": "sha256:5f1c0e7e2a6b",
        "RepoTags": [],
        "Config": {
            "Entrypoint": entrypoint,
            "Cmd": cmd,
            "Env": ["PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"],
        }
    })
    .to_string()
}

fn canonical(reference: &str) -> String {
    PullTarget::parse(reference).to_string()
}

fn progress(lines: Vec<Result<String, String>>) -> ProgressStream {
    Box::new(futures_util::stream::iter(lines))
}

#[derive(Debug, Clone)]
pub struct BuildImageCall {
    pub tag: String,
    pub tar_archive: Vec<u8>,
}

impl BuildImageCall {
    /// Read the Dockerfile out of the submitted build context
    pub fn dockerfile(&self) -> String {
        use std::io::Read;

        let mut archive = tar::Archive::new(&self.tar_archive[..]);
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().to_str() == Some("Dockerfile") {
                let mut content = String::new();
                entry.read_to_string(&mut content).unwrap();
                return content;
            }
        }
        panic!("Dockerfile not found in build context");
    }
}

/// Docker client backed by in-memory local and registry image sets that
/// records every call
#[derive(Clone)]
pub struct TrackedDockerClient {
    pub inspect_calls: Arc<Mutex<Vec<String>>>,
    pub pull_calls: Arc<Mutex<Vec<(String, String)>>>,
    pub build_calls: Arc<Mutex<Vec<BuildImageCall>>>,

    /// Images present in the daemon, keyed by canonical reference
    pub local_images: Arc<Mutex<HashMap<String, String>>>,
    /// Images a pull can fetch, keyed by canonical reference
    pub registry_images: HashMap<String, String>,
    pub inspect_error: Option<String>,
    /// Fails every lookup after the first one
    pub second_inspect_error: Option<String>,
    /// A successful pull does not make the image available locally
    pub pull_leaves_image_missing: bool,
    pub pull_error: Option<String>,
    pub build_error: Option<String>,
    pub build_output: Vec<String>,
}

impl Default for TrackedDockerClient {
    fn default() -> Self {
        Self {
            inspect_calls: Arc::new(Mutex::new(Vec::new())),
            pull_calls: Arc::new(Mutex::new(Vec::new())),
            build_calls: Arc::new(Mutex::new(Vec::new())),
            local_images: Arc::new(Mutex::new(HashMap::new())),
            registry_images: HashMap::new(),
            inspect_error: None,
            second_inspect_error: None,
            pull_leaves_image_missing: false,
            pull_error: None,
            build_error: None,
            build_output: vec![
                "Step 1/16 : FROM falcon-sensor:7.10 AS falcon\n".to_string(),
                "Successfully tagged myapp:1.0-falcon\n".to_string(),
            ],
        }
    }
}

impl TrackedDockerClient {
    pub fn with_local_image(self, reference: &str, inspect: String) -> Self {
        self.local_images
            .lock()
            .unwrap()
            .insert(canonical(reference), inspect);
        self
    }

    pub fn with_registry_image(mut self, reference: &str, inspect: String) -> Self {
        self.registry_images.insert(canonical(reference), inspect);
        self
    }

    pub fn build_calls(&self) -> Vec<BuildImageCall> {
        self.build_calls.lock().unwrap().clone()
    }

    pub fn pull_calls(&self) -> Vec<(String, String)> {
        self.pull_calls.lock().unwrap().clone()
    }

    pub fn inspect_calls(&self) -> Vec<String> {
        self.inspect_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DockerClient for TrackedDockerClient {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    async fn inspect_image(&self, reference: &str) -> Result<String, ImageLookupError> {
        let previous_calls = {
            let mut calls = self.inspect_calls.lock().unwrap();
            calls.push(reference.to_string());
            calls.len() - 1
        };

        if let Some(ref error) = self.inspect_error {
            return Err(ImageLookupError::Api(error.clone()));
        }
        if previous_calls > 0
            && let Some(ref error) = self.second_inspect_error
        {
            return Err(ImageLookupError::Api(error.clone()));
        }

        self.local_images
            .lock()
            .unwrap()
            .get(&canonical(reference))
            .cloned()
            .ok_or(ImageLookupError::NotFound)
    }

    async fn pull_image(&self, repository: &str, tag: &str) -> Result<ProgressStream, String> {
        self.pull_calls
            .lock()
            .unwrap()
            .push((repository.to_string(), tag.to_string()));

        if let Some(ref error) = self.pull_error {
            return Err(error.clone());
        }

        let key = PullTarget {
            repository: repository.to_string(),
            tag: tag.to_string(),
        }
        .to_string();

        match self.registry_images.get(&key) {
            Some(inspect) => {
                if !self.pull_leaves_image_missing {
                    self.local_images
                        .lock()
                        .unwrap()
                        .insert(key.clone(), inspect.clone());
                }
                Ok(progress(vec![
                    Ok(format!("Pulling from {repository}")),
                    Ok(format!("Status: Downloaded newer image for {key}")),
                ]))
            }
            None => Ok(progress(vec![Err(format!(
                "manifest for {key} not found: manifest unknown"
            ))])),
        }
    }

    async fn build_image(
        &self,
        tag: &str,
        tar_archive: Vec<u8>,
    ) -> Result<ProgressStream, String> {
        self.build_calls.lock().unwrap().push(BuildImageCall {
            tag: tag.to_string(),
            tar_archive,
        });

        let mut lines: Vec<Result<String, String>> =
            self.build_output.iter().cloned().map(Ok).collect();
        if let Some(ref error) = self.build_error {
            lines.truncate(1);
            lines.push(Err(error.clone()));
        }
        Ok(progress(lines))
    }
}
