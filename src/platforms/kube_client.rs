//! Cluster client backed by `kube`.

use super::pod::{ExecOutput, PodClient};
use crate::constants::EPHEMERAL_CONTAINERS_SUBRESOURCE;
use crate::error::{ApiError, Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde_json::Value;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Pod client for one namespace of one cluster.
pub struct KubePodClient {
    client: Client,
    pods: Api<Pod>,
    namespace: String,
}

impl KubePodClient {
    /// Builds a client from the current context of the kubeconfig at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::Connect`] when the file cannot be read or does not describe a
    /// usable cluster.
    pub async fn connect(path: &Path, namespace: &str) -> Result<Self> {
        let connect_failed = |reason: String| Error::Connect {
            platform: "kubernetes".to_string(),
            reason,
        };

        let kubeconfig = Kubeconfig::read_from(path)
            .map_err(|e| connect_failed(format!("{}: {e}", path.display())))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| connect_failed(e.to_string()))?;
        let client = Client::try_from(config).map_err(|e| connect_failed(e.to_string()))?;

        Ok(Self::new(client, namespace))
    }

    /// Wraps an existing client.
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            pods: Api::namespaced(client.clone(), namespace),
            client,
            namespace: namespace.to_string(),
        }
    }
}

fn api_error(err: kube::Error) -> ApiError {
    match err {
        kube::Error::Api(response) => {
            ApiError::status(response.code, response.reason, response.message)
        }
        other => ApiError::transport(other.to_string()),
    }
}

#[async_trait]
impl PodClient for KubePodClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, name: &str) -> std::result::Result<Pod, ApiError> {
        self.pods.get(name).await.map_err(api_error)
    }

    async fn patch_ephemeral_containers(
        &self,
        name: &str,
        patch: &Value,
    ) -> std::result::Result<(), ApiError> {
        self.pods
            .patch_ephemeral_containers(name, &PatchParams::default(), &Patch::Strategic(patch))
            .await
            .map(|_| ())
            .map_err(api_error)
    }

    async fn patch_ephemeral_containers_legacy(
        &self,
        name: &str,
        patch: &Value,
    ) -> std::result::Result<(), ApiError> {
        // kube only speaks the current EphemeralContainers kind, so the JSON
        // patch goes out as a raw request.
        let uri = format!(
            "/api/v1/namespaces/{}/pods/{}/{}",
            self.namespace, name, EPHEMERAL_CONTAINERS_SUBRESOURCE
        );
        let body = serde_json::to_vec(patch).map_err(|e| ApiError::transport(e.to_string()))?;
        let request = http::Request::patch(uri)
            .header(http::header::CONTENT_TYPE, "application/json-patch+json")
            .body(body)
            .map_err(|e| ApiError::transport(e.to_string()))?;

        self.client
            .request::<Value>(request)
            .await
            .map(|_| ())
            .map_err(api_error)
    }

    async fn exec(
        &self,
        name: &str,
        container: &str,
        command: &[String],
    ) -> std::result::Result<ExecOutput, ApiError> {
        // A TTY merges stderr into stdout; the server rejects both at once.
        let params = AttachParams::default()
            .container(container)
            .stdin(false)
            .stdout(true)
            .stderr(false)
            .tty(true);

        let mut process = self
            .pods
            .exec(name, command.to_vec(), &params)
            .await
            .map_err(api_error)?;

        let mut output = Vec::new();
        if let Some(mut stdout) = process.stdout() {
            stdout
                .read_to_end(&mut output)
                .await
                .map_err(|e| ApiError::transport(e.to_string()))?;
        }

        let status = match process.take_status() {
            Some(status) => status.await,
            None => None,
        };
        process
            .join()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;

        Ok(ExecOutput {
            output,
            status: status.as_ref().and_then(|s| s.status.clone()),
            message: status.and_then(|s| s.message),
        })
    }
}
