//! The API seam the controller drives, and its HTTP implementation.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use ide_core::{
    CompileRequest, CompileResult, CreateProjectRequest, DeployRequest, DeployResult, Network,
    Project, ProjectFile, UpdateProjectRequest,
};

use crate::errors::{Result, WorkflowError};

/// Operations the IDE needs from its backend.
#[async_trait]
pub trait IdeApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn create_project(&self, name: &str, template: Option<&str>) -> Result<Project>;

    async fn get_project(&self, id: &str) -> Result<Project>;

    async fn update_project(&self, id: &str, update: &UpdateProjectRequest) -> Result<Project>;

    async fn compile(&self, project_id: &str, files: &[ProjectFile]) -> Result<CompileResult>;

    async fn deploy(
        &self,
        project_id: &str,
        wasm_base64: &str,
        network: Network,
    ) -> Result<DeployResult>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`IdeApi`] over the backend's REST routes.
#[derive(Clone)]
pub struct HttpIdeApi {
    client: Client,
    base_url: String,
}

impl HttpIdeApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());
        debug!("API responded {status}: {message}");

        if status == StatusCode::CONFLICT {
            Err(WorkflowError::Conflict(message))
        } else {
            Err(WorkflowError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl IdeApi for HttpIdeApi {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let resp = self.client.get(self.url("/api/projects")).send().await?;
        Self::decode(resp).await
    }

    async fn create_project(&self, name: &str, template: Option<&str>) -> Result<Project> {
        let body = CreateProjectRequest {
            name: name.to_string(),
            template: template.map(String::from),
        };
        let resp = self
            .client
            .post(self.url("/api/projects"))
            .json(&body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn get_project(&self, id: &str) -> Result<Project> {
        let resp = self
            .client
            .get(self.url(&format!("/api/projects/{id}")))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn update_project(&self, id: &str, update: &UpdateProjectRequest) -> Result<Project> {
        let resp = self
            .client
            .patch(self.url(&format!("/api/projects/{id}")))
            .json(update)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn compile(&self, project_id: &str, files: &[ProjectFile]) -> Result<CompileResult> {
        let body = CompileRequest {
            project_id: project_id.to_string(),
            files: files.to_vec(),
        };
        let resp = self
            .client
            .post(self.url("/api/compile"))
            .json(&body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn deploy(
        &self,
        project_id: &str,
        wasm_base64: &str,
        network: Network,
    ) -> Result<DeployResult> {
        let body = DeployRequest {
            project_id: project_id.to_string(),
            wasm_base64: wasm_base64.to_string(),
            network,
        };
        let resp = self
            .client
            .post(self.url("/api/deploy"))
            .json(&body)
            .send()
            .await?;
        Self::decode(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn project_json(id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "name": "Demo",
            "files": [{ "name": "lib.rs", "type": "rust", "content": "#![no_std]" }],
            "revision": 3,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn list_projects_parses_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([project_json("p1")])))
            .mount(&server)
            .await;

        let api = HttpIdeApi::new(format!("{}/", server.uri()));
        let projects = api.list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "p1");
        assert_eq!(projects[0].revision, 3);
        assert!(projects[0].deployment_history.is_empty());
    }

    #[tokio::test]
    async fn conflict_status_maps_to_conflict_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/projects/p1"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({ "error": "Revision conflict: expected 1, found 2" })),
            )
            .mount(&server)
            .await;

        let api = HttpIdeApi::new(server.uri());
        let err = api
            .update_project("p1", &UpdateProjectRequest::name("x").at_revision(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(msg) if msg.contains("expected 1")));
    }

    #[tokio::test]
    async fn error_status_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/nope"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": "Project not found: nope" })),
            )
            .mount(&server)
            .await;

        let err = HttpIdeApi::new(server.uri()).get_project("nope").await.unwrap_err();
        match err {
            WorkflowError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Project not found: nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn compile_sends_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/compile"))
            .and(body_partial_json(json!({ "projectId": "p1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "logs": [{ "type": "info", "message": "ok", "timestamp": "2024-01-01T00:00:00Z" }],
                "wasmBase64": "AGFzbQ=="
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = HttpIdeApi::new(server.uri())
            .compile("p1", &[ProjectFile::new("lib.rs", "")])
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.wasm_base64.as_deref(), Some("AGFzbQ=="));
    }
}
