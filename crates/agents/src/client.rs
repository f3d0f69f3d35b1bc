//! HTTP client for the Llama Stack agents API.

use std::{pin::Pin, time::Duration};

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tokio_stream::Stream,
    tracing::{debug, info, warn},
    voxrelay_config::AgentConfig,
};

use crate::{
    error::{AgentError, Result},
    sse::data_stream,
    turn::consume,
};

const TOOLGROUP_PROVIDER: &str = "model-context-protocol";
const TOP_P: f32 = 0.9;

/// Something that turns a user utterance into an agent reply.
#[async_trait]
pub trait AgentResponder: Send + Sync {
    async fn respond(&self, text: &str) -> Result<String>;
}

/// One fresh agent + session per turn; nothing is reused across turns.
pub struct LlamaStackClient {
    config: AgentConfig,
    base_url: String,
    client: reqwest::Client,
}

impl LlamaStackClient {
    pub fn new(config: AgentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AgentError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    #[must_use]
    pub fn with_client(config: AgentConfig, client: reqwest::Client) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            config,
            base_url,
            client,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        let resp = check_status(resp).await?;
        resp.json::<Value>()
            .await
            .map_err(|e| AgentError::Stream(format!("invalid response body: {e}")))
    }

    /// Register the MCP toolgroup, replacing any previous registration.
    pub async fn register_toolgroup(&self, endpoint: &str) -> Result<()> {
        let id = &self.config.toolgroup_id;

        match self.client.delete(self.url(&format!("toolgroups/{id}"))).send().await {
            Ok(resp) => debug!(toolgroup = %id, status = %resp.status(), "unregistered toolgroup"),
            Err(e) => debug!(toolgroup = %id, error = %e, "toolgroup unregister failed"),
        }

        let body = json!({
            "toolgroup_id": id,
            "provider_id": TOOLGROUP_PROVIDER,
            "mcp_endpoint": { "uri": endpoint },
        });
        let resp = self
            .client
            .post(self.url("toolgroups"))
            .json(&body)
            .send()
            .await?;
        check_status(resp).await?;
        info!(toolgroup = %id, endpoint, "registered MCP toolgroup");
        Ok(())
    }

    /// Agent configuration sent on creation.
    #[must_use]
    pub fn agent_config(&self, toolgroups: &[String]) -> Value {
        let c = &self.config;
        json!({
            "model": c.model,
            "instructions": c.instructions,
            "toolgroups": toolgroups,
            "tool_config": { "tool_choice": c.tool_choice.as_str() },
            "sampling_params": {
                "strategy": {
                    "type": "top_p",
                    "temperature": c.temperature,
                    "top_p": TOP_P,
                },
                "max_tokens": c.max_tokens,
            },
            "max_infer_iters": c.max_infer_iters,
            "enable_session_persistence": false,
        })
    }

    pub async fn create_agent(&self, toolgroups: &[String]) -> Result<String> {
        let body = json!({ "agent_config": self.agent_config(toolgroups) });
        let resp = self.post_json("agents", &body).await?;
        id_field(&resp, "agent_id")
    }

    pub async fn create_session(&self, agent_id: &str) -> Result<String> {
        let body = json!({ "session_name": format!("voxrelay-{}", uuid::Uuid::new_v4()) });
        let resp = self
            .post_json(&format!("agents/{agent_id}/session"), &body)
            .await?;
        id_field(&resp, "session_id")
    }

    /// Start a streaming turn and return its raw event payloads.
    pub async fn turn_events(
        &self,
        agent_id: &str,
        session_id: &str,
        text: &str,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
        let body = json!({
            "messages": [{ "role": "user", "content": text }],
            "stream": true,
        });
        let resp = self
            .client
            .post(self.url(&format!("agents/{agent_id}/session/{session_id}/turn")))
            .header("accept", "text/event-stream")
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(data_stream(resp))
    }

    pub async fn delete_agent(&self, agent_id: &str) {
        match self
            .client
            .delete(self.url(&format!("agents/{agent_id}")))
            .send()
            .await
        {
            Ok(resp) if !resp.status().is_success() => {
                debug!(agent_id, status = %resp.status(), "agent delete rejected");
            },
            Ok(_) => {},
            Err(e) => debug!(agent_id, error = %e, "agent delete failed"),
        }
    }

    async fn toolgroups(&self) -> Vec<String> {
        let mut groups = self.config.toolgroups.clone();
        let Some(endpoint) = self.config.mcp_endpoint.as_deref() else {
            return groups;
        };
        match self.register_toolgroup(endpoint).await {
            Ok(()) => {
                if !groups.contains(&self.config.toolgroup_id) {
                    groups.push(self.config.toolgroup_id.clone());
                }
            },
            Err(e) => {
                warn!(
                    toolgroup = %self.config.toolgroup_id,
                    error = %e,
                    "MCP toolgroup registration failed, continuing without it"
                );
            },
        }
        groups
    }
}

#[async_trait]
impl AgentResponder for LlamaStackClient {
    async fn respond(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(AgentError::InvalidInput("empty user message".into()));
        }

        let toolgroups = self.toolgroups().await;
        let agent_id = self.create_agent(&toolgroups).await?;
        debug!(agent_id = %agent_id, toolgroups = ?toolgroups, "created agent");

        let result = async {
            let session_id = self.create_session(&agent_id).await?;
            let events = self.turn_events(&agent_id, &session_id, text).await?;
            consume(events).await
        }
        .await;

        self.delete_agent(&agent_id).await;

        match &result {
            Ok(reply) => info!(agent_id = %agent_id, reply_len = reply.len(), "agent turn complete"),
            Err(e) => warn!(agent_id = %agent_id, error = %e, "agent turn failed"),
        }
        result
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "agent service error");
    Err(AgentError::Upstream {
        status: status.as_u16(),
        body,
    })
}

fn id_field(resp: &Value, field: &str) -> Result<String> {
    resp[field]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AgentError::Stream(format!("response missing {field}")))
}
