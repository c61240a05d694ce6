//! HTTP implementations of the gateway traits.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::ServicesConfig;
use crate::model::{Incident, IncidentPriority, Mission, Responders};

use super::{
    AssignmentRequest, AssignmentRules, GatewayError, MessagePublisher, OutboundMessage,
    PriorityService, ResponderDirectory,
};

/// Shared client plumbing for one remote service.
#[derive(Debug, Clone)]
struct ServiceClient {
    name: &'static str,
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ServiceClient {
    fn new(
        name: &'static str,
        base_url: &str,
        config: &ServicesConfig,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            name,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(self.name, e))?;

        if !response.status().is_success() {
            return Err(GatewayError::Http {
                service: self.name,
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, response: Response) -> Result<T, GatewayError> {
        response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse {
                service: self.name,
                message: e.to_string(),
            })
    }
}

/// Responder directory backed by `GET {url}/responders/available`.
#[derive(Debug, Clone)]
pub struct HttpResponderDirectory {
    inner: ServiceClient,
}

impl HttpResponderDirectory {
    pub fn new(config: &ServicesConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            inner: ServiceClient::new("responder-service", &config.responders_url, config)?,
        })
    }
}

#[async_trait]
impl ResponderDirectory for HttpResponderDirectory {
    fn name(&self) -> &str {
        self.inner.name
    }

    async fn fetch_responders(&self) -> Result<Responders, GatewayError> {
        let url = self.inner.url("/responders/available");
        debug!(url = %url, "Fetching available responders");

        let response = self.inner.send(self.inner.client.get(&url)).await?;
        let responders: Responders = self.inner.json(response).await?;

        debug!(count = responders.len(), "Fetched responders");
        Ok(responders)
    }
}

/// Priority service backed by `GET {url}/priority/{incidentId}`.
#[derive(Debug, Clone)]
pub struct HttpPriorityService {
    inner: ServiceClient,
}

impl HttpPriorityService {
    pub fn new(config: &ServicesConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            inner: ServiceClient::new("priority-service", &config.priority_url, config)?,
        })
    }
}

#[async_trait]
impl PriorityService for HttpPriorityService {
    fn name(&self) -> &str {
        self.inner.name
    }

    async fn fetch_priority(&self, incident: &Incident) -> Result<IncidentPriority, GatewayError> {
        let url = self
            .inner
            .url(&format!("/priority/{}", urlencoding::encode(&incident.id)));
        debug!(incident_id = %incident.id, "Fetching incident priority");

        let response = self.inner.send(self.inner.client.get(&url)).await?;
        self.inner.json(response).await
    }
}

/// Decision service backed by `POST {url}/evaluate`.
#[derive(Debug, Clone)]
pub struct HttpAssignmentRules {
    inner: ServiceClient,
}

impl HttpAssignmentRules {
    pub fn new(config: &ServicesConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            inner: ServiceClient::new("assignment-rules", &config.rules_url, config)?,
        })
    }
}

#[async_trait]
impl AssignmentRules for HttpAssignmentRules {
    fn name(&self) -> &str {
        self.inner.name
    }

    async fn evaluate(&self, request: AssignmentRequest) -> Result<Mission, GatewayError> {
        let url = self.inner.url("/evaluate");
        debug!(
            incident_id = %request.incident.id,
            session = %request.session.name,
            responders = request.responders.len(),
            "Evaluating assignment"
        );

        let response = self
            .inner
            .send(self.inner.client.post(&url).json(&request))
            .await?;
        self.inner.json(response).await
    }
}

/// Message publisher backed by `POST {url}/messages`.
#[derive(Debug, Clone)]
pub struct HttpMessagePublisher {
    inner: ServiceClient,
}

impl HttpMessagePublisher {
    pub fn new(config: &ServicesConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            inner: ServiceClient::new("message-gateway", &config.messages_url, config)?,
        })
    }
}

#[async_trait]
impl MessagePublisher for HttpMessagePublisher {
    fn name(&self) -> &str {
        self.inner.name
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        let url = self.inner.url("/messages");
        debug!(
            message_type = %message.message_type(),
            incident_id = %message.incident_id(),
            "Publishing message"
        );

        self.inner
            .send(self.inner.client.post(&url).json(message))
            .await
            .map_err(|e| match e {
                GatewayError::Http { status, .. } => GatewayError::Publish {
                    message_type: message.message_type().to_string(),
                    message: format!("HTTP {}", status),
                },
                other => other,
            })?;
        Ok(())
    }
}
