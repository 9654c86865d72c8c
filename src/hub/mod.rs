//! Home-automation hub client
//!
//! Narrow client for the Home Assistant REST API: read an entity's state,
//! write an entity's state, and call a service. The rest of the crate only
//! sees the [`HubApi`] trait, so handlers can be tested without a hub.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::HubConfig;
use crate::{Error, Result};

/// State of one hub entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Entity identifier (e.g., `sensor.outside_temperature`)
    pub entity_id: String,
    /// Current state value
    pub state: String,
    /// Entity attributes (`friendly_name`, `unit_of_measurement`, ...)
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl EntityState {
    /// Look up a string attribute
    ///
    /// Non-string values are rendered as their JSON text.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.attributes.get(key).map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Human-readable name, falling back to the entity id
    #[must_use]
    pub fn friendly_name(&self) -> String {
        self.attribute("friendly_name")
            .unwrap_or_else(|| self.entity_id.clone())
    }
}

/// Operations the dispatcher needs from the hub
#[async_trait]
pub trait HubApi: Send + Sync {
    /// Fetch the current state of an entity
    async fn get_state(&self, entity_id: &str) -> Result<EntityState>;

    /// Set the state of an entity
    async fn set_state(&self, entity_id: &str, new_state: &str) -> Result<()>;

    /// Call a hub service (e.g., `notify.mobile_app`)
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> Result<()>;
}

/// Opens hub connections
///
/// A fresh connection is opened for each remote action.
pub trait HubConnector: Send + Sync {
    /// Open a connection to the hub
    ///
    /// # Errors
    ///
    /// Returns error if the connection parameters are unusable
    fn connect(&self) -> Result<Box<dyn HubApi>>;
}

impl HubConnector for HubConfig {
    fn connect(&self) -> Result<Box<dyn HubApi>> {
        Ok(Box::new(HomeAssistantClient::new(self)?))
    }
}

/// Client for the Home Assistant REST API
#[derive(Debug, Clone)]
pub struct HomeAssistantClient {
    /// HTTP client
    client: Client,
    /// Base URL of the hub (e.g., `http://hassio.local:8123`)
    base_url: Url,
    /// Long-lived access token
    token: Option<SecretString>,
}

impl HomeAssistantClient {
    /// Create a client from hub configuration
    ///
    /// # Errors
    ///
    /// Returns error if no URL is configured, the URL is invalid, or the
    /// HTTP client cannot be built
    pub fn new(config: &HubConfig) -> Result<Self> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("hub url not configured".to_string()))?;
        let base_url = Url::parse(raw)?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "hub url must be http or https: {base_url}"
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            token: config.token.clone(),
        })
    }

    /// Build an endpoint URL below `/api/`
    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::Config(format!("hub url cannot be a base: {}", self.base_url)))?;
            segments.pop_if_empty().push("api");
            for part in path.split('/') {
                segments.push(part);
            }
        }
        Ok(url)
    }

    /// Attach the bearer token, if any
    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    /// Send a request, mapping failures to hub errors
    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let response = self.authorize(req).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("hub request {what}"))
            } else {
                Error::Http(e)
            }
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(what.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Hub(format!("{what}: {status} - {body}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl HubApi for HomeAssistantClient {
    async fn get_state(&self, entity_id: &str) -> Result<EntityState> {
        let url = self.endpoint(&format!("states/{entity_id}"))?;
        let response = self
            .send(self.client.get(url), &format!("get_state {entity_id}"))
            .await?;

        let state = response.json().await?;
        Ok(state)
    }

    async fn set_state(&self, entity_id: &str, new_state: &str) -> Result<()> {
        #[derive(Serialize)]
        struct SetStateRequest<'a> {
            state: &'a str,
        }

        let url = self.endpoint(&format!("states/{entity_id}"))?;
        self.send(
            self.client
                .post(url)
                .json(&SetStateRequest { state: new_state }),
            &format!("set_state {entity_id}"),
        )
        .await?;

        Ok(())
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        let url = self.endpoint(&format!("services/{domain}/{service}"))?;
        self.send(
            self.client.post(url).json(&data),
            &format!("call_service {domain}.{service}"),
        )
        .await?;

        Ok(())
    }
}
