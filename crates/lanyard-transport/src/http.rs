//! Loopback HTTP realization of [`RemoteSessionProvider`] using `reqwest`.
//!
//! The companion application exposes a small JSON API on `127.0.0.1:<port>`.
//! The port arrives in the launch arguments, so the provider starts
//! unbound: a successful [`validate`](RemoteSessionProvider::validate)
//! binds it to that endpoint, token and user, and every later call reuses
//! the binding.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use lanyard_protocol::{
    AchievementRecord, Codec, CompanionEndpoint, HealthReply, JsonCodec,
    Notification, StatRecord, UserInfo, ValidateReply, ValidateRequest,
};
use reqwest::{header, Client, Method, Url};
use tracing::{debug, warn};

use crate::{CredentialRequirements, RemoteSessionProvider, TransportError};

/// Header carrying the launch user id next to the bearer token.
const USER_HEADER: &str = "x-lanyard-user";

/// Settings for [`HttpProvider`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Upper bound for any single request, including connect.
    ///
    /// Default: 10 seconds. Callers may impose a tighter deadline on top
    /// (the liveness probe does).
    pub request_timeout: Duration,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            user_agent: concat!("lanyard/", env!("CARGO_PKG_VERSION"))
                .to_string(),
        }
    }
}

/// Where and as whom session calls are sent, fixed by validation.
#[derive(Debug, Clone)]
struct Binding {
    base: Url,
    token: String,
    user_id: String,
}

/// Talks to the companion over HTTP on a loopback port.
pub struct HttpProvider<C: Codec = JsonCodec> {
    client: Client,
    codec: C,
    config: HttpConfig,
    binding: RwLock<Option<Binding>>,
}

impl HttpProvider<JsonCodec> {
    /// Creates an unbound provider speaking JSON.
    ///
    /// # Errors
    /// Returns [`TransportError::Request`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec> HttpProvider<C> {
    /// Creates an unbound provider with a custom body codec.
    pub fn with_codec(
        config: HttpConfig,
        codec: C,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            codec,
            config,
            binding: RwLock::new(None),
        })
    }

    /// Base URL of the bound companion, if validation has succeeded.
    pub fn bound_url(&self) -> Option<String> {
        self.binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|b| b.base.to_string())
    }

    fn binding(&self) -> Result<Binding, TransportError> {
        self.binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::NotBound)
    }

    fn url(base: &Url, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::Request(format!(
                    "{base} cannot carry a path"
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.config.request_timeout)
        } else {
            TransportError::Request(e.to_string())
        }
    }

    /// Sends one request and returns the raw body of a 2xx reply.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        auth: (&str, Option<&str>),
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, TransportError> {
        let (token, user_id) = auth;
        let mut request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, self.codec.content_type())
            .bearer_auth(token);
        if let Some(user_id) = user_id {
            request = request.header(USER_HEADER, user_id);
        }
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, self.codec.content_type())
                .body(body);
        }

        let response =
            request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|e| {
                format!("unreadable error body: {e}")
            });
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }

    /// Request against the bound companion, as the bound user.
    async fn session_call(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, TransportError> {
        let binding = self.binding()?;
        let url = Self::url(&binding.base, segments)?;
        self.execute(
            method,
            url,
            (binding.token.as_str(), Some(binding.user_id.as_str())),
            body,
        )
        .await
    }
}

impl<C: Codec> RemoteSessionProvider for HttpProvider<C> {
    fn requirements(&self) -> CredentialRequirements {
        CredentialRequirements::TokenUserEndpoint
    }

    async fn validate(
        &self,
        endpoint: Option<&CompanionEndpoint>,
        request: &ValidateRequest,
    ) -> Result<ValidateReply, TransportError> {
        let endpoint = endpoint.ok_or(TransportError::MissingEndpoint)?;
        let base = Url::parse(&endpoint.base_url()).map_err(|e| {
            TransportError::Request(format!(
                "invalid companion endpoint {endpoint}: {e}"
            ))
        })?;
        let url = Self::url(&base, &["session", "validate"])?;
        let body = self.codec.encode(request)?;

        let bytes = self
            .execute(
                Method::POST,
                url,
                (request.token.as_str(), request.user_id.as_deref()),
                Some(body),
            )
            .await?;
        let reply: ValidateReply = self.codec.decode(&bytes)?;
        reply.check()?;

        *self
            .binding
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Binding {
            base,
            token: request.token.clone(),
            user_id: reply.user_id.clone(),
        });
        debug!(%endpoint, game_id = %reply.game_id, "companion endpoint bound");

        Ok(reply)
    }

    async fn check_liveness(&self) -> Result<(), TransportError> {
        let bytes = self
            .session_call(Method::GET, &["session", "health"], None)
            .await?;
        let reply: HealthReply = self.codec.decode(&bytes)?;
        if reply.alive {
            Ok(())
        } else {
            Err(TransportError::NotAlive)
        }
    }

    async fn user_info(&self) -> Result<UserInfo, TransportError> {
        let bytes = self.session_call(Method::GET, &["user"], None).await?;
        Ok(self.codec.decode(&bytes)?)
    }

    async fn unlock_achievement(&self, id: &str) -> Result<(), TransportError> {
        self.session_call(Method::POST, &["achievements", id, "unlock"], None)
            .await?;
        Ok(())
    }

    async fn list_achievements(
        &self,
    ) -> Result<Vec<AchievementRecord>, TransportError> {
        let bytes = self
            .session_call(Method::GET, &["achievements"], None)
            .await?;
        Ok(self.codec.decode(&bytes)?)
    }

    async fn request_stats(&self) -> Result<Vec<StatRecord>, TransportError> {
        let bytes = self.session_call(Method::GET, &["stats"], None).await?;
        Ok(self.codec.decode(&bytes)?)
    }

    async fn store_stats(
        &self,
        stats: &[StatRecord],
    ) -> Result<(), TransportError> {
        let body = self.codec.encode(&stats)?;
        self.session_call(Method::PUT, &["stats"], Some(body)).await?;
        Ok(())
    }

    fn notify(&self, notification: Notification) {
        let Ok(binding) = self.binding() else {
            debug!(?notification, "no companion bound, notification dropped");
            return;
        };
        let body = match self.codec.encode(&notification) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to encode notification");
                return;
            }
        };
        let url = match Self::url(&binding.base, &["session", "notify"]) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "failed to build notification url");
                return;
            }
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, notification dropped");
            return;
        };

        let request = self
            .client
            .post(url)
            .bearer_auth(&binding.token)
            .header(USER_HEADER, &binding.user_id)
            .header(header::CONTENT_TYPE, self.codec.content_type())
            .body(body);
        runtime.spawn(async move {
            if let Err(e) = request.send().await {
                debug!(error = %e, "notification not delivered");
            }
        });
    }
}
