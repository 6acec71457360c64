use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{StreamExt, stream::BoxStream};
use reqwest::{Client, Url, header};

use crate::{
    config::ClientConfig,
    error::{ClientError, Result},
    message::{ChatMessage, ChatQuery, ContextResponse, ResetContextRequest},
};

/// Name of the event that ends a turn.
pub const DONE_EVENT: &str = "done";
/// Data payload that ends a turn.
pub const DONE_DATA: &str = "[DONE]";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamFrame {
    Fragment(String),
    /// Explicit end-of-turn marker.
    Done,
}

pub type FragmentStream = BoxStream<'static, Result<StreamFrame>>;

/// The chat/context server as seen from the client.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Stored history for `user_id`; empty when there is none.
    async fn fetch_context(&self, user_id: &str) -> Result<Vec<ChatMessage>>;

    /// Ask the backend to drop stored history for `user_id`.
    async fn reset_context(&self, user_id: &str) -> Result<()>;

    /// Open the reply stream for one user message.
    async fn open_stream(&self, user_id: &str, message: &str) -> Result<FragmentStream>;
}

#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Self::with_client(client, &config.api_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("backend url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "backend url {base_url} cannot carry a path"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn fetch_context(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        let url = self.endpoint(&["context", user_id]);
        tracing::debug!(%url, "fetching context");

        let body: ContextResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.into_messages())
    }

    async fn reset_context(&self, user_id: &str) -> Result<()> {
        let url = self.endpoint(&["context"]);
        tracing::debug!(%url, user_id, "resetting context");

        self.client
            .post(url)
            .json(&ResetContextRequest::clear(user_id))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn open_stream(&self, user_id: &str, message: &str) -> Result<FragmentStream> {
        let url = self.endpoint(&["chat"]);
        let query = ChatQuery {
            user_id: user_id.to_string(),
            message: message.to_string(),
        };
        tracing::debug!(%url, user_id, "opening chat stream");

        let response = self
            .client
            .get(url)
            .query(&query)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        let frames = response.bytes_stream().eventsource().map(|event| match event {
            Ok(event) if event.event == DONE_EVENT || event.data == DONE_DATA => {
                Ok(StreamFrame::Done)
            }
            Ok(event) => Ok(StreamFrame::Fragment(event.data)),
            Err(e) => Err(ClientError::Stream(e.to_string())),
        });
        Ok(frames.boxed())
    }
}
