//! Client layer: orchestrates transport calls and maps transport ↔ domain.

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    ApiToken, BULK_CONCURRENCY, Balance, BulkStrategy, Customized, Dispatch, DispatchResult,
    GatewayResponse, Message, MessageContent, MessageOutcome, MessageText, Password, PhoneNumber,
    Receivers, SendFailure, SenderId, Username, ValidationError,
};
use crate::transport::{self, ResponseShape};

const DEFAULT_BASE_URL: &str = "http://2wcapi.codel.tech";
const SINGLE_SMS_CUSTOM_SENDER_PATH: &str = "/single-sms/v2/api";
const SINGLE_SMS_DEFAULT_SENDER_PATH: &str = "/single-sms/v1/api";
const MULTIPLE_SMS_PATH: &str = "/multiple-sms/v1/api";
const CREDIT_BALANCE_PATH: &str = "/credit-balance-request/v1/api";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Boxed error returned by customization callbacks.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Per-message customization callback.
///
/// Invoked once per receiver with the normalized receiver and the text resolved
/// for it (empty when none was given).
pub type Customizer =
    Arc<dyn Fn(&PhoneNumber, &str) -> Result<Customized, BoxError> + Send + Sync>;

#[derive(Debug, Clone)]
struct HttpResponse {
    status: u16,
    body: String,
}

trait HttpTransport: Send + Sync {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: Value,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>>;
}

#[derive(Debug, Clone)]
struct ReqwestTransport {
    client: reqwest::Client,
}

impl HttpTransport for ReqwestTransport {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: Value,
    ) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(&body)
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

#[derive(Debug, Clone)]
/// Credentials for Codel API calls.
///
/// Only [`Credentials::Token`] can send messages. [`Credentials::Login`] is accepted
/// when a client is built, but every call made with it fails with
/// [`CodelError::UnsupportedAuth`].
pub enum Credentials {
    /// Authenticate via API token.
    Token(ApiToken),
    /// Authenticate via account username + password.
    Login { username: Username, password: Password },
}

impl Credentials {
    /// Create [`Credentials::Token`] from a non-empty token.
    pub fn token(value: impl Into<String>) -> Result<Self, ValidationError> {
        let token = ApiToken::new(value).map_err(|_| ValidationError::MalformedConfig {
            reason: "API token can not be empty",
        })?;
        Ok(Self::Token(token))
    }

    /// Create [`Credentials::Login`] and validate that both parts are non-empty.
    pub fn login(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let username = Username::new(username).map_err(|_| ValidationError::MalformedConfig {
            reason: "username can not be empty",
        })?;
        let password = Password::new(password).map_err(|_| ValidationError::MalformedConfig {
            reason: "password can not be empty",
        })?;
        Ok(Self::Login { username, password })
    }

    /// Read credentials from untyped configuration.
    ///
    /// A JSON string is an API token; an object must carry non-empty `username` and
    /// `password`. Numeric fields and `true` are read as their text form. Any other
    /// shape is rejected.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        match value {
            Value::String(token) => Self::token(token.as_str()),
            Value::Object(map) => {
                let field = |name: &str| match map.get(name) {
                    Some(Value::String(value)) => value.clone(),
                    Some(Value::Number(value)) => value.to_string(),
                    Some(Value::Bool(true)) => "1".to_owned(),
                    _ => String::new(),
                };
                Self::login(field(Username::FIELD), field(Password::FIELD))
            }
            _ => Err(ValidationError::MalformedConfig {
                reason: "config should be an API token or a mapping with username and password",
            }),
        }
    }

    fn api_token(&self) -> Result<&ApiToken, CodelError> {
        match self {
            Self::Token(token) => Ok(token),
            Self::Login { .. } => Err(CodelError::UnsupportedAuth),
        }
    }
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`CodelClient`].
///
/// Gateway rejections and HTTP failures of individual messages are not errors: they
/// show up as a failed [`GatewayResponse`] or as a [`SendFailure`] inside a
/// [`DispatchResult`].
pub enum CodelError {
    /// HTTP client / transport failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// A 200 response body could not be parsed as the expected format.
    #[error("parse error: {0}")]
    Parse(#[source] BoxError),

    /// The configured base URL is not a valid URL.
    #[error("invalid base URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// Sending with username/password credentials is not implemented by the gateway client.
    #[error("username/password authentication is not supported; use an API token")]
    UnsupportedAuth,

    /// A request was rejected before anything was sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Clone)]
/// Builder for [`CodelClient`].
///
/// Use this when you need a custom sender id, bulk strategy, customization callback,
/// endpoint, timeout, or user-agent.
pub struct CodelClientBuilder {
    credentials: Credentials,
    base_url: String,
    sender_id: Option<SenderId>,
    bulk_strategy: BulkStrategy,
    customize: Option<Customizer>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl fmt::Debug for CodelClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodelClientBuilder")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("sender_id", &self.sender_id)
            .field("bulk_strategy", &self.bulk_strategy)
            .field("customize", &self.customize.is_some())
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl CodelClientBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_owned(),
            sender_id: None,
            bulk_strategy: BulkStrategy::default(),
            customize: None,
            timeout: None,
            user_agent: None,
        }
    }

    /// Override the gateway base URL (scheme, host and optional port).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send from a custom sender id. This also switches single-message sends to the
    /// custom-sender endpoint.
    pub fn sender_id(mut self, sender_id: SenderId) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    pub fn bulk_strategy(mut self, bulk_strategy: BulkStrategy) -> Self {
        self.bulk_strategy = bulk_strategy;
        self
    }

    /// Customize every message built by [`CodelClient::send`].
    pub fn customize<F>(mut self, customize: F) -> Self
    where
        F: Fn(&PhoneNumber, &str) -> Result<Customized, BoxError> + Send + Sync + 'static,
    {
        self.customize = Some(Arc::new(customize));
        self
    }

    /// Set an HTTP client timeout applied to each request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build a [`CodelClient`].
    pub fn build(self) -> Result<CodelClient, CodelError> {
        let base_url = url::Url::parse(&self.base_url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|err| CodelError::Transport(Box::new(err)))?;

        Ok(CodelClient {
            credentials: self.credentials,
            base_url: base_url.as_str().trim_end_matches('/').to_owned(),
            sender_id: self.sender_id,
            bulk_strategy: self.bulk_strategy,
            customize: self.customize,
            http: Arc::new(ReqwestTransport { client }),
        })
    }
}

#[derive(Clone)]
/// High-level Codel SMS client.
///
/// Configuration is fixed at construction; the client holds no other state and can
/// be cloned and shared freely. By default it talks to `http://2wcapi.codel.tech`
/// and fans bulk sends out concurrently.
pub struct CodelClient {
    credentials: Credentials,
    base_url: String,
    sender_id: Option<SenderId>,
    bulk_strategy: BulkStrategy,
    customize: Option<Customizer>,
    http: Arc<dyn HttpTransport>,
}

impl fmt::Debug for CodelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodelClient")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("sender_id", &self.sender_id)
            .field("bulk_strategy", &self.bulk_strategy)
            .field("customize", &self.customize.is_some())
            .finish_non_exhaustive()
    }
}

impl CodelClient {
    /// Create a client with default settings.
    ///
    /// For more customization, use [`CodelClient::builder`].
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_owned(),
            sender_id: None,
            bulk_strategy: BulkStrategy::default(),
            customize: None,
            http: Arc::new(ReqwestTransport {
                client: reqwest::Client::new(),
            }),
        }
    }

    /// Start building a client with custom settings.
    pub fn builder(credentials: Credentials) -> CodelClientBuilder {
        CodelClientBuilder::new(credentials)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn single_sms_endpoint(&self) -> String {
        match self.sender_id {
            Some(_) => self.endpoint(SINGLE_SMS_CUSTOM_SENDER_PATH),
            None => self.endpoint(SINGLE_SMS_DEFAULT_SENDER_PATH),
        }
    }

    /// Send text to one or more receivers.
    ///
    /// `receivers` may be a comma-separated string or a list. Blank receivers are
    /// skipped. If exactly one message results it is sent with
    /// [`send_one`](Self::send_one); otherwise the configured [`BulkStrategy`] decides
    /// between [`send_bulk`](Self::send_bulk) and [`send_batch`](Self::send_batch).
    ///
    /// Errors (all raised before any request is made):
    /// - [`CodelError::UnsupportedAuth`] for username/password credentials,
    /// - [`ValidationError::Empty`] if there is no text and no customization callback,
    /// - [`ValidationError::ReceiverMessageMismatch`] if a positional message list does
    ///   not have one entry per receiver,
    /// - [`ValidationError::InvalidPhoneNumber`] for a malformed receiver,
    /// - [`ValidationError::InvalidCustomization`] if the callback fails,
    /// - [`ValidationError::NoMessages`] if every receiver was blank.
    #[instrument(skip_all)]
    pub async fn send(
        &self,
        receivers: impl Into<Receivers>,
        content: impl Into<MessageContent>,
    ) -> Result<Dispatch, CodelError> {
        self.credentials.api_token()?;
        let mut messages = self.build_messages(&receivers.into(), &content.into())?;

        match messages.len() {
            0 => Err(ValidationError::NoMessages.into()),
            1 => {
                let message = messages.remove(0);
                Ok(Dispatch::Single(self.send_one(message).await?))
            }
            _ => match self.bulk_strategy {
                BulkStrategy::Concurrent => Ok(Dispatch::Bulk(self.send_bulk(messages).await?)),
                BulkStrategy::Batch => Ok(Dispatch::Batch(self.send_batch(messages).await?)),
            },
        }
    }

    fn build_messages(
        &self,
        receivers: &Receivers,
        content: &MessageContent,
    ) -> Result<Vec<Message>, ValidationError> {
        if content.is_empty() && self.customize.is_none() {
            return Err(ValidationError::Empty {
                field: MessageText::FIELD,
            });
        }
        if let MessageContent::ByIndex(texts) = content {
            if texts.len() != receivers.len() {
                return Err(ValidationError::ReceiverMessageMismatch {
                    receivers: receivers.len(),
                    messages: texts.len(),
                });
            }
        }

        let mut messages = Vec::with_capacity(receivers.len());
        for (index, receiver) in receivers.iter().enumerate() {
            if receiver.is_empty() {
                debug!(index, "skipping blank receiver");
                continue;
            }
            let phone = PhoneNumber::normalize(receiver)?;
            let text = content.text_for(index, receiver, &phone);

            let message = match &self.customize {
                None => Message::to(phone, MessageText::new(text)?),
                Some(customize) => match customize(&phone, text) {
                    Ok(Customized::Text(text)) => Message::to(phone, MessageText::new(text)?),
                    Ok(Customized::Message(message)) => match message.destination() {
                        Some(_) => message,
                        None => message.addressed_to(phone),
                    },
                    Err(err) => {
                        return Err(ValidationError::InvalidCustomization {
                            receiver: receiver.to_owned(),
                            reason: err.to_string(),
                        });
                    }
                },
            };
            messages.push(message);
        }
        Ok(messages)
    }

    /// Send one message to the single-message endpoint.
    ///
    /// A non-200 answer or a transport failure is reported as
    /// [`GatewayResponse::failed`], not as an error.
    ///
    /// Errors:
    /// - [`CodelError::UnsupportedAuth`] for username/password credentials,
    /// - [`CodelError::Validation`] if the message has no destination,
    /// - [`CodelError::Parse`] if a 200 answer is not valid JSON.
    #[instrument(skip_all, fields(reference = message.reference().as_str()))]
    pub async fn send_one(&self, message: Message) -> Result<GatewayResponse, CodelError> {
        let token = self.credentials.api_token()?;
        let body =
            transport::encode_single_sms_body(message.serialize()?, token, self.sender_id.as_ref());
        let url = self.single_sms_endpoint();

        debug!(url = %url, "sending message");
        match self.post_message(&url, body).await {
            Ok(response) => Ok(response),
            Err(SendFailure::Parse(reason)) => Err(CodelError::Parse(reason.into())),
            Err(failure) => {
                warn!(error = %failure, "message was not accepted");
                Ok(GatewayResponse::failed())
            }
        }
    }

    /// Send every message with its own request, at most [`BULK_CONCURRENCY`] at a
    /// time, and wait for all of them.
    pub async fn send_bulk(&self, messages: Vec<Message>) -> Result<DispatchResult, CodelError> {
        self.send_bulk_with(messages, |_| {}).await
    }

    /// Like [`send_bulk`](Self::send_bulk), calling `on_result` as each message completes.
    ///
    /// A failing message never cancels the others; its failure is recorded in its
    /// [`MessageOutcome`].
    ///
    /// Errors (raised before any request is made):
    /// - [`CodelError::UnsupportedAuth`] for username/password credentials,
    /// - [`ValidationError::NoMessages`] for an empty list,
    /// - [`ValidationError::Empty`] if a message has no destination.
    #[instrument(skip_all, fields(count = messages.len()))]
    pub async fn send_bulk_with<F>(
        &self,
        messages: Vec<Message>,
        mut on_result: F,
    ) -> Result<DispatchResult, CodelError>
    where
        F: FnMut(&MessageOutcome) + Send,
    {
        let token = self.credentials.api_token()?;
        if messages.is_empty() {
            return Err(ValidationError::NoMessages.into());
        }

        let requests = messages
            .into_iter()
            .enumerate()
            .map(|(index, message)| -> Result<_, ValidationError> {
                let body = transport::encode_single_sms_body(
                    message.serialize()?,
                    token,
                    self.sender_id.as_ref(),
                );
                Ok((index, message, body))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let url = self.single_sms_endpoint();
        let url = url.as_str();
        debug!(url, concurrency = BULK_CONCURRENCY, "sending messages");

        let mut in_flight = stream::iter(requests)
            .map(|(index, message, body)| async move {
                let result = self.post_message(url, body).await;
                if let Err(failure) = &result {
                    warn!(index, error = %failure, "message was not accepted");
                }
                MessageOutcome {
                    index,
                    message,
                    result,
                }
            })
            .buffer_unordered(BULK_CONCURRENCY);

        let mut outcomes = Vec::new();
        while let Some(outcome) = in_flight.next().await {
            on_result(&outcome);
            outcomes.push(outcome);
        }

        let result = DispatchResult::from_outcomes(outcomes);
        info!(
            status = result.status.as_str(),
            total = result.total_count,
            succeeded = result.success_count,
            failed = result.fail_count,
            "bulk send finished"
        );
        Ok(result)
    }

    /// Send every message in one request to the multiple-message endpoint.
    ///
    /// The batch status comes from the first entry of the gateway's answer. A non-200
    /// answer or a transport failure is reported as [`GatewayResponse::failed`].
    ///
    /// Errors:
    /// - [`CodelError::UnsupportedAuth`] for username/password credentials,
    /// - [`ValidationError::NoMessages`] for an empty list,
    /// - [`ValidationError::Empty`] if a message has no destination,
    /// - [`CodelError::Parse`] if a 200 answer is not a JSON array.
    #[instrument(skip_all, fields(count = messages.len()))]
    pub async fn send_batch(&self, messages: Vec<Message>) -> Result<GatewayResponse, CodelError> {
        let token = self.credentials.api_token()?;
        if messages.is_empty() {
            return Err(ValidationError::NoMessages.into());
        }

        let fields = messages
            .iter()
            .map(Message::serialize)
            .collect::<Result<Vec<_>, _>>()?;
        let batch_number = uuid::Uuid::new_v4().simple().to_string();
        let body =
            transport::encode_batch_body(fields, token, self.sender_id.as_ref(), &batch_number);
        let url = self.endpoint(MULTIPLE_SMS_PATH);

        debug!(url = %url, batch_number = %batch_number, "sending batch");
        let response = match self.http.post_json(&url, body).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "batch request failed");
                return Ok(GatewayResponse::failed());
            }
        };
        if response.status != 200 {
            warn!(status = response.status, "batch was not accepted");
        }

        transport::decode_gateway_response(response.status, &response.body, ResponseShape::Batch)
            .map_err(|err| CodelError::Parse(Box::new(err)))
    }

    /// Query the account's SMS credit balance.
    ///
    /// Anything but a 200 answer with an integer balance comes back as
    /// [`Balance::Raw`].
    ///
    /// Errors:
    /// - [`CodelError::UnsupportedAuth`] for username/password credentials,
    /// - [`CodelError::Transport`] if the request could not be made.
    #[instrument(skip(self))]
    pub async fn get_balance(&self) -> Result<Balance, CodelError> {
        let token = self.credentials.api_token()?;
        let body = transport::encode_balance_body(token);

        let response = self
            .http
            .post_json(&self.endpoint(CREDIT_BALANCE_PATH), body)
            .await
            .map_err(CodelError::Transport)?;

        let balance = transport::decode_balance_response(response.status, &response.body);
        if let Balance::Raw(_) = &balance {
            warn!(status = response.status, "unexpected balance answer");
        }
        Ok(balance)
    }

    async fn post_message(&self, url: &str, body: Value) -> Result<GatewayResponse, SendFailure> {
        let response = self
            .http
            .post_json(url, body)
            .await
            .map_err(|err| SendFailure::Transport(err.to_string()))?;

        if response.status != 200 {
            let body = if response.body.trim().is_empty() {
                None
            } else {
                Some(response.body)
            };
            return Err(SendFailure::HttpStatus {
                status: response.status,
                body,
            });
        }

        transport::decode_gateway_response(response.status, &response.body, ResponseShape::Single)
            .map_err(|err| SendFailure::Parse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::io;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::domain::{DispatchStatus, MessageReference};

    use super::*;

    const OK_BODY: &str = r#"{"status":"success","charge":1,"messageId":"abc123"}"#;

    #[derive(Debug, Clone)]
    enum FakeResponse {
        Http(u16, String),
        Unreachable,
    }

    impl FakeResponse {
        fn ok(body: &str) -> Self {
            Self::Http(200, body.to_owned())
        }
    }

    #[derive(Debug, Clone)]
    struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    #[derive(Debug)]
    struct FakeTransportState {
        requests: Vec<(String, Value)>,
        default_response: FakeResponse,
        by_destination: HashMap<String, FakeResponse>,
    }

    impl FakeTransport {
        fn new(response: FakeResponse) -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeTransportState {
                    requests: Vec::new(),
                    default_response: response,
                    by_destination: HashMap::new(),
                })),
                in_flight: Arc::new(AtomicUsize::new(0)),
                max_in_flight: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn respond_to(self, destination: &str, response: FakeResponse) -> Self {
            self.state
                .lock()
                .unwrap()
                .by_destination
                .insert(destination.to_owned(), response);
            self
        }

        fn requests(&self) -> Vec<(String, Value)> {
            self.state.lock().unwrap().requests.clone()
        }

        fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    impl HttpTransport for FakeTransport {
        fn post_json<'a>(
            &'a self,
            url: &'a str,
            body: Value,
        ) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
            Box::pin(async move {
                let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(current, Ordering::SeqCst);
                tokio::task::yield_now().await;

                let response = {
                    let mut state = self.state.lock().unwrap();
                    let response = body
                        .get("destination")
                        .and_then(Value::as_str)
                        .and_then(|it| state.by_destination.get(it))
                        .unwrap_or(&state.default_response)
                        .clone();
                    state.requests.push((url.to_owned(), body));
                    response
                };

                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                match response {
                    FakeResponse::Http(status, body) => Ok(HttpResponse { status, body }),
                    FakeResponse::Unreachable => Err(Box::new(io::Error::new(
                        io::ErrorKind::ConnectionRefused,
                        "connection refused",
                    )) as BoxError),
                }
            })
        }
    }

    fn make_client(credentials: Credentials, transport: FakeTransport) -> CodelClient {
        CodelClient {
            credentials,
            base_url: "https://example.invalid".to_owned(),
            sender_id: None,
            bulk_strategy: BulkStrategy::Concurrent,
            customize: None,
            http: Arc::new(transport),
        }
    }

    fn token_client(transport: FakeTransport) -> CodelClient {
        make_client(Credentials::token("test_token").unwrap(), transport)
    }

    fn sent_destinations(transport: &FakeTransport) -> Vec<String> {
        let mut destinations = transport
            .requests()
            .iter()
            .filter_map(|(_, body)| body["destination"].as_str().map(str::to_owned))
            .collect::<Vec<_>>();
        destinations.sort();
        destinations
    }

    #[tokio::test]
    async fn send_one_includes_token_and_parses_ok_response() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let client = token_client(transport.clone());

        let message = Message::new("0771000001", "Test message")
            .unwrap()
            .with_reference(MessageReference::new("#ref1").unwrap());
        let response = client.send_one(message).await.unwrap();
        assert!(response.is_ok());
        assert_eq!(response.credits_used(), 1);
        assert_eq!(response.message_id(), Some("abc123"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let (url, body) = &requests[0];
        assert_eq!(url, "https://example.invalid/single-sms/v1/api");
        assert_eq!(body["token"], "test_token");
        assert_eq!(body["destination"], "263771000001");
        assert_eq!(body["messageText"], "Test message");
        assert_eq!(body["messageReference"], "#ref1");
        assert_eq!(body["messageValidity"], "03:00");
        assert!(body.get("sender_id").is_none());
    }

    #[tokio::test]
    async fn send_reports_gateway_status() {
        let client = token_client(FakeTransport::new(FakeResponse::ok(r#"{"status":"success"}"#)));
        let dispatch = client.send("263771000001", "Test message").await.unwrap();
        assert!(matches!(&dispatch, Dispatch::Single(response) if response.is_ok()));

        let client = token_client(FakeTransport::new(FakeResponse::ok(r#"{"status":"failed"}"#)));
        let dispatch = client.send("263771000001", "Test message").await.unwrap();
        assert!(matches!(&dispatch, Dispatch::Single(response) if !response.is_ok()));
    }

    #[tokio::test]
    async fn custom_sender_switches_endpoint_and_adds_field() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let mut client = token_client(transport.clone());
        client.sender_id = Some(SenderId::new("ACME").unwrap());

        let message = Message::new("263771000001", "hi").unwrap();
        client.send_one(message).await.unwrap();

        let (url, body) = &transport.requests()[0];
        assert_eq!(url, "https://example.invalid/single-sms/v2/api");
        assert_eq!(body["sender_id"], "ACME");
    }

    #[tokio::test]
    async fn send_one_maps_non_200_and_transport_failures_to_failed_response() {
        let client = token_client(FakeTransport::new(FakeResponse::Http(
            500,
            "oops".to_owned(),
        )));
        let message = Message::new("263771000001", "hi").unwrap();
        let response = client.send_one(message).await.unwrap();
        assert_eq!(response, GatewayResponse::failed());

        let client = token_client(FakeTransport::new(FakeResponse::Unreachable));
        let message = Message::new("263771000001", "hi").unwrap();
        let response = client.send_one(message).await.unwrap();
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn send_one_maps_invalid_json_to_parse_error() {
        let client = token_client(FakeTransport::new(FakeResponse::ok("{ not json }")));
        let message = Message::new("263771000001", "hi").unwrap();
        let err = client.send_one(message).await.unwrap_err();
        assert!(matches!(err, CodelError::Parse(_)));
        assert_eq!(err.to_string().matches("parse error").count(), 1, "{err}");
    }

    #[tokio::test]
    async fn loosely_typed_ok_answers_count_as_sent() {
        let transport = FakeTransport::new(FakeResponse::ok(
            r#"{"status":"success","charge":1,"scheduled":0}"#,
        ))
        .respond_to(
            "263772000002",
            FakeResponse::ok(r#"{"status":"success","charge":1.5}"#),
        );
        let client = token_client(transport);

        let message = Message::new("263771000001", "hi").unwrap();
        let response = client.send_one(message).await.unwrap();
        assert!(response.is_ok());
        assert!(!response.scheduled);

        let messages = vec![
            Message::new("263771000001", "hi").unwrap(),
            Message::new("263772000002", "hi").unwrap(),
        ];
        let result = client.send_bulk(messages).await.unwrap();
        assert_eq!(result.status, DispatchStatus::Success);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.fail_count, 0);
    }

    #[tokio::test]
    async fn send_one_rejects_unaddressed_message() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let client = token_client(transport.clone());
        let err = client
            .send_one(Message::unaddressed("hi").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CodelError::Validation(ValidationError::Empty {
                field: PhoneNumber::FIELD
            })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn login_credentials_are_accepted_but_cannot_send() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let client = make_client(
            Credentials::login("admin", "supersecret").unwrap(),
            transport.clone(),
        );

        let err = client.send("263771000001", "hi").await.unwrap_err();
        assert!(matches!(err, CodelError::UnsupportedAuth));

        let message = Message::new("263771000001", "hi").unwrap();
        let err = client.send_one(message).await.unwrap_err();
        assert!(matches!(err, CodelError::UnsupportedAuth));

        let err = client.get_balance().await.unwrap_err();
        assert!(matches!(err, CodelError::UnsupportedAuth));

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn comma_separated_receivers_match_receiver_list() {
        let from_string = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let dispatch = token_client(from_string.clone())
            .send("263771000001,263772000002, 0773000003", "Test message")
            .await
            .unwrap();
        assert!(matches!(&dispatch, Dispatch::Bulk(result) if result.total_count == 3));

        let from_list = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let dispatch = token_client(from_list.clone())
            .send(
                vec!["263771000001", "263772000002", "0773000003"],
                "Test message",
            )
            .await
            .unwrap();
        assert!(matches!(&dispatch, Dispatch::Bulk(result) if result.total_count == 3));

        assert_eq!(sent_destinations(&from_string), sent_destinations(&from_list));
        assert_eq!(
            sent_destinations(&from_list),
            vec!["263771000001", "263772000002", "263773000003"]
        );
    }

    #[tokio::test]
    async fn send_rejects_mismatched_receivers_and_messages_before_network() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let client = token_client(transport.clone());

        let err = client
            .send(vec!["263771000001"], vec!["message1", "message2"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CodelError::Validation(ValidationError::ReceiverMessageMismatch {
                receivers: 1,
                messages: 2
            })
        ));

        let err = client
            .send(
                vec!["263771000001", "263772000002", "263773000003"],
                vec!["message1", "message2"],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CodelError::Validation(ValidationError::ReceiverMessageMismatch { .. })
        ));

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn send_rejects_empty_message() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let client = token_client(transport.clone());

        let err = client.send(vec!["263771000001"], "").await.unwrap_err();
        assert!(matches!(
            err,
            CodelError::Validation(ValidationError::Empty {
                field: MessageText::FIELD
            })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn send_rejects_invalid_receiver_before_network() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let client = token_client(transport.clone());

        let err = client
            .send("263771000001,77100000", "hi")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CodelError::Validation(ValidationError::InvalidPhoneNumber { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn blank_receivers_are_skipped() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let client = token_client(transport.clone());

        let dispatch = client.send("263771000001,", "hi").await.unwrap();
        assert!(matches!(dispatch, Dispatch::Single(_)));
        assert_eq!(transport.requests().len(), 1);

        let err = client.send(" , ,", "hi").await.unwrap_err();
        assert!(matches!(
            err,
            CodelError::Validation(ValidationError::NoMessages)
        ));
    }

    #[tokio::test]
    async fn messages_by_receiver_and_by_index_resolve_per_receiver() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let client = token_client(transport.clone());

        let mut texts = BTreeMap::new();
        texts.insert("263771000001".to_owned(), "first".to_owned());
        texts.insert("0772000002".to_owned(), "second".to_owned());
        client
            .send(vec!["263771000001", "263772000002"], texts)
            .await
            .unwrap();

        client
            .send(vec!["263773000003", "263774000004"], vec!["third", "fourth"])
            .await
            .unwrap();

        let mut sent = transport
            .requests()
            .iter()
            .map(|(_, body)| {
                (
                    body["destination"].as_str().unwrap().to_owned(),
                    body["messageText"].as_str().unwrap().to_owned(),
                )
            })
            .collect::<Vec<_>>();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                ("263771000001".to_owned(), "first".to_owned()),
                ("263772000002".to_owned(), "second".to_owned()),
                ("263773000003".to_owned(), "third".to_owned()),
                ("263774000004".to_owned(), "fourth".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn receiver_missing_from_map_is_rejected() {
        let client = token_client(FakeTransport::new(FakeResponse::ok(OK_BODY)));
        let mut texts = BTreeMap::new();
        texts.insert("263771000001".to_owned(), "first".to_owned());

        let err = client
            .send(vec!["263771000001", "263772000002"], texts)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CodelError::Validation(ValidationError::Empty {
                field: MessageText::FIELD
            })
        ));
    }

    #[tokio::test]
    async fn bulk_send_aggregates_partial_failures() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY))
            .respond_to("263772000002", FakeResponse::Http(500, "oops".to_owned()))
            .respond_to("263774000004", FakeResponse::Unreachable);
        let client = token_client(transport.clone());

        let messages = (1..=5)
            .map(|n| Message::new(format!("26377{n}00000{n}"), format!("message {n}")).unwrap())
            .collect::<Vec<_>>();

        let mut seen = Vec::new();
        let result = client
            .send_bulk_with(messages, |outcome| seen.push(outcome.index))
            .await
            .unwrap();

        assert_eq!(result.status, DispatchStatus::Partial);
        assert_eq!(result.total_count, 5);
        assert_eq!(result.success_count, 3);
        assert_eq!(result.fail_count, 2);
        assert_eq!(result.outcomes.len(), 5);

        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        for outcome in result.ordered() {
            let n = outcome.index + 1;
            let destination = format!("26377{n}00000{n}");
            assert_eq!(
                outcome.message.destination().map(PhoneNumber::as_str),
                Some(destination.as_str())
            );
            assert_eq!(outcome.message.text().as_str(), format!("message {n}"));
            match n {
                2 => assert!(matches!(
                    outcome.error(),
                    Some(SendFailure::HttpStatus { status: 500, .. })
                )),
                4 => assert!(matches!(outcome.error(), Some(SendFailure::Transport(_)))),
                _ => assert!(outcome.response().is_some_and(GatewayResponse::is_ok)),
            }
        }
    }

    #[tokio::test]
    async fn bulk_send_reports_failed_when_nothing_succeeds() {
        let client = token_client(FakeTransport::new(FakeResponse::Http(503, String::new())));
        let messages = vec![
            Message::new("263771000001", "a").unwrap(),
            Message::new("263772000002", "b").unwrap(),
        ];

        let result = client.send_bulk(messages).await.unwrap();
        assert_eq!(result.status, DispatchStatus::Failed);
        assert_eq!(result.fail_count, 2);
        assert!(result.outcomes.iter().all(|it| matches!(
            it.error(),
            Some(SendFailure::HttpStatus {
                status: 503,
                body: None
            })
        )));
    }

    #[tokio::test]
    async fn bulk_send_limits_requests_in_flight() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let client = token_client(transport.clone());
        let messages = (0..10)
            .map(|n| Message::new(format!("26377100000{n}"), "hi").unwrap())
            .collect::<Vec<_>>();

        let result = client.send_bulk(messages).await.unwrap();
        assert_eq!(result.success_count, 10);
        assert_eq!(transport.requests().len(), 10);
        assert_eq!(transport.max_in_flight(), BULK_CONCURRENCY);
    }

    #[tokio::test]
    async fn bulk_send_rejects_empty_list() {
        let client = token_client(FakeTransport::new(FakeResponse::ok(OK_BODY)));
        let err = client.send_bulk(Vec::new()).await.unwrap_err();
        assert!(matches!(
            err,
            CodelError::Validation(ValidationError::NoMessages)
        ));
    }

    #[tokio::test]
    async fn batch_strategy_sends_one_request() {
        let body = json!([{ "status": { "error_status": "success" } }]).to_string();
        let transport = FakeTransport::new(FakeResponse::ok(&body));
        let mut client = token_client(transport.clone());
        client.bulk_strategy = BulkStrategy::Batch;

        let dispatch = client
            .send(vec!["263771000001", "263772000002"], "Test message")
            .await
            .unwrap();
        assert!(matches!(&dispatch, Dispatch::Batch(response) if response.is_ok()));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let (url, body) = &requests[0];
        assert_eq!(url, "https://example.invalid/multiple-sms/v1/api");
        assert_eq!(body["auth"]["token"], "test_token");
        assert!(body["payload"]["batchNumber"].is_string());
        let messages = body["payload"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["destination"], "263771000001");
        assert_eq!(messages[1]["destination"], "263772000002");
    }

    #[tokio::test]
    async fn batch_reports_first_entry_status() {
        let body = json!([{ "status": { "error_status": "failed" } }]).to_string();
        let client = token_client(FakeTransport::new(FakeResponse::ok(&body)));
        let messages = vec![
            Message::new("263771000001", "a").unwrap(),
            Message::new("263772000002", "b").unwrap(),
        ];
        let response = client.send_batch(messages).await.unwrap();
        assert_eq!(response.status(), "FAILED");
        assert!(!response.is_ok());

        let client = token_client(FakeTransport::new(FakeResponse::Unreachable));
        let messages = vec![Message::new("263771000001", "a").unwrap()];
        assert!(!client.send_batch(messages).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn customization_callback_shapes_each_message() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let mut client = token_client(transport.clone());
        client.customize = Some(Arc::new(
            |phone: &PhoneNumber, text: &str| -> Result<Customized, BoxError> {
                Ok(match phone.as_str() {
                    "263771000001" => Customized::from(format!("{text} for one")),
                    "263772000002" => Customized::from(Message::unaddressed("drafted")?),
                    _ => Customized::from(Message::new("263779999999", "redirected")?),
                })
            },
        ));

        let result = client
            .send(
                vec!["263771000001", "263772000002", "263773000003"],
                "hello",
            )
            .await
            .unwrap();
        assert!(result.is_ok());

        let mut sent = transport
            .requests()
            .iter()
            .map(|(_, body)| {
                (
                    body["destination"].as_str().unwrap().to_owned(),
                    body["messageText"].as_str().unwrap().to_owned(),
                )
            })
            .collect::<Vec<_>>();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                ("263771000001".to_owned(), "hello for one".to_owned()),
                ("263772000002".to_owned(), "drafted".to_owned()),
                ("263779999999".to_owned(), "redirected".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn customization_callback_allows_empty_content() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let mut client = token_client(transport.clone());
        client.customize = Some(Arc::new(
            |phone: &PhoneNumber, _: &str| -> Result<Customized, BoxError> {
                Ok(Customized::from(format!("Hi {phone}")))
            },
        ));

        let dispatch = client.send("263771000001", "").await.unwrap();
        assert!(dispatch.is_ok());
        assert_eq!(
            transport.requests()[0].1["messageText"],
            "Hi 263771000001"
        );
    }

    #[tokio::test]
    async fn customization_failure_is_fatal() {
        let transport = FakeTransport::new(FakeResponse::ok(OK_BODY));
        let mut client = token_client(transport.clone());
        client.customize = Some(Arc::new(
            |_: &PhoneNumber, _: &str| -> Result<Customized, BoxError> {
                Err("unsupported value".into())
            },
        ));

        let err = client
            .send(vec!["263771000001", "263772000002"], "hi")
            .await
            .unwrap_err();
        match err {
            CodelError::Validation(ValidationError::InvalidCustomization { receiver, reason }) => {
                assert_eq!(receiver, "263771000001");
                assert_eq!(reason, "unsupported value");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn get_balance_reads_credits_or_keeps_raw_body() {
        let transport = FakeTransport::new(FakeResponse::ok(r#"{"sms_credit_balance": 500}"#));
        let client = token_client(transport.clone());
        assert_eq!(client.get_balance().await.unwrap(), Balance::Credits(500));

        let (url, body) = &transport.requests()[0];
        assert_eq!(url, "https://example.invalid/credit-balance-request/v1/api");
        assert_eq!(body, &json!({ "token": "test_token" }));

        let client = token_client(FakeTransport::new(FakeResponse::Http(
            401,
            r#"{"error":"invalid token"}"#.to_owned(),
        )));
        assert_eq!(
            client.get_balance().await.unwrap(),
            Balance::Raw(json!({ "error": "invalid token" }))
        );

        let client = token_client(FakeTransport::new(FakeResponse::Unreachable));
        assert!(matches!(
            client.get_balance().await.unwrap_err(),
            CodelError::Transport(_)
        ));
    }

    #[test]
    fn credentials_validate_shapes() {
        assert!(Credentials::token("a-valid-api-token-key").is_ok());
        assert!(Credentials::login("admin", "supersecret").is_ok());

        for config in [
            json!("a-valid-api-token-key"),
            json!({ "username": "admin", "password": "supersecret" }),
            json!({ "username": "admin", "password": 12345 }),
        ] {
            assert!(Credentials::from_value(&config).is_ok(), "config: {config}");
        }

        for config in [
            json!(""),
            json!({}),
            json!({ "username": "admin" }),
            json!({ "password": "supersecret" }),
            json!({ "username": "", "password": "supersecret" }),
            json!(null),
            json!(42),
            json!(["admin", "supersecret"]),
        ] {
            assert!(
                matches!(
                    Credentials::from_value(&config),
                    Err(ValidationError::MalformedConfig { .. })
                ),
                "config: {config}"
            );
        }
    }

    #[test]
    fn builder_normalizes_base_url_and_rejects_invalid_ones() {
        let client = CodelClient::builder(Credentials::token("key").unwrap())
            .base_url("http://127.0.0.1:8080/")
            .build()
            .unwrap();
        assert_eq!(
            client.single_sms_endpoint(),
            "http://127.0.0.1:8080/single-sms/v1/api"
        );

        let client = CodelClient::builder(Credentials::token("key").unwrap())
            .sender_id(SenderId::new("ACME").unwrap())
            .build()
            .unwrap();
        assert_eq!(
            client.single_sms_endpoint(),
            "http://2wcapi.codel.tech/single-sms/v2/api"
        );

        let err = CodelClient::builder(Credentials::token("key").unwrap())
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, CodelError::InvalidEndpoint(_)));
    }

    #[test]
    fn client_debug_hides_transport_and_callback() {
        let client = CodelClient::builder(Credentials::token("key").unwrap())
            .customize(|_: &PhoneNumber, text: &str| -> Result<Customized, BoxError> {
                Ok(text.into())
            })
            .build()
            .unwrap();
        let debug = format!("{client:?}");
        assert!(debug.starts_with("CodelClient {"), "{debug}");
        assert!(debug.contains("customize: true"), "{debug}");
        assert!(!debug.contains("ReqwestTransport"), "{debug}");
    }
}
