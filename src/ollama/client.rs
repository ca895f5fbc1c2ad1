use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::error::ClientError;
use crate::adapters::ReqwestHttpClient;
use crate::config::ClientConfig;
use crate::models::{
    ChatCompletionRequest, ChatRequest, CreateModelRequest, DetokenizeRequest, DetokenizeResponse,
    EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, ModelList, ModelNameRequest,
    RunningModels, StopRequest, TokenizeRequest, TokenizeResponse,
};
use crate::stream::{AbortController, StreamFormat, StreamHandler, StreamParserOptions, StreamSession};
use crate::traits::{Headers, HttpClient, Response};

/// Header carrying the per-generation request id.
pub const REQUEST_ID_HEADER: &str = "request-id";

const GENERATE_REQUIRED: &str = "Missing required fields: 'model' and 'prompt' are required";
const CHAT_REQUIRED: &str = "Invalid input: 'model' and 'messages' are required.";
const TOKENIZE_REQUIRED: &str = "Missing required fields: 'model' and 'text' are required";
const DETOKENIZE_REQUIRED: &str = "Missing required fields: 'model' and 'tokens' are required";
const EMBED_REQUIRED: &str = "Missing required fields: 'model' and 'input' are required";
const CREATE_REQUIRED: &str = "'name' and 'modelfile' are required fields";
const MODEL_NAME_REQUIRED: &str = "Model name is required.";

/// Typed client for the model server.
///
/// Streaming operations hand the response body to a [`StreamSession`] and
/// return the handler once the stream has finished, failed or been aborted.
/// Errors that happen before the body starts arriving are returned as
/// [`ClientError`] and never reach the handler.
#[derive(Debug, Clone)]
pub struct OllamaClient<C = ReqwestHttpClient> {
    http: C,
    config: ClientConfig,
}

impl OllamaClient<ReqwestHttpClient> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_http_client(ReqwestHttpClient::new(), config)
    }

    /// Client configured from `OLLAMA_CHAT_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }
}

impl Default for OllamaClient<ReqwestHttpClient> {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl<C: HttpClient> OllamaClient<C> {
    pub fn with_http_client(http: C, config: ClientConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    /// Stream a completion from `POST /api/generate`.
    ///
    /// If the server has not started responding within the configured
    /// request timeout, the call fails with
    /// [`ClientError::Aborted`]`(Timeout)`; `abort` itself is left
    /// untouched. Once streaming, only `abort` stops the session.
    pub async fn generate_stream<H: StreamHandler>(
        &self,
        request: &GenerateRequest,
        handler: H,
        abort: &AbortController,
    ) -> Result<H, ClientError> {
        if is_blank(&request.model) || request.prompt.is_empty() {
            return Err(invalid(GENERATE_REQUIRED));
        }
        let request = GenerateRequest {
            stream: true,
            ..request.clone()
        };

        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(model = %request.model, %request_id, "generate");

        let mut headers = Headers::new();
        headers.insert(REQUEST_ID_HEADER.to_string(), request_id);

        self.stream("/api/generate", &request, headers, StreamFormat::LineJson, handler, abort)
            .await
    }

    /// Non-streaming completion from `POST /api/generate`.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ClientError> {
        if is_blank(&request.model) || request.prompt.is_empty() {
            return Err(invalid(GENERATE_REQUIRED));
        }
        let request = GenerateRequest {
            stream: false,
            ..request.clone()
        };
        self.post_json("/api/generate", &request).await
    }

    /// Stream a chat reply from `POST /api/chat`.
    pub async fn chat_stream<H: StreamHandler>(
        &self,
        request: &ChatRequest,
        handler: H,
        abort: &AbortController,
    ) -> Result<H, ClientError> {
        if is_blank(&request.model) || request.messages.is_empty() {
            return Err(invalid(CHAT_REQUIRED));
        }
        let request = ChatRequest {
            stream: true,
            ..request.clone()
        };
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "chat"
        );

        self.stream("/api/chat", &request, Headers::new(), StreamFormat::LineJson, handler, abort)
            .await
    }

    /// Stream a chat reply from the OpenAI-compatible
    /// `POST /v1/chat/completions`.
    pub async fn chat_completions_stream<H: StreamHandler>(
        &self,
        request: &ChatCompletionRequest,
        handler: H,
        abort: &AbortController,
    ) -> Result<H, ClientError> {
        if is_blank(&request.model) || request.messages.is_empty() {
            return Err(invalid(CHAT_REQUIRED));
        }
        let request = ChatCompletionRequest {
            stream: true,
            ..request.clone()
        };
        tracing::debug!(model = %request.model, "chat completions");

        self.stream(
            "/v1/chat/completions",
            &request,
            Headers::new(),
            StreamFormat::Sse,
            handler,
            abort,
        )
        .await
    }

    pub async fn tokenize(&self, model: &str, text: &str) -> Result<Vec<i64>, ClientError> {
        if is_blank(model) || text.is_empty() {
            return Err(invalid(TOKENIZE_REQUIRED));
        }
        let request = TokenizeRequest {
            model: model.to_string(),
            text: text.to_string(),
        };
        let response: TokenizeResponse = self.post_json("/api/tokenize", &request).await?;
        Ok(response.tokens)
    }

    pub async fn detokenize(&self, model: &str, tokens: &[i64]) -> Result<String, ClientError> {
        if is_blank(model) {
            return Err(invalid(DETOKENIZE_REQUIRED));
        }
        let request = DetokenizeRequest {
            model: model.to_string(),
            tokens: tokens.to_vec(),
        };
        let response: DetokenizeResponse = self.post_json("/api/detokenize", &request).await?;
        Ok(response.text)
    }

    pub async fn embed(&self, model: &str, input: &str) -> Result<EmbedResponse, ClientError> {
        if is_blank(model) {
            return Err(invalid(EMBED_REQUIRED));
        }
        let request = EmbedRequest {
            model: model.to_string(),
            input: input.to_string(),
        };
        self.post_json("/api/embed", &request).await
    }

    /// Locally installed models (`GET /api/tags`).
    pub async fn list_models(&self) -> Result<ModelList, ClientError> {
        self.get_json("/api/tags").await
    }

    /// Modelfile, parameters and template of one model (`POST /api/show`).
    pub async fn show_model(&self, name: &str) -> Result<serde_json::Value, ClientError> {
        let request = model_name(name)?;
        self.post_json("/api/show", &request).await
    }

    /// Models currently loaded in memory (`GET /api/ps`).
    pub async fn running_models(&self) -> Result<RunningModels, ClientError> {
        self.get_json("/api/ps").await
    }

    /// Download a model. Resolves once the server reports completion.
    pub async fn pull_model(&self, name: &str) -> Result<(), ClientError> {
        let request = model_name(name)?;
        let body = encode(&request)?;
        tracing::info!(model = name, "pulling model");
        self.http
            .post(&self.config.endpoint("/api/pull"), &body, &Headers::new())
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn delete_model(&self, name: &str) -> Result<(), ClientError> {
        let request = model_name(name)?;
        let body = encode(&request)?;
        tracing::info!(model = name, "deleting model");
        self.http
            .delete(&self.config.endpoint("/api/delete"), &body, &Headers::new())
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Build a model from a Modelfile (`POST /api/create`).
    pub async fn create_model(&self, name: &str, modelfile: &str) -> Result<(), ClientError> {
        if is_blank(name) || modelfile.trim().is_empty() {
            return Err(invalid(CREATE_REQUIRED));
        }
        let request = CreateModelRequest {
            name: name.to_string(),
            modelfile: modelfile.to_string(),
        };
        let body = encode(&request)?;
        self.http
            .post(&self.config.endpoint("/api/create"), &body, &Headers::new())
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Unload a model from memory.
    pub async fn stop_model(&self, model: &str) -> Result<GenerateResponse, ClientError> {
        if is_blank(model) {
            return Err(invalid(MODEL_NAME_REQUIRED));
        }
        self.post_json("/api/generate", &StopRequest::new(model)).await
    }

    /// True if the server answers `GET /` with a 2xx status.
    pub async fn health_check(&self) -> bool {
        match self.http.get(&self.config.endpoint("/"), &Headers::new()).await {
            Ok(response) => response.is_success(),
            Err(err) => {
                tracing::debug!("health check failed: {}", err);
                false
            }
        }
    }

    async fn stream<B, H>(
        &self,
        path: &str,
        body: &B,
        headers: Headers,
        format: StreamFormat,
        handler: H,
        abort: &AbortController,
    ) -> Result<H, ClientError>
    where
        B: Serialize,
        H: StreamHandler,
    {
        let url = self.config.endpoint(path);
        let body = encode(body)?;
        let mut signal = abort.signal();

        // The deadline has its own controller so the caller's stays reusable.
        let response = {
            let deadline = AbortController::new();
            let _timeout = deadline.abort_after(self.config.request_timeout);
            let mut expired = deadline.signal();
            tokio::select! {
                biased;
                reason = signal.aborted() => {
                    tracing::warn!("{} aborted before responding: {}", path, reason);
                    return Err(ClientError::Aborted(reason));
                }
                reason = expired.aborted() => {
                    tracing::warn!(
                        "{} aborted before responding: {} after {:?}",
                        path,
                        reason,
                        self.config.request_timeout
                    );
                    return Err(ClientError::Aborted(reason));
                }
                result = self.http.post_stream(&url, &body, &headers) => result?,
            }
        };

        tracing::debug!(%format, "{} streaming", path);
        let options = StreamParserOptions::new(format).with_debug(self.config.debug);
        Ok(StreamSession::new(handler, options)
            .parse_with_abort(response, signal)
            .await)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .http
            .get(&self.config.endpoint(path), &Headers::new())
            .await?;
        decode(path, response)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let body = encode(body)?;
        let response = self
            .http
            .post(&self.config.endpoint(path), &body, &Headers::new())
            .await?;
        decode(path, response)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn invalid(message: &str) -> ClientError {
    ClientError::InvalidRequest(message.to_string())
}

fn model_name(name: &str) -> Result<ModelNameRequest, ClientError> {
    if is_blank(name) {
        return Err(invalid(MODEL_NAME_REQUIRED));
    }
    Ok(ModelNameRequest {
        name: name.to_string(),
    })
}

fn encode<B: Serialize>(body: &B) -> Result<String, ClientError> {
    serde_json::to_string(body)
        .map_err(|err| ClientError::InvalidRequest(format!("Could not encode request: {}", err)))
}

fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ClientError> {
    let response = response.error_for_status()?;
    response.json().map_err(|source| ClientError::Decode {
        endpoint: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse};
    use crate::error::StreamError;
    use crate::models::ChatMessage;
    use crate::stream::{AbortReason, ChannelHandler, StreamEvent};
    use crate::traits::HttpError;
    use serde_json::json;
    use std::time::Duration;

    const BASE: &str = "http://ollama.test";

    fn client() -> (OllamaClient<MockHttpClient>, MockHttpClient) {
        let mock = MockHttpClient::new();
        let config = ClientConfig::default().with_base_url(BASE);
        (OllamaClient::with_http_client(mock.clone(), config), mock)
    }

    fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_generate_stream_end_to_end() {
        let (client, mock) = client();
        mock.set_response(
            "http://ollama.test/api/generate",
            MockResponse::chunks([
                "{\"response\":\"Hel\",\"done\":false}\n{\"resp",
                "onse\":\"lo\",\"done\":true,\"context\":[7,8]}\n",
            ]),
        );

        let (handler, rx) = ChannelHandler::channel();
        let request = GenerateRequest::new("llama3.2", "Say hello");
        client
            .generate_stream(&request, handler, &AbortController::new())
            .await
            .unwrap();

        let events = drain(rx);
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], StreamEvent::Finished("Hello".to_string()));

        let sent = mock.last_request().unwrap();
        assert_eq!(sent.method, "POST");
        assert_eq!(
            sent.json().unwrap(),
            json!({"model": "llama3.2", "prompt": "Say hello", "stream": true})
        );
        assert!(sent.headers.contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_generate_stream_validation() {
        let (client, mock) = client();
        let (handler, _rx) = ChannelHandler::channel();

        let err = client
            .generate_stream(&GenerateRequest::new("", "hi"), handler, &AbortController::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), GENERATE_REQUIRED);
        assert!(mock.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_chat_stream_requires_messages() {
        let (client, mock) = client();
        let (handler, _rx) = ChannelHandler::channel();

        let err = client
            .chat_stream(
                &ChatRequest::new("llama3.2", Vec::new()),
                handler,
                &AbortController::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert!(mock.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_chat_completions_uses_sse() {
        let (client, mock) = client();
        mock.set_response(
            "http://ollama.test/v1/chat/completions",
            MockResponse::chunks([
                "data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n\n",
                "data: [DONE]\n",
            ]),
        );

        let (handler, rx) = ChannelHandler::channel();
        let request = ChatCompletionRequest::new("llama3.2", vec![ChatMessage::user("hi")]);
        client
            .chat_completions_stream(&request, handler, &AbortController::new())
            .await
            .unwrap();

        let events = drain(rx);
        assert_eq!(events.last(), Some(&StreamEvent::Finished("A".to_string())));
    }

    #[tokio::test]
    async fn test_stream_server_error_is_returned() {
        let (client, mock) = client();
        mock.set_response(
            "http://ollama.test/api/chat",
            MockResponse::Error(HttpError::ServerError {
                status: 404,
                message: "model \"nope\" not found, try pulling it first".to_string(),
            }),
        );
        let (handler, rx) = ChannelHandler::channel();

        let err = client
            .chat_stream(
                &ChatRequest::new("nope", vec![ChatMessage::user("hi")]),
                handler,
                &AbortController::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(drain(rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_times_out_waiting_for_response() {
        let mock = MockHttpClient::new();
        mock.set_default_response(MockResponse::Hang);
        let config = ClientConfig::default()
            .with_base_url(BASE)
            .with_request_timeout(Duration::from_secs(5));
        let client = OllamaClient::with_http_client(mock.clone(), config);
        let (handler, _rx) = ChannelHandler::channel();
        let abort = AbortController::new();

        let err = client
            .generate_stream(&GenerateRequest::new("m", "p"), handler, &abort)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Aborted(AbortReason::Timeout)));
        assert!(!abort.is_aborted());

        // The same controller still drives the next request.
        mock.set_response(
            "http://ollama.test/api/generate",
            MockResponse::chunks(["{\"response\":\"ok\",\"done\":true}\n"]),
        );
        let (handler, rx) = ChannelHandler::channel();
        client
            .generate_stream(&GenerateRequest::new("m", "p"), handler, &abort)
            .await
            .unwrap();
        assert!(matches!(drain(rx).last(), Some(StreamEvent::Finished(content)) if content == "ok"));
    }

    #[tokio::test]
    async fn test_user_abort_mid_stream_reaches_handler() {
        let (client, mock) = client();
        mock.set_response(
            "http://ollama.test/api/generate",
            MockResponse::StreamThenStall(vec!["{\"response\":\"Hi\"}\n".into()]),
        );
        let abort = AbortController::new();
        let (handler, mut rx) = ChannelHandler::channel();

        let trigger = abort.clone();
        tokio::spawn(async move {
            // first delta arrived; cancel while the stream is stalled
            if let Some(StreamEvent::Delta(_)) = rx.recv().await {
                trigger.abort(AbortReason::User);
            }
            rx.recv().await
        });

        let request = GenerateRequest::new("llama3.2", "hi");
        let handler = client.generate_stream(&request, handler, &abort).await;
        assert!(handler.is_ok());
        assert_eq!(abort.reason(), Some(AbortReason::User));
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream() {
        let (client, mock) = client();
        mock.set_response(
            "http://ollama.test/api/generate",
            MockResponse::StreamThenError(
                vec!["{\"response\":\"par\"}\n".into()],
                HttpError::Io("connection reset".to_string()),
            ),
        );

        let (handler, rx) = ChannelHandler::channel();
        client
            .generate_stream(&GenerateRequest::new("m", "p"), handler, &AbortController::new())
            .await
            .unwrap();

        let events = drain(rx);
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error(StreamError::Transport { .. }))
        ));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Finished(_))));
    }

    #[tokio::test]
    async fn test_tokenize_and_detokenize() {
        let (client, mock) = client();
        mock.set_response(
            "http://ollama.test/api/tokenize",
            MockResponse::json(json!({"tokens": [1, 2, 3]})),
        );
        mock.set_response(
            "http://ollama.test/api/detokenize",
            MockResponse::json(json!({"text": "hello"})),
        );

        assert_eq!(client.tokenize("m", "hello").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(client.detokenize("m", &[1, 2, 3]).await.unwrap(), "hello");

        let err = client.tokenize("m", "").await.unwrap_err();
        assert_eq!(err.to_string(), TOKENIZE_REQUIRED);
    }

    #[tokio::test]
    async fn test_model_management_bodies() {
        let (client, mock) = client();
        mock.set_default_response(MockResponse::json(json!({})));

        client.pull_model("llama3.2").await.unwrap();
        client.delete_model("llama3.2").await.unwrap();
        client.stop_model("llama3.2").await.unwrap();

        let requests = mock.get_requests();
        assert_eq!(requests[0].url, "http://ollama.test/api/pull");
        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(requests[1].json().unwrap(), json!({"name": "llama3.2"}));
        assert_eq!(
            requests[2].json().unwrap(),
            json!({"model": "llama3.2", "stream": false, "keep_alive": 0})
        );
    }

    #[tokio::test]
    async fn test_model_name_required() {
        let (client, _mock) = client();
        for err in [
            client.pull_model(" ").await.unwrap_err(),
            client.delete_model("").await.unwrap_err(),
            client.stop_model("").await.unwrap_err(),
        ] {
            assert_eq!(err.to_string(), MODEL_NAME_REQUIRED);
        }
    }

    #[tokio::test]
    async fn test_decode_error_names_endpoint() {
        let (client, mock) = client();
        mock.set_response(
            "http://ollama.test/api/tags",
            MockResponse::Success(Response::new(200, "<html>")),
        );

        let err = client.list_models().await.unwrap_err();
        assert!(matches!(err, ClientError::Decode { ref endpoint, .. } if endpoint == "/api/tags"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let (client, mock) = client();
        assert!(!client.health_check().await);

        mock.set_response(
            "http://ollama.test/",
            MockResponse::Success(Response::new(200, "Ollama is running")),
        );
        assert!(client.health_check().await);
    }
}
