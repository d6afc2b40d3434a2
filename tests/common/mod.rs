//! Shared utilities for integration tests.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::Streaming;

use prompt_length_processor::config::{ClassificationConfig, ProcessorConfig};
use prompt_length_processor::ext_proc::proto::external_processor_client::ExternalProcessorClient;
use prompt_length_processor::ext_proc::proto::{
    processing_request::Request, processing_response::Response, HttpBody, HttpHeaders, HttpTrailers,
    ProcessingRequest, ProcessingResponse,
};
use prompt_length_processor::ext_proc::ServerError;
use prompt_length_processor::lifecycle::Shutdown;
use prompt_length_processor::net::Listener;
use prompt_length_processor::ProcessorServer;

/// A processor running on an ephemeral local port.
pub struct TestProcessor {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestProcessor {
    pub async fn client(&self) -> ExternalProcessorClient<Channel> {
        ExternalProcessorClient::connect(format!("http://{}", self.addr))
            .await
            .expect("processor unreachable")
    }
}

/// Start a processor with the given thresholds.
pub async fn start_processor(thresholds: ClassificationConfig) -> TestProcessor {
    let mut config = ProcessorConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.classification = thresholds;

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = Listener::from_tcp(tcp).unwrap();
    let addr = listener.local_addr();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = ProcessorServer::new(&config);
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestProcessor { addr, shutdown, handle }
}

/// Start a processor with the default 1024/2048/2048 thresholds.
pub async fn start_default_processor() -> TestProcessor {
    start_processor(ClassificationConfig::default()).await
}

/// An open Process stream driven one event at a time.
pub struct Exchange {
    tx: Option<mpsc::Sender<ProcessingRequest>>,
    responses: Streaming<ProcessingResponse>,
}

impl Exchange {
    pub async fn open(client: &mut ExternalProcessorClient<Channel>) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let responses = client
            .process(ReceiverStream::new(rx))
            .await
            .expect("Process call rejected")
            .into_inner();
        Self { tx: Some(tx), responses }
    }

    /// Send one event and wait for its instruction.
    pub async fn send(&mut self, request: ProcessingRequest) -> ProcessingResponse {
        self.tx
            .as_ref()
            .expect("exchange already closed")
            .send(request)
            .await
            .expect("request stream closed");
        self.responses
            .message()
            .await
            .expect("stream error")
            .expect("stream ended before a response arrived")
    }

    /// Half-close and return whatever the processor sends after that.
    pub async fn close(mut self) -> Result<Option<ProcessingResponse>, tonic::Status> {
        self.tx.take();
        self.responses.message().await
    }
}

pub fn request(inner: Request) -> ProcessingRequest {
    ProcessingRequest {
        observability_mode: false,
        request: Some(inner),
    }
}

pub fn request_headers() -> ProcessingRequest {
    request(Request::RequestHeaders(HttpHeaders::default()))
}

pub fn request_body(body: Vec<u8>) -> ProcessingRequest {
    request(Request::RequestBody(HttpBody {
        body,
        end_of_stream: true,
    }))
}

pub fn request_trailers() -> ProcessingRequest {
    request(Request::RequestTrailers(HttpTrailers::default()))
}

/// Name of the response oneof slot.
pub fn slot(response: &ProcessingResponse) -> &'static str {
    match response.response {
        Some(Response::RequestHeaders(_)) => "request_headers",
        Some(Response::ResponseHeaders(_)) => "response_headers",
        Some(Response::RequestBody(_)) => "request_body",
        Some(Response::ResponseBody(_)) => "response_body",
        Some(Response::RequestTrailers(_)) => "request_trailers",
        Some(Response::ResponseTrailers(_)) => "response_trailers",
        Some(Response::ImmediateResponse(_)) => "immediate_response",
        None => "none",
    }
}

/// Headers set by a request_body response, in order.
pub fn body_headers(response: &ProcessingResponse) -> Vec<(String, String)> {
    let Some(Response::RequestBody(body)) = &response.response else {
        panic!("expected request_body response, got {}", slot(response));
    };
    body.response
        .as_ref()
        .and_then(|c| c.header_mutation.as_ref())
        .map(|m| {
            m.set_headers
                .iter()
                .filter_map(|o| o.header.as_ref())
                .map(|h| (h.key.clone(), h.value.clone()))
                .collect()
        })
        .unwrap_or_default()
}
