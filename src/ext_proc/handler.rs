//! Per-stream protocol state machine.
//!
//! # States
//! ```text
//! Open ──recv event──▶ dispatch by phase ──send instruction──▶ Open
//!  │
//!  ├─ clean end of stream ─────────────▶ Closed (Ok)
//!  ├─ receive error ───────────────────▶ Closed (Err, status returned to proxy)
//!  └─ send error ──────────────────────▶ Closed (Err)
//! ```
//!
//! Exactly one instruction is sent per event, and the next event is not read
//! until that instruction has been handed to the transport. Nothing is carried
//! between iterations except the stream itself.

use std::sync::Arc;
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tonic::Status;

use crate::classify::Classifier;
use crate::ext_proc::event::{HeaderMutation, ProcessingEvent, ProcessingInstruction};
use crate::ext_proc::proto::{ProcessingRequest, ProcessingResponse};
use crate::ext_proc::tracker::StreamId;
use crate::observability::metrics;

/// Sending half of a stream's response channel.
pub type ResponseSender = mpsc::Sender<Result<ProcessingResponse, Status>>;

/// Why a stream ended abnormally.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The proxy side failed mid-stream.
    #[error("error receiving request: {0}")]
    Receive(Status),

    /// The response could not be delivered; the proxy has gone away.
    #[error("error sending response: response channel closed")]
    Send,
}

impl StreamError {
    /// Status reported to the proxy as the stream's final item.
    pub fn into_status(self) -> Status {
        Status::unknown(self.to_string())
    }
}

/// Drives `Process` streams for one classifier.
#[derive(Debug)]
pub struct StreamHandler<C> {
    classifier: Arc<C>,
}

impl<C> Clone for StreamHandler<C> {
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<C: Classifier> StreamHandler<C> {
    pub fn new(classifier: C) -> Self {
        Self::with_shared(Arc::new(classifier))
    }

    pub fn with_shared(classifier: Arc<C>) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Decide the instruction for one event.
    ///
    /// Empty bodies skip classification entirely. A classification failure
    /// still continues the request, just without headers.
    pub fn instruction_for(&self, event: ProcessingEvent) -> ProcessingInstruction {
        match event {
            ProcessingEvent::RequestHeaders => ProcessingInstruction::Headers,
            ProcessingEvent::RequestBody(body) if body.is_empty() => {
                tracing::debug!("Empty body, continuing");
                ProcessingInstruction::Body(None)
            }
            ProcessingEvent::RequestBody(body) => match self.classifier.classify(&body) {
                Ok(classification) => {
                    tracing::info!(
                        length = classification.length,
                        size_class = %classification.size_class,
                        "Body classified"
                    );
                    metrics::record_classification(classification.size_class);
                    ProcessingInstruction::Body(Some(HeaderMutation::for_classification(&classification)))
                }
                Err(e) => {
                    tracing::warn!(error = %e, length = body.len(), "Classification failed, continuing unmodified");
                    metrics::record_classification_failure();
                    ProcessingInstruction::Body(None)
                }
            },
            other @ (ProcessingEvent::RequestTrailers | ProcessingEvent::Other(_)) => {
                ProcessingInstruction::Passthrough(other.phase())
            }
        }
    }

    /// Run the receive/dispatch/send loop until the stream ends.
    ///
    /// Returns `Ok(())` when the proxy closes its side cleanly.
    pub async fn run<S>(&self, stream_id: StreamId, mut inbound: S, outbound: ResponseSender) -> Result<(), StreamError>
    where
        S: Stream<Item = Result<ProcessingRequest, Status>> + Unpin,
    {
        tracing::info!(stream_id = %stream_id, "Stream opened");

        loop {
            let request = match inbound.next().await {
                None => {
                    tracing::info!(stream_id = %stream_id, "Stream closed by proxy");
                    return Ok(());
                }
                Some(Err(status)) => {
                    tracing::error!(stream_id = %stream_id, error = %status, "Error receiving request");
                    return Err(StreamError::Receive(status));
                }
                Some(Ok(request)) => request,
            };

            let start = Instant::now();
            let event = ProcessingEvent::from(request);
            let phase = event.phase();
            tracing::debug!(stream_id = %stream_id, phase = %phase, "Event received");

            let response = ProcessingResponse::from(self.instruction_for(event));
            metrics::record_event(phase, start);

            if outbound.send(Ok(response)).await.is_err() {
                tracing::error!(stream_id = %stream_id, phase = %phase, "Error sending response");
                return Err(StreamError::Send);
            }
            tracing::debug!(stream_id = %stream_id, phase = %phase, "Response sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::stream;

    use crate::classify::{Classification, ClassifyError, SizeClassifier};
    use crate::config::ClassificationConfig;
    use crate::ext_proc::event::Phase;
    use crate::ext_proc::proto::{processing_request::Request, processing_response::Response, HttpBody, HttpHeaders};

    /// Counts calls and optionally fails every classification.
    #[derive(Default)]
    struct CountingClassifier {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Classifier for CountingClassifier {
        fn classify(&self, body: &[u8]) -> Result<Classification, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClassifyError::LengthOverflow(body.len()));
            }
            crate::classify::classify(body, &ClassificationConfig::default())
        }
    }

    fn default_handler() -> StreamHandler<SizeClassifier> {
        StreamHandler::new(SizeClassifier::new(Arc::new(ClassificationConfig::default())))
    }

    fn body_request(len: usize) -> ProcessingRequest {
        ProcessingRequest {
            observability_mode: false,
            request: Some(Request::RequestBody(HttpBody {
                body: vec![b'x'; len],
                end_of_stream: true,
            })),
        }
    }

    fn headers_request() -> ProcessingRequest {
        ProcessingRequest {
            observability_mode: false,
            request: Some(Request::RequestHeaders(HttpHeaders::default())),
        }
    }

    #[test]
    fn headers_continue_without_mutation() {
        let instruction = default_handler().instruction_for(ProcessingEvent::RequestHeaders);
        assert_eq!(instruction, ProcessingInstruction::Headers);
        assert!(instruction.mutation().is_none());
    }

    #[test]
    fn classified_body_sets_both_headers() {
        let handler = default_handler();
        for (len, class) in [(500, "small"), (1024, "medium"), (2048, "large")] {
            let instruction = handler.instruction_for(ProcessingEvent::RequestBody(vec![0; len]));
            let mutation = instruction.mutation().expect("mutation");
            assert_eq!(mutation.get("x-prompt-length"), Some(len.to_string().as_str()));
            assert_eq!(mutation.get("x-prompt-size-class"), Some(class));
            assert_eq!(mutation.headers().len(), 2);
        }
    }

    #[test]
    fn empty_body_skips_classifier() {
        let handler = StreamHandler::new(CountingClassifier::default());
        let instruction = handler.instruction_for(ProcessingEvent::RequestBody(Vec::new()));

        assert_eq!(instruction, ProcessingInstruction::Body(None));
        assert_eq!(handler.classifier().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn classification_failure_fails_open() {
        let handler = StreamHandler::new(CountingClassifier {
            fail: true,
            ..Default::default()
        });
        let instruction = handler.instruction_for(ProcessingEvent::RequestBody(vec![1, 2, 3]));

        assert_eq!(instruction, ProcessingInstruction::Body(None));
        assert_eq!(handler.classifier().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn other_phases_pass_through() {
        let handler = default_handler();
        assert_eq!(
            handler.instruction_for(ProcessingEvent::RequestTrailers),
            ProcessingInstruction::Passthrough(Phase::RequestTrailers)
        );
        for phase in [Phase::ResponseHeaders, Phase::ResponseBody, Phase::ResponseTrailers, Phase::Unrecognized] {
            assert_eq!(
                handler.instruction_for(ProcessingEvent::Other(phase)),
                ProcessingInstruction::Passthrough(phase)
            );
        }
    }

    #[tokio::test]
    async fn one_response_per_event_then_clean_close() {
        let handler = default_handler();
        let inbound = stream::iter(vec![Ok(headers_request()), Ok(body_request(500))]);
        let (tx, mut rx) = mpsc::channel(4);

        let result = handler.run(StreamId::new(), inbound, tx).await;
        assert!(result.is_ok());

        let first = rx.recv().await.unwrap().unwrap();
        assert!(matches!(first.response, Some(Response::RequestHeaders(_))));

        let second = rx.recv().await.unwrap().unwrap();
        let Some(Response::RequestBody(body)) = second.response else {
            panic!("expected request_body response");
        };
        let set = body.response.unwrap().header_mutation.unwrap().set_headers;
        assert_eq!(set[0].header.as_ref().unwrap().value, "500");
        assert_eq!(set[1].header.as_ref().unwrap().value, "small");

        // Sender dropped by run(): nothing else was queued.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn receive_error_terminates_with_status() {
        let handler = default_handler();
        let inbound = stream::iter(vec![
            Ok(headers_request()),
            Err(Status::internal("connection reset")),
            Ok(body_request(10)),
        ]);
        let (tx, mut rx) = mpsc::channel(4);

        let err = handler.run(StreamId::new(), inbound, tx).await.unwrap_err();
        assert!(matches!(err, StreamError::Receive(_)));

        let status = err.into_status();
        assert_eq!(status.code(), tonic::Code::Unknown);
        assert!(status.message().starts_with("error receiving request"));

        // Only the headers response made it out; the body after the error was never read.
        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_error_terminates() {
        let handler = default_handler();
        let inbound = stream::iter(vec![Ok(headers_request())]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = handler.run(StreamId::new(), inbound, tx).await.unwrap_err();
        assert!(matches!(err, StreamError::Send));
        assert!(err.into_status().message().starts_with("error sending response"));
    }

    #[tokio::test]
    async fn empty_stream_closes_cleanly() {
        let handler = default_handler();
        let (tx, mut rx) = mpsc::channel(1);
        let inbound = stream::iter(Vec::<Result<ProcessingRequest, Status>>::new());

        assert!(handler.run(StreamId::new(), inbound, tx).await.is_ok());
        assert!(rx.recv().await.is_none());
    }
}
