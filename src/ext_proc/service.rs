//! `ExternalProcessor` gRPC service.
//!
//! Each `Process` call gets its own task running a `StreamHandler`. Responses
//! flow back through a bounded channel, so a proxy that stops reading
//! back-pressures the loop instead of letting responses pile up.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::Instrument;

use crate::classify::Classifier;
use crate::ext_proc::handler::StreamHandler;
use crate::ext_proc::proto::external_processor_server::ExternalProcessor;
use crate::ext_proc::proto::{ProcessingRequest, ProcessingResponse};
use crate::ext_proc::tracker::StreamTracker;
use crate::observability::metrics;

/// Responses buffered ahead of the transport. One keeps the loop in lockstep
/// with what the proxy has actually consumed.
const RESPONSE_BUFFER: usize = 1;

/// Service state shared by every stream.
pub struct ExtProcService<C> {
    handler: StreamHandler<C>,
    tracker: StreamTracker,
}

impl<C: Classifier> ExtProcService<C> {
    pub fn new(handler: StreamHandler<C>) -> Self {
        Self {
            handler,
            tracker: StreamTracker::new(),
        }
    }

    /// Tracker for the streams this service has open.
    pub fn tracker(&self) -> &StreamTracker {
        &self.tracker
    }
}

#[tonic::async_trait]
impl<C: Classifier> ExternalProcessor for ExtProcService<C> {
    type ProcessStream = ReceiverStream<Result<ProcessingResponse, Status>>;

    async fn process(
        &self,
        request: Request<Streaming<ProcessingRequest>>,
    ) -> Result<Response<Self::ProcessStream>, Status> {
        let remote_addr = request.remote_addr();
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(RESPONSE_BUFFER);

        let guard = self.tracker.track();
        let stream_id = guard.id();
        let handler = self.handler.clone();
        let span = tracing::info_span!("ext_proc_stream", stream_id = %stream_id, peer = ?remote_addr);

        tokio::spawn(
            async move {
                let _guard = guard;
                match handler.run(stream_id, inbound, tx.clone()).await {
                    Ok(()) => metrics::record_stream_outcome("closed"),
                    Err(e) => {
                        metrics::record_stream_outcome("failed");
                        // Fails silently when the proxy is already gone.
                        let _ = tx.send(Err(e.into_status())).await;
                    }
                }
            }
            .instrument(span),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
