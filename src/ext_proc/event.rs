//! Phase-tagged events and the instructions that answer them.
//!
//! `ProcessingEvent` and `ProcessingInstruction` are the handler's view of the
//! stream; the `From` impls below are the only place the wire oneofs are
//! inspected or built.

use std::fmt;

use crate::classify::{Classification, PROMPT_LENGTH_HEADER, PROMPT_SIZE_CLASS_HEADER};
use crate::ext_proc::proto::{
    self, common_response::ResponseStatus, header_value_option::HeaderAppendAction,
    processing_request, processing_response,
};

/// Stage of the HTTP exchange an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    RequestHeaders,
    RequestBody,
    RequestTrailers,
    ResponseHeaders,
    ResponseBody,
    ResponseTrailers,
    /// The request carried no phase this processor knows.
    Unrecognized,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::RequestHeaders => "request_headers",
            Phase::RequestBody => "request_body",
            Phase::RequestTrailers => "request_trailers",
            Phase::ResponseHeaders => "response_headers",
            Phase::ResponseBody => "response_body",
            Phase::ResponseTrailers => "response_trailers",
            Phase::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event received from the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingEvent {
    RequestHeaders,
    RequestBody(Vec<u8>),
    RequestTrailers,
    /// Response-side or unknown phase; answered with a passthrough.
    Other(Phase),
}

impl ProcessingEvent {
    pub fn phase(&self) -> Phase {
        match self {
            ProcessingEvent::RequestHeaders => Phase::RequestHeaders,
            ProcessingEvent::RequestBody(_) => Phase::RequestBody,
            ProcessingEvent::RequestTrailers => Phase::RequestTrailers,
            ProcessingEvent::Other(phase) => *phase,
        }
    }
}

impl From<proto::ProcessingRequest> for ProcessingEvent {
    fn from(request: proto::ProcessingRequest) -> Self {
        use processing_request::Request;

        match request.request {
            Some(Request::RequestHeaders(_)) => ProcessingEvent::RequestHeaders,
            Some(Request::RequestBody(body)) => ProcessingEvent::RequestBody(body.body),
            Some(Request::RequestTrailers(_)) => ProcessingEvent::RequestTrailers,
            Some(Request::ResponseHeaders(_)) => ProcessingEvent::Other(Phase::ResponseHeaders),
            Some(Request::ResponseBody(_)) => ProcessingEvent::Other(Phase::ResponseBody),
            Some(Request::ResponseTrailers(_)) => ProcessingEvent::Other(Phase::ResponseTrailers),
            None => ProcessingEvent::Other(Phase::Unrecognized),
        }
    }
}

/// Ordered header additions applied by the proxy before forwarding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMutation {
    headers: Vec<(String, String)>,
}

impl HeaderMutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header; order is preserved on the wire.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// The `x-prompt-length` / `x-prompt-size-class` pair for a classified body.
    pub fn for_classification(classification: &Classification) -> Self {
        Self::new()
            .set(PROMPT_LENGTH_HEADER, classification.length.to_string())
            .set(PROMPT_SIZE_CLASS_HEADER, classification.size_class.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Value of the first header with this key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Status attached to every instruction. Nothing but CONTINUE is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionStatus {
    Continue,
}

/// One instruction sent back to the proxy, shaped by the phase it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingInstruction {
    /// Answer to request headers.
    Headers,
    /// Answer to a request body, optionally adding headers.
    Body(Option<HeaderMutation>),
    /// Continue-only answer for any other phase.
    Passthrough(Phase),
}

impl ProcessingInstruction {
    pub fn status(&self) -> InstructionStatus {
        InstructionStatus::Continue
    }

    pub fn mutation(&self) -> Option<&HeaderMutation> {
        match self {
            ProcessingInstruction::Body(mutation) => mutation.as_ref(),
            _ => None,
        }
    }
}

impl From<InstructionStatus> for ResponseStatus {
    fn from(status: InstructionStatus) -> Self {
        match status {
            InstructionStatus::Continue => ResponseStatus::Continue,
        }
    }
}

impl From<HeaderMutation> for proto::HeaderMutation {
    fn from(mutation: HeaderMutation) -> Self {
        let set_headers = mutation
            .headers
            .into_iter()
            .map(|(key, value)| proto::HeaderValueOption {
                header: Some(proto::HeaderValue {
                    key,
                    value,
                    raw_value: Vec::new(),
                }),
                append_action: HeaderAppendAction::OverwriteIfExistsOrAdd as i32,
                keep_empty_value: false,
            })
            .collect();

        proto::HeaderMutation {
            set_headers,
            remove_headers: Vec::new(),
        }
    }
}

fn common(status: InstructionStatus, mutation: Option<HeaderMutation>) -> proto::CommonResponse {
    proto::CommonResponse {
        status: ResponseStatus::from(status) as i32,
        header_mutation: mutation.map(Into::into),
        ..Default::default()
    }
}

fn headers_response(status: InstructionStatus) -> proto::HeadersResponse {
    proto::HeadersResponse {
        response: Some(common(status, None)),
    }
}

fn body_response(status: InstructionStatus, mutation: Option<HeaderMutation>) -> proto::BodyResponse {
    proto::BodyResponse {
        response: Some(common(status, mutation)),
    }
}

impl From<ProcessingInstruction> for proto::ProcessingResponse {
    fn from(instruction: ProcessingInstruction) -> Self {
        use processing_response::Response;

        let status = instruction.status();
        let response = match instruction {
            ProcessingInstruction::Headers => Response::RequestHeaders(headers_response(status)),
            ProcessingInstruction::Body(mutation) => Response::RequestBody(body_response(status, mutation)),
            ProcessingInstruction::Passthrough(phase) => match phase {
                Phase::ResponseHeaders => Response::ResponseHeaders(headers_response(status)),
                Phase::ResponseBody => Response::ResponseBody(body_response(status, None)),
                Phase::RequestBody => Response::RequestBody(body_response(status, None)),
                Phase::RequestTrailers => Response::RequestTrailers(proto::TrailersResponse::default()),
                Phase::ResponseTrailers => Response::ResponseTrailers(proto::TrailersResponse::default()),
                Phase::RequestHeaders | Phase::Unrecognized => {
                    Response::RequestHeaders(headers_response(status))
                }
            },
        };

        proto::ProcessingResponse {
            response: Some(response),
        }
    }
}
