use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Streaming;

use prompt_length_processor::ext_proc::proto::external_processor_client::ExternalProcessorClient;
use prompt_length_processor::ext_proc::proto::{
    processing_request::Request, processing_response::Response, CommonResponse, HeaderMap, HeaderValue,
    HttpBody, HttpHeaders, ProcessingRequest, ProcessingResponse,
};

#[derive(Parser)]
#[command(name = "extproc-probe")]
#[command(about = "Send one request through a running prompt length processor", long_about = None)]
struct Cli {
    /// Processor endpoint
    #[arg(short, long, default_value = "http://127.0.0.1:50051")]
    address: String,

    /// Request body to send
    #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
    body: Option<String>,

    /// Read the request body from a file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Value for the :path pseudo-header
    #[arg(long, default_value = "/v1/completions")]
    path: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let body = match (&cli.body, &cli.file) {
        (Some(text), _) => text.clone().into_bytes(),
        (None, Some(path)) => std::fs::read(path)?,
        (None, None) => Vec::new(),
    };

    let mut client = ExternalProcessorClient::connect(cli.address.clone()).await?;
    let (tx, rx) = mpsc::channel(1);
    let mut responses = client.process(ReceiverStream::new(rx)).await?.into_inner();

    let headers = HttpHeaders {
        headers: Some(HeaderMap {
            headers: vec![
                header(":method", "POST"),
                header(":path", &cli.path),
                header("content-type", "application/json"),
            ],
        }),
        end_of_stream: body.is_empty(),
    };
    tx.send(request(Request::RequestHeaders(headers))).await?;
    print_response(next(&mut responses).await?);

    if !body.is_empty() {
        let len = body.len();
        tx.send(request(Request::RequestBody(HttpBody {
            body,
            end_of_stream: true,
        })))
        .await?;
        println!("sent body: {} bytes", len);
        print_response(next(&mut responses).await?);
    }

    drop(tx);
    while let Some(extra) = responses.message().await? {
        eprintln!("Unexpected extra response: {:?}", extra);
    }

    Ok(())
}

fn header(key: &str, value: &str) -> HeaderValue {
    HeaderValue {
        key: key.to_string(),
        value: value.to_string(),
        raw_value: Vec::new(),
    }
}

fn request(inner: Request) -> ProcessingRequest {
    ProcessingRequest {
        observability_mode: false,
        request: Some(inner),
    }
}

async fn next(responses: &mut Streaming<ProcessingResponse>) -> Result<ProcessingResponse, Box<dyn std::error::Error>> {
    responses
        .message()
        .await?
        .ok_or_else(|| "processor closed the stream early".into())
}

fn print_response(response: ProcessingResponse) {
    let (phase, common): (&str, Option<CommonResponse>) = match response.response {
        Some(Response::RequestHeaders(r)) => ("request_headers", r.response),
        Some(Response::RequestBody(r)) => ("request_body", r.response),
        Some(Response::ResponseHeaders(r)) => ("response_headers", r.response),
        Some(Response::ResponseBody(r)) => ("response_body", r.response),
        Some(other) => {
            println!("{:?}", other);
            return;
        }
        None => {
            println!("empty response");
            return;
        }
    };

    let status = common.as_ref().map(|c| c.status()).unwrap_or_default();
    println!("{}: {:?}", phase, status);

    let set_headers = common
        .and_then(|c| c.header_mutation)
        .map(|m| m.set_headers)
        .unwrap_or_default();
    for option in set_headers {
        if let Some(h) = option.header {
            println!("  {}: {}", h.key, h.value);
        }
    }
}
