//! Generates the ExternalProcessor gRPC server and client.
//!
//! The message types are declared by hand in `src/ext_proc/proto.rs`, so the
//! service is described with the manual builder and no protoc is needed.

fn main() {
    let process = tonic_build::manual::Method::builder()
        .name("process")
        .route_name("Process")
        .input_type("crate::ext_proc::proto::ProcessingRequest")
        .output_type("crate::ext_proc::proto::ProcessingResponse")
        .codec_path("tonic::codec::ProstCodec")
        .client_streaming()
        .server_streaming()
        .build();

    let service = tonic_build::manual::Service::builder()
        .name("ExternalProcessor")
        .package("envoy.service.ext_proc.v3")
        .method(process)
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);

    println!("cargo:rerun-if-changed=build.rs");
}
