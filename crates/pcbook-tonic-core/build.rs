/// Builds the gRPC client and server code for `proto/pcbook.proto` using
/// `tonic-prost-build`.
///
/// # Byte Field Optimization
///
/// `UploadImageRequest.chunk_data` is generated as `bytes::Bytes` rather than
/// `Vec<u8>`, so uploaded chunks can be appended to the assembly buffer without
/// an extra copy out of the decode buffer.
///
/// # Output
///
/// ```rust,ignore
/// pub mod proto {
///     tonic::include_proto!("pcbook");
/// }
/// ```
///
/// A file descriptor set is also written to `OUT_DIR/pcbook_descriptor.bin`
/// for the reflection service.
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("pcbook_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();

    config
        .bytes([".pcbook.UploadImageRequest.chunk_data"])
        .file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/pcbook.proto"], &["proto"])
        .unwrap();
}
