//! Build script for sentinel-gateway.
//!
//! Compiles the engine's protobuf definitions into Rust code.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        // The gateway only calls the engine; the server half backs the
        // in-process engine used by the binding's tests.
        .build_client(true)
        .build_server(true)
        .compile_protos(&["proto/sentinel.proto"], &["proto/"])?;

    println!("cargo:rerun-if-changed=proto/");

    Ok(())
}
