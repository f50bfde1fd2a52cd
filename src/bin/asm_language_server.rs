//! Standalone entry point for the assembly language server.
//!
//! Launch with `cargo run --features language-server --bin asm_language_server` or point your
//! editor's LSP client to the compiled binary.

#[cfg(not(feature = "language-server"))]
pub fn main() {
    eprintln!(
        "The 'asm_language_server' binary requires the 'language-server' feature. \
Enable it with `cargo run --features language-server --bin asm_language_server`."
    );
    std::process::exit(1);
}

#[cfg(feature = "language-server")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use asmdex::server::run_stdio_language_server;
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    run_stdio_language_server().await?;
    Ok(())
}
