use std::env;
use std::path::PathBuf;
use tfplug::ServerConfig;
use tracing_subscriber::EnvFilter;
use vcfa::VcfaProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the plugin handshake
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VCFA_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut config = ServerConfig::default();
    if env::var("TFPLUG_CERT_PATH").is_err() {
        // Development certificates next to the workspace
        let exe = env::current_exe()?;
        let exe_dir = exe.parent().map(PathBuf::from).unwrap_or_default();
        config = config
            .with_cert_path(exe_dir.join("../../certs/localhost+2.pem"))
            .with_key_path(exe_dir.join("../../certs/localhost+2-key.pem"));
    }

    tfplug::serve(VcfaProvider::new(), config).await?;

    Ok(())
}
