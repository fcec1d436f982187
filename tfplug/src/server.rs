//! Provider process entry point
//!
//! Performs the go-plugin handshake Terraform expects: verify the magic
//! cookie, listen on a local port with TLS, then print the handshake line on
//! stdout. When Terraform supplies its client certificate (AutoMTLS), the
//! server requires it and appends its own certificate to the handshake.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};

pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const CORE_PROTOCOL_VERSION: u32 = 1;
const APP_PROTOCOL_VERSION: u32 = 6;

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PEM certificate presented to Terraform
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    /// Applies to both directions
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    /// Certificate paths can be overridden with TFPLUG_CERT_PATH and
    /// TFPLUG_KEY_PATH
    fn default() -> Self {
        let cert_path = std::env::var("TFPLUG_CERT_PATH")
            .unwrap_or_else(|_| "./certs/localhost.pem".to_string());
        let key_path = std::env::var("TFPLUG_KEY_PATH")
            .unwrap_or_else(|_| "./certs/localhost-key.pem".to_string());

        Self {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
            max_message_size: 256 << 20, // 256MB
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    verify_magic_cookie(std::env::var(MAGIC_COOKIE_KEY).ok().as_deref())?;

    // Already installed when the host process set one up
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let grpc_server = GrpcProviderServer::new(provider);
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let cert = tokio::fs::read(&config.cert_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
    let key = tokio::fs::read(&config.key_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

    let mut tls_config = ServerTlsConfig::new().identity(Identity::from_pem(&cert, &key));

    let client_cert = std::env::var("PLUGIN_CLIENT_CERT")
        .ok()
        .filter(|pem| !pem.trim().is_empty());
    let server_cert = match &client_cert {
        Some(client_pem) => {
            tls_config = tls_config.client_ca_root(Certificate::from_pem(client_pem));
            Some(pem_to_raw_base64(&cert).ok_or_else(|| {
                TfplugError::TlsError("server certificate is not PEM encoded".to_string())
            })?)
        }
        None => None,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tracing::debug!(%addr, mtls = client_cert.is_some(), "provider listening");

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", handshake_line(addr, server_cert.as_deref()))?;
    stdout.flush()?;

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    Server::builder()
        .tls_config(tls_config)?
        .add_service(provider_service)
        .serve_with_incoming(incoming)
        .await?;

    Ok(())
}

fn verify_magic_cookie(value: Option<&str>) -> Result<()> {
    if value == Some(MAGIC_COOKIE_VALUE) {
        return Ok(());
    }
    Err(TfplugError::HandshakeError(
        "This binary is a plugin. These are not meant to be executed directly. \
         Please execute the program that consumes these plugins, which will \
         load any plugins automatically"
            .to_string(),
    ))
}

fn handshake_line(addr: SocketAddr, server_cert: Option<&str>) -> String {
    let mut line = format!(
        "{}|{}|tcp|{}|grpc",
        CORE_PROTOCOL_VERSION, APP_PROTOCOL_VERSION, addr
    );
    if let Some(cert) = server_cert {
        line.push('|');
        line.push_str(cert);
    }
    line
}

/// The certificate's DER bytes in unpadded standard base64, which is the
/// PEM body without line breaks and padding
fn pem_to_raw_base64(pem: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(pem).ok()?;
    let mut lines = text.lines().map(str::trim);
    lines.find(|line| *line == "-----BEGIN CERTIFICATE-----")?;

    let mut body = String::new();
    for line in lines {
        if line == "-----END CERTIFICATE-----" {
            return Some(body.trim_end_matches('=').to_string());
        }
        body.push_str(line);
    }
    None
}
