//! Port-43 WHOIS client.
//!
//! Queries start at the configured server (IANA by default). When that server
//! answers with a `refer:` line the query is repeated once against the
//! referred registry, whose answer is returned instead.

use std::time::Duration;

use anyhow::{Context, ensure};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use vtrace_common::config::{DEFAULT_LOOKUP_TIMEOUT_MS, DEFAULT_WHOIS_SERVER};

use crate::error::InitError;
use crate::provider::{CapabilityProvider, ProviderContext};

use super::DirectoryResolver;

const WHOIS_PORT: u16 = 43;
const MAX_RESPONSE_BYTES: u64 = 1 << 20;

pub struct WhoIs {
    server: String,
    timeout: Duration,
}

impl Default for WhoIs {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoIs {
    pub fn new() -> Self {
        Self {
            server: DEFAULT_WHOIS_SERVER.to_string(),
            timeout: Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    async fn query_server(&self, server: &str, name: &str) -> anyhow::Result<String> {
        let exchange = async {
            let mut stream = TcpStream::connect(server)
                .await
                .with_context(|| format!("connecting to {server}"))?;
            stream.write_all(format!("{name}\r\n").as_bytes()).await?;
            let mut response = Vec::new();
            (&mut stream)
                .take(MAX_RESPONSE_BYTES)
                .read_to_end(&mut response)
                .await?;
            anyhow::Ok(String::from_utf8_lossy(&response).into_owned())
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .with_context(|| format!("whois query to {server} timed out"))?
    }
}

/// Appends the WHOIS port when `server` has none.
fn with_port(server: &str) -> String {
    if server.rsplit_once(':').is_some_and(|(_, port)| port.parse::<u16>().is_ok()) {
        server.to_string()
    } else {
        format!("{server}:{WHOIS_PORT}")
    }
}

/// Extracts the referred server from an IANA style `refer:` or `whois:` line.
pub fn parse_referral(response: &str) -> Option<String> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        ((key == "refer" || key == "whois") && !value.is_empty()).then(|| value.to_string())
    })
}

impl CapabilityProvider for WhoIs {
    fn init(&mut self, ctx: &ProviderContext<'_>) -> Result<(), InitError> {
        let server = ctx.settings().whois_server().trim();
        if server.is_empty() {
            return Err(InitError::InvalidConfig(
                "whois_server must not be empty".to_string(),
            ));
        }
        self.server = with_port(server);
        self.timeout = Duration::from_millis(ctx.settings().lookup_timeout_ms().max(1));
        debug!(server = %self.server, "whois ready");
        Ok(())
    }

    fn dispose(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl DirectoryResolver for WhoIs {
    async fn query(&self, name: &str) -> anyhow::Result<String> {
        let name = name.trim();
        ensure!(!name.is_empty(), "empty whois query");

        let response = self.query_server(&self.server, name).await?;
        let Some(referral) = parse_referral(&response) else {
            return Ok(response);
        };
        let referral = with_port(&referral);
        if referral == self.server {
            return Ok(response);
        }

        debug!(%referral, "following whois referral");
        match self.query_server(&referral, name).await {
            Ok(referred) => Ok(referred),
            Err(e) => {
                warn!(%referral, error = %e, "referral failed, keeping first answer");
                Ok(response)
            }
        }
    }
}
