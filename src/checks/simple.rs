//! Simple network probes
//!
//! Checks the poller performs itself: TCP connect tests and plain HTTP
//! page fetches. They bound their own runtime via the client/connect
//! timeout, so the dispatcher leaves them unwrapped. Simple checks do not
//! participate in host availability - a refused port says nothing about
//! the host as a whole.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{trace, warn};

use crate::item::Item;
use crate::util::parse_item_key;

use super::{CheckOutcome, Checker};

/// Serves `net.tcp.port[...]` and `web.page.*[...]` keys.
pub struct SimpleChecker {
    client: reqwest::Client,
    timeout: Duration,
}

impl SimpleChecker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            timeout,
        }
    }

    /// TCP connect test; "1" when the port accepts, "0" when it does not.
    async fn check_tcp_port(&self, addr: &str, port: &str) -> CheckOutcome {
        let Ok(port) = port.parse::<u16>() else {
            return CheckOutcome::NotSupported(format!("invalid port \"{port}\""));
        };

        let connect = tokio::net::TcpStream::connect((addr.to_string(), port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_stream)) => CheckOutcome::Success("1".into()),
            Ok(Err(e)) => {
                trace!("tcp connect to {addr}:{port} failed: {e}");
                CheckOutcome::Success("0".into())
            }
            Err(_) => CheckOutcome::Success("0".into()),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String, CheckOutcome> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("page fetch from {url} failed: {e}");
            CheckOutcome::NetworkError(format!("cannot fetch \"{url}\": {e}"))
        })?;

        response
            .text()
            .await
            .map_err(|e| CheckOutcome::NetworkError(format!("cannot read \"{url}\": {e}")))
    }
}

#[async_trait]
impl Checker for SimpleChecker {
    async fn check(&self, item: &Item) -> CheckOutcome {
        let Some((name, args)) = parse_item_key(&item.key) else {
            return CheckOutcome::NotSupported(format!("invalid item key \"{}\"", item.key));
        };

        match (name, args.as_slice()) {
            ("net.tcp.port", [port]) => self.check_tcp_port(&item.host.addr, port).await,
            ("net.tcp.port", [addr, port]) => self.check_tcp_port(addr, port).await,

            ("web.page.get", [url]) => match self.fetch_page(url).await {
                Ok(body) => CheckOutcome::Success(body),
                Err(outcome) => outcome,
            },

            ("web.page.regexp", [url, pattern]) => {
                let regex = match regex::Regex::new(pattern) {
                    Ok(regex) => regex,
                    Err(e) => {
                        return CheckOutcome::NotSupported(format!(
                            "invalid regexp \"{pattern}\": {e}"
                        ));
                    }
                };
                match self.fetch_page(url).await {
                    Ok(body) => {
                        let matched = regex
                            .find(&body)
                            .map(|m| m.as_str().to_string())
                            .unwrap_or_default();
                        CheckOutcome::Success(matched)
                    }
                    Err(outcome) => outcome,
                }
            }

            _ => CheckOutcome::NotSupported(format!(
                "simple check \"{}\" is not supported",
                item.key
            )),
        }
    }
}
