//! Cluster endpoints and reachability probing.
//!
//! Endpoint::parse -> host + port (bare `host`, `host:port`, `[v6]:port`,
//! `alluxio://host:port`).
//! probe_all -> concurrent TCP connect with a per-endpoint timeout.
//! No RPC is spoken; a successful connect is all "reachable" means.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use url::{Host, Url};

pub const SCHEME: &str = "alluxio";

/// A host/port pair of a master or worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Parses a user or config supplied address, applying `default_port`
    /// when none is given.
    pub fn parse(raw: &str, default_port: u16) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("endpoint is empty");
        }

        let url = if trimmed.contains("://") {
            Url::parse(trimmed)
        } else {
            Url::parse(&format!("{SCHEME}://{trimmed}"))
        }
        .with_context(|| format!("cannot parse '{trimmed}' as host[:port]"))?;

        if url.scheme() != SCHEME {
            bail!("unsupported scheme '{}' (expected {SCHEME}://)", url.scheme());
        }
        if !matches!(url.path(), "" | "/") || url.query().is_some() {
            bail!("endpoint must not carry a path or query");
        }
        let host = match url.host() {
            Some(Host::Domain(d)) if !d.is_empty() => d.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => bail!("endpoint has no host"),
        };

        Ok(Endpoint {
            host,
            port: url.port().unwrap_or(default_port),
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Outcome of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reachability {
    Reachable { latency_ms: u64 },
    Unreachable { reason: String },
    NotProbed,
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable { .. })
    }

    /// Short label for tables.
    pub fn label(&self) -> String {
        match self {
            Reachability::Reachable { latency_ms } => format!("reachable ({latency_ms} ms)"),
            Reachability::Unreachable { reason } => format!("unreachable: {reason}"),
            Reachability::NotProbed => "not probed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub endpoint: Endpoint,
    #[serde(flatten)]
    pub reachability: Reachability,
}

impl ProbeReport {
    pub fn skipped(endpoint: &Endpoint) -> Self {
        Self {
            endpoint: endpoint.clone(),
            reachability: Reachability::NotProbed,
        }
    }
}

/// Synchronous wrapper:
///   - builds a temporary current-thread Tokio runtime
///   - connects to every endpoint concurrently
///   - returns reports in input order
pub fn probe_all(endpoints: &[Endpoint], timeout: Duration) -> Result<Vec<ProbeReport>> {
    if endpoints.is_empty() {
        return Ok(Vec::new());
    }
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    rt.block_on(probe_all_async(endpoints, timeout))
}

pub async fn probe_all_async(endpoints: &[Endpoint], timeout: Duration) -> Result<Vec<ProbeReport>> {
    let mut set = tokio::task::JoinSet::new();
    for (idx, ep) in endpoints.iter().cloned().enumerate() {
        set.spawn(async move {
            let reachability = probe_one(&ep, timeout).await;
            (idx, ProbeReport { endpoint: ep, reachability })
        });
    }

    let mut slots: Vec<Option<ProbeReport>> = vec![None; endpoints.len()];
    while let Some(joined) = set.join_next().await {
        let (idx, report) = joined.context("probe task failed")?;
        slots[idx] = Some(report);
    }
    Ok(slots.into_iter().flatten().collect())
}

async fn probe_one(ep: &Endpoint, timeout: Duration) -> Reachability {
    let started = Instant::now();
    match tokio::time::timeout(timeout, TcpStream::connect((ep.host.as_str(), ep.port))).await {
        Ok(Ok(_stream)) => Reachability::Reachable {
            latency_ms: started.elapsed().as_millis() as u64,
        },
        Ok(Err(e)) => Reachability::Unreachable {
            reason: e.to_string(),
        },
        Err(_) => Reachability::Unreachable {
            reason: format!("timed out after {} ms", timeout.as_millis()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_host_uses_default_port() {
        let ep = Endpoint::parse("master-1", 19998).unwrap();
        assert_eq!(ep.host, "master-1");
        assert_eq!(ep.port, 19998);
        assert_eq!(ep.to_string(), "master-1:19998");
    }

    #[test]
    fn parse_host_port_and_scheme() {
        assert_eq!(Endpoint::parse("w1:30000", 1).unwrap().port, 30000);
        let ep = Endpoint::parse("alluxio://10.0.0.5:19998", 1).unwrap();
        assert_eq!(ep.host, "10.0.0.5");
        assert_eq!(ep.port, 19998);
    }

    #[test]
    fn parse_ipv6() {
        let ep = Endpoint::parse("[::1]:19998", 1).unwrap();
        assert_eq!(ep.host, "::1");
        assert_eq!(ep.to_string(), "[::1]:19998");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Endpoint::parse("   ", 1).is_err());
        assert!(Endpoint::parse("host:99999", 1).is_err());
        assert!(Endpoint::parse("host:19998/path", 1).is_err());
        assert!(Endpoint::parse("http://host:80", 1).is_err());
    }

    #[test]
    fn probe_reports_in_order() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = {
            let tmp = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            tmp.local_addr().unwrap().port()
        };
        let eps = vec![
            Endpoint {
                host: "127.0.0.1".into(),
                port: closed,
            },
            Endpoint {
                host: "127.0.0.1".into(),
                port: open,
            },
        ];
        let reports = probe_all(&eps, Duration::from_secs(2)).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].endpoint.port, closed);
        assert!(!reports[0].reachability.is_reachable());
        assert!(reports[1].reachability.is_reachable());
    }

    #[test]
    fn report_serializes_flat() {
        let report = ProbeReport::skipped(&Endpoint {
            host: "m".into(),
            port: 1,
        });
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"endpoint": {"host": "m", "port": 1}, "status": "not_probed"})
        );
    }
}
