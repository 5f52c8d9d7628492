//! LAN and WAN addresses for the IO screen.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::debug;

use super::command::{CommandRunner, QueryError};

/// How long a public address lookup is trusted.
pub const PUBLIC_IP_TTL: Duration = Duration::from_secs(300);

/// Address of the interface that routes to the internet.
///
/// Connecting a UDP socket sends nothing; it only asks the kernel
/// which source address it would use.
pub fn lan_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// Public address from `api.ipify.org`, cached for [`PUBLIC_IP_TTL`].
///
/// Only successful lookups are cached; a failed refresh keeps showing
/// the last known address.
pub struct PublicIpCache {
    runner: CommandRunner,
    ttl: Duration,
    cached: Option<(Instant, IpAddr)>,
}

impl PublicIpCache {
    pub fn new(runner: CommandRunner) -> Self {
        Self {
            runner,
            ttl: PUBLIC_IP_TTL,
            cached: None,
        }
    }

    pub fn get(&mut self) -> Option<IpAddr> {
        let runner = self.runner.clone();
        self.get_with(Instant::now(), || {
            runner.run(
                "curl",
                &["-s", "--max-time", "2", "https://api.ipify.org"],
            )
        })
    }

    fn get_with<F>(&mut self, now: Instant, fetch: F) -> Option<IpAddr>
    where
        F: FnOnce() -> Result<String, QueryError>,
    {
        if let Some((at, ip)) = self.cached {
            if now.saturating_duration_since(at) < self.ttl {
                return Some(ip);
            }
        }

        let fetched = fetch().and_then(|body| {
            body.trim()
                .parse::<IpAddr>()
                .map_err(|_| QueryError::Malformed(format!("not an address: {body:?}")))
        });
        match fetched {
            Ok(ip) => {
                self.cached = Some((now, ip));
                Some(ip)
            }
            Err(e) => {
                debug!("public address lookup failed: {e}");
                self.cached.map(|(_, ip)| ip)
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> (tokio::runtime::Runtime, PublicIpCache) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let runner = CommandRunner::new(rt.handle().clone(), Duration::from_secs(1));
        (rt, PublicIpCache::new(runner))
    }

    #[test]
    fn lookup_is_cached_for_five_minutes() {
        let (_rt, mut cache) = cache();
        let t0 = Instant::now();
        let ip: IpAddr = "203.0.113.7".parse().unwrap();

        assert_eq!(cache.get_with(t0, || Ok("203.0.113.7\n".into())), Some(ip));
        assert_eq!(
            cache.get_with(t0 + Duration::from_secs(299), || Ok("198.51.100.1".into())),
            Some(ip)
        );
        assert_eq!(
            cache.get_with(t0 + Duration::from_secs(301), || Ok("198.51.100.1".into())),
            Some("198.51.100.1".parse().unwrap())
        );
    }

    #[test]
    fn failures_are_not_cached() {
        let (_rt, mut cache) = cache();
        let t0 = Instant::now();
        assert_eq!(
            cache.get_with(t0, || Err(QueryError::Unavailable("offline"))),
            None
        );
        // Garbage such as an HTML error page is rejected.
        assert_eq!(cache.get_with(t0, || Ok("<html>".into())), None);
        assert!(cache.get_with(t0, || Ok("2001:db8::1".into())).is_some());
    }

    #[test]
    fn stale_address_survives_failed_refresh() {
        let (_rt, mut cache) = cache();
        let t0 = Instant::now();
        cache.get_with(t0, || Ok("203.0.113.7".into()));
        let later = t0 + Duration::from_secs(600);
        assert_eq!(
            cache.get_with(later, || Err(QueryError::Unavailable("offline"))),
            Some("203.0.113.7".parse().unwrap())
        );
    }
}
