//! # lockbete-geo
//!
//! GeoIP resolution for attacker source addresses.
//!
//! The resolver is an explicitly owned instance: it holds its backend (a
//! MaxMind City database in production) and its own lock-protected result
//! cache, rather than hanging either off process-global state. Dropping the
//! resolver releases the loaded database.
//!
//! Private and loopback addresses are masked before the backend is ever
//! consulted: `127.0.0.1`, `::1`, `10.0.0.0/8`, `192.168.0.0/16`, and
//! `172.16.0.0/12` never produce an annotation.

#![warn(unsafe_code)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use ipnetwork::Ipv4Network;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::warn;

use lockbete_core::events::GeoAnnotation;

mod maxmind;

pub use maxmind::MaxmindBackend;

/// Geo resolution error conditions.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("failed to open geo database: {0}")]
    Open(#[source] maxminddb::MaxMindDBError),

    #[error("geo lookup failed: {0}")]
    Lookup(#[source] maxminddb::MaxMindDBError),
}

/// Backend seam: maps a public address to an annotation, or `None` when the
/// database has no usable location for it.
pub trait GeoBackend: Send + Sync {
    fn query(&self, ip: IpAddr) -> Result<Option<GeoAnnotation>, GeoError>;
}

/// Backend used when geo enrichment is disabled by configuration.
struct NullBackend;

impl GeoBackend for NullBackend {
    fn query(&self, _ip: IpAddr) -> Result<Option<GeoAnnotation>, GeoError> {
        Ok(None)
    }
}

static PRIVATE_V4: Lazy<[Ipv4Network; 3]> = Lazy::new(|| {
    [
        "10.0.0.0/8".parse().unwrap(),
        "192.168.0.0/16".parse().unwrap(),
        "172.16.0.0/12".parse().unwrap(),
    ]
});

fn is_masked(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || PRIVATE_V4.iter().any(|net| net.contains(v4)),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

/// IP-to-location resolver with an indefinite per-process cache.
///
/// The cache tolerates concurrent population: two tasks racing on the same
/// key may both compute, but converge to a single cached value.
pub struct GeoResolver {
    backend: Box<dyn GeoBackend>,
    cache: RwLock<HashMap<String, Option<GeoAnnotation>>>,
}

impl GeoResolver {
    /// Opens a MaxMind City database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GeoError> {
        Ok(Self::with_backend(Box::new(MaxmindBackend::open(path)?)))
    }

    /// Resolver that never annotates. Used when enrichment is disabled.
    pub fn disabled() -> Self {
        Self::with_backend(Box::new(NullBackend))
    }

    pub fn with_backend(backend: Box<dyn GeoBackend>) -> Self {
        Self {
            backend,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves `ip` to a location. Returns `None` for masked ranges,
    /// unparseable addresses, unlocatable addresses, and backend failures
    /// (logged; a broken geo database must not take the stream down).
    pub fn lookup(&self, ip: &str) -> Option<GeoAnnotation> {
        let addr: IpAddr = match ip.parse() {
            Ok(addr) => addr,
            Err(_) => return None,
        };
        if is_masked(addr) {
            return None;
        }

        if let Some(cached) = self.cache.read().get(ip) {
            return cached.clone();
        }

        match self.backend.query(addr) {
            Ok(geo) => {
                self.cache.write().insert(ip.to_string(), geo.clone());
                geo
            }
            Err(err) => {
                warn!(ip, error = %err, "geo lookup failed, emitting without annotation");
                None
            }
        }
    }

    /// Number of cached results. Exposed for tests and diagnostics.
    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingBackend {
        calls: Arc<AtomicUsize>,
        result: Option<GeoAnnotation>,
    }

    impl GeoBackend for CountingBackend {
        fn query(&self, _ip: IpAddr) -> Result<Option<GeoAnnotation>, GeoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    struct FailingBackend;

    impl GeoBackend for FailingBackend {
        fn query(&self, _ip: IpAddr) -> Result<Option<GeoAnnotation>, GeoError> {
            Err(GeoError::Lookup(
                maxminddb::MaxMindDBError::InvalidDatabaseError("boom".into()),
            ))
        }
    }

    fn jakarta() -> GeoAnnotation {
        GeoAnnotation {
            lat: -6.2,
            lon: 106.8,
            country: Some("Indonesia".into()),
            region: None,
            city: Some("Jakarta".into()),
        }
    }

    fn counting_resolver(result: Option<GeoAnnotation>) -> (GeoResolver, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = GeoResolver::with_backend(Box::new(CountingBackend {
            calls: calls.clone(),
            result,
        }));
        (resolver, calls)
    }

    #[test]
    fn masked_ranges_never_reach_backend() {
        let (resolver, calls) = counting_resolver(Some(jakarta()));
        for ip in [
            "127.0.0.1",
            "::1",
            "10.0.0.1",
            "10.255.255.254",
            "192.168.1.50",
            "172.16.0.1",
            "172.31.255.255",
        ] {
            assert!(resolver.lookup(ip).is_none(), "expected mask for {ip}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn adjacent_public_ranges_are_not_masked() {
        let (resolver, calls) = counting_resolver(Some(jakarta()));
        // 172.15.x and 172.32.x sit just outside 172.16.0.0/12.
        assert!(resolver.lookup("172.15.255.255").is_some());
        assert!(resolver.lookup("172.32.0.1").is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unparseable_address_resolves_to_none() {
        let (resolver, calls) = counting_resolver(Some(jakarta()));
        assert!(resolver.lookup("not-an-ip").is_none());
        assert!(resolver.lookup("").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn results_are_cached_per_ip() {
        let (resolver, calls) = counting_resolver(Some(jakarta()));
        assert_eq!(resolver.lookup("203.0.113.9"), Some(jakarta()));
        assert_eq!(resolver.lookup("203.0.113.9"), Some(jakarta()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cache_len(), 1);
    }

    #[test]
    fn negative_results_are_cached_too() {
        let (resolver, calls) = counting_resolver(None);
        assert!(resolver.lookup("198.51.100.4").is_none());
        assert!(resolver.lookup("198.51.100.4").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backend_failure_degrades_to_no_annotation() {
        let resolver = GeoResolver::with_backend(Box::new(FailingBackend));
        assert!(resolver.lookup("198.51.100.4").is_none());
        // Failures are not cached; a later lookup may succeed.
        assert_eq!(resolver.cache_len(), 0);
    }

    #[test]
    fn disabled_resolver_annotates_nothing() {
        let resolver = GeoResolver::disabled();
        assert!(resolver.lookup("8.8.8.8").is_none());
    }
}
