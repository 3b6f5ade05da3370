//! Endpoint addresses.
//!
//! An [`Address`] describes one end of an accepted connection. The raw
//! address may be deferred: a listener can hand over a closure instead of
//! calling into the socket eagerly, and the value is fetched and cached the
//! first time anything needs it. The resolved hostname is likewise cached,
//! but only ever filled by an explicit [`Address::resolve_host`] call, since
//! reverse lookups block on the network.

use std::{fmt, io, net::SocketAddr};

use once_cell::sync::OnceCell;

use crate::{
    dns::{ReverseLookup, SystemDns},
    error::AddressError,
};

/// Address family of one endpoint of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Inet,
    Inet6,
    /// A non-IP transport, for example a Unix domain socket.
    Other,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Inet => write!(f, "INET"),
            AddressFamily::Inet6 => write!(f, "INET6"),
            AddressFamily::Other => write!(f, "OTHER"),
        }
    }
}

/// The literal address of an endpoint, as the transport reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawAddress {
    /// An IP socket address, v4 or v6, with its port.
    Inet(SocketAddr),
    /// An address on a non-IP transport, kept in the transport's own
    /// rendering (e.g. a Unix socket path).
    Other(String),
}

impl RawAddress {
    pub fn family(&self) -> AddressFamily {
        match self {
            RawAddress::Inet(sa) if sa.is_ipv4() => AddressFamily::Inet,
            RawAddress::Inet(_) => AddressFamily::Inet6,
            RawAddress::Other(_) => AddressFamily::Other,
        }
    }
}

impl fmt::Display for RawAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawAddress::Inet(sa) => sa.fmt(f),
            RawAddress::Other(value) => f.write_str(value),
        }
    }
}

impl From<SocketAddr> for RawAddress {
    fn from(sa: SocketAddr) -> Self {
        RawAddress::Inet(sa)
    }
}

type FetchFn = dyn Fn() -> io::Result<RawAddress> + Send + Sync;

/// One endpoint of a connection: address family, raw address, and an
/// optionally-resolved hostname.
///
/// Immutable once built, apart from the two caches that fill in exactly once.
pub struct Address {
    family: AddressFamily,
    raw: OnceCell<RawAddress>,
    fetch: Option<Box<FetchFn>>,
    host: OnceCell<String>,
}

impl Address {
    /// Builds an address from an already-known raw value.
    pub fn new(raw: impl Into<RawAddress>) -> Self {
        let raw = raw.into();
        Self {
            family: raw.family(),
            raw: OnceCell::with_value(raw),
            fetch: None,
            host: OnceCell::new(),
        }
    }

    /// Builds an address whose hostname is already known, so no reverse
    /// lookup will ever be needed.
    pub fn with_host(raw: impl Into<RawAddress>, host: impl Into<String>) -> Self {
        let addr = Self::new(raw);
        let _ = addr.host.set(host.into());
        addr
    }

    /// Builds an address whose raw value is fetched on first use.
    ///
    /// The family must be known up front; a listener has it from the socket
    /// without asking the kernel for the bound address.
    pub fn deferred<F>(family: AddressFamily, fetch: F) -> Self
    where
        F: Fn() -> io::Result<RawAddress> + Send + Sync + 'static,
    {
        Self {
            family,
            raw: OnceCell::new(),
            fetch: Some(Box::new(fetch)),
            host: OnceCell::new(),
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// The raw address, fetched and cached on first access when construction
    /// deferred it.
    pub fn raw(&self) -> Result<&RawAddress, AddressError> {
        self.raw.get_or_try_init(|| match self.fetch.as_deref() {
            Some(fetch) => fetch().map_err(AddressError::Unavailable),
            None => unreachable!("non-deferred addresses are seeded at construction"),
        })
    }

    /// The literal address: for IP families the IP without its port, for
    /// other families the transport's own rendering.
    pub fn addr(&self) -> Result<String, AddressError> {
        match self.raw()? {
            RawAddress::Inet(sa) => Ok(sa.ip().to_string()),
            RawAddress::Other(value) => Ok(value.clone()),
        }
    }

    /// The port, for address families that carry one.
    pub fn port(&self) -> Result<u16, AddressError> {
        match self.raw()? {
            RawAddress::Inet(sa) => Ok(sa.port()),
            RawAddress::Other(_) => Err(AddressError::NoPort {
                family: self.family,
            }),
        }
    }

    /// The hostname, if it has already been resolved or was supplied at
    /// construction. Never triggers a lookup.
    pub fn host(&self) -> Option<&str> {
        self.host.get().map(String::as_str)
    }

    /// Resolves the hostname through the system resolver, caching the result.
    ///
    /// This is the one operation in the crate that blocks on the network, and
    /// it only ever runs when called; reading any other field leaves the
    /// hostname untouched. Repeated calls return the cached name.
    pub fn resolve_host(&self) -> Result<&str, AddressError> {
        self.resolve_host_with(&SystemDns)
    }

    /// Resolves the hostname through a caller-chosen resolver.
    pub fn resolve_host_with(&self, resolver: &dyn ReverseLookup) -> Result<&str, AddressError> {
        let host = self.host.get_or_try_init(|| {
            let sa = match self.raw()? {
                RawAddress::Inet(sa) => *sa,
                RawAddress::Other(_) => {
                    return Err(AddressError::NoHost {
                        family: self.family,
                    })
                }
            };
            let host = resolver
                .reverse_lookup(&sa)
                .map_err(AddressError::Resolve)?;
            tracing::debug!(addr = %sa, host = %host, "resolved endpoint hostname");
            Ok(host)
        })?;
        Ok(host)
    }
}

impl From<SocketAddr> for Address {
    fn from(sa: SocketAddr) -> Self {
        Address::new(sa)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("family", &self.family)
            .field("raw", &self.raw.get())
            .field("host", &self.host.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn v4(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    struct CountingDns {
        calls: Cell<usize>,
    }

    impl CountingDns {
        fn new() -> Self {
            CountingDns {
                calls: Cell::new(0),
            }
        }
    }

    impl ReverseLookup for CountingDns {
        fn reverse_lookup(&self, addr: &SocketAddr) -> io::Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(format!("host-{}", addr.port()))
        }
    }

    /// Fails the first lookup and answers every one after it.
    struct FlakyDns {
        calls: Cell<usize>,
    }

    impl ReverseLookup for FlakyDns {
        fn reverse_lookup(&self, addr: &SocketAddr) -> io::Result<String> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() == 1 {
                Err(io::Error::new(io::ErrorKind::TimedOut, "no answer"))
            } else {
                Ok(format!("host-{}", addr.port()))
            }
        }
    }

    #[test]
    fn families_follow_the_raw_address() {
        assert_eq!(Address::new(v4("10.0.0.1:80")).family(), AddressFamily::Inet);
        let six: SocketAddr = "[::1]:80".parse().unwrap();
        assert_eq!(Address::new(six).family(), AddressFamily::Inet6);
        let unix = Address::new(RawAddress::Other("/run/app.sock".to_owned()));
        assert_eq!(unix.family(), AddressFamily::Other);
    }

    #[test]
    fn port_is_an_error_off_ip() {
        let unix = Address::new(RawAddress::Other("/run/app.sock".to_owned()));
        assert!(matches!(
            unix.port(),
            Err(AddressError::NoPort {
                family: AddressFamily::Other
            })
        ));
        // The literal address is still available.
        assert_eq!(unix.addr().unwrap(), "/run/app.sock");
    }

    #[test]
    fn deferred_raw_is_fetched_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let addr = Address::deferred(AddressFamily::Inet, || {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(RawAddress::Inet("127.0.0.1:8080".parse().unwrap()))
        });
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
        assert_eq!(addr.port().unwrap(), 8080);
        assert_eq!(addr.addr().unwrap(), "127.0.0.1");
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deferred_raw_failure_surfaces() {
        let addr = Address::deferred(AddressFamily::Inet, || {
            Err(io::Error::new(io::ErrorKind::NotFound, "socket gone"))
        });
        assert!(matches!(addr.raw(), Err(AddressError::Unavailable(_))));
    }

    #[test]
    fn reading_fields_never_resolves() {
        let addr = Address::new(v4("192.0.2.7:443"));
        let _ = addr.family();
        let _ = addr.raw();
        let _ = addr.addr();
        let _ = addr.port();
        assert_eq!(addr.host(), None);
    }

    #[test]
    fn resolution_is_explicit_and_cached() {
        let addr = Address::new(v4("192.0.2.7:443"));
        let dns = CountingDns::new();
        assert_eq!(addr.resolve_host_with(&dns).unwrap(), "host-443");
        assert_eq!(addr.resolve_host_with(&dns).unwrap(), "host-443");
        assert_eq!(dns.calls.get(), 1);
        assert_eq!(addr.host(), Some("host-443"));
    }

    #[test]
    fn failed_resolution_is_not_cached() {
        let addr = Address::new(v4("192.0.2.7:443"));
        let dns = FlakyDns {
            calls: Cell::new(0),
        };
        assert!(matches!(
            addr.resolve_host_with(&dns),
            Err(AddressError::Resolve(_))
        ));
        // The failure leaves the address otherwise untouched.
        assert_eq!(addr.host(), None);
        assert_eq!(addr.addr().unwrap(), "192.0.2.7");
        assert_eq!(addr.port().unwrap(), 443);
        // A retry may succeed, and only then is the name cached.
        assert_eq!(addr.resolve_host_with(&dns).unwrap(), "host-443");
        assert_eq!(addr.resolve_host_with(&dns).unwrap(), "host-443");
        assert_eq!(dns.calls.get(), 2);
    }

    #[test]
    fn seeded_host_skips_the_resolver() {
        let addr = Address::with_host(v4("192.0.2.7:443"), "app.example");
        let dns = CountingDns::new();
        assert_eq!(addr.resolve_host_with(&dns).unwrap(), "app.example");
        assert_eq!(dns.calls.get(), 0);
    }

    #[test]
    fn resolving_off_ip_is_an_error() {
        let unix = Address::new(RawAddress::Other("/run/app.sock".to_owned()));
        let dns = CountingDns::new();
        assert!(matches!(
            unix.resolve_host_with(&dns),
            Err(AddressError::NoHost { .. })
        ));
        assert_eq!(dns.calls.get(), 0);
    }
}
