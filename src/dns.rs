use std::{io, net::SocketAddr};

/// Reverse name resolution for endpoint addresses.
///
/// Resolution blocks the calling thread; callers decide when that cost is
/// acceptable. Tests substitute their own implementation.
pub trait ReverseLookup {
    /// Looks up the primary hostname for `addr`.
    fn reverse_lookup(&self, addr: &SocketAddr) -> io::Result<String>;
}

/// The operating system's resolver, by way of `getnameinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDns;

impl ReverseLookup for SystemDns {
    fn reverse_lookup(&self, addr: &SocketAddr) -> io::Result<String> {
        dns_lookup::getnameinfo(addr, 0)
            .map(|(name, _service)| name)
            .map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_resolver_plugs_into_the_seam() {
        // Anywhere a test double fits, the real resolver does too.
        let _resolver: &dyn ReverseLookup = &SystemDns;
    }
}
