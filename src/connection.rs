//! Connection endpoint records.
//!
//! A listener builds one [`ConnectionInfo`] per accepted connection: the
//! server-side endpoint, the remote endpoint, and whatever extra metadata it
//! wants to attach to either. The normalization layer treats it as read-only
//! apart from the lazy cells inside [`Address`].

use std::net::{IpAddr, SocketAddr};

use indexmap::IndexMap;

use crate::{
    addr::{Address, RawAddress},
    error::Error,
    vars::{names, truthy, Vars},
};

/// Software identifier for `SERVER_SOFTWARE` when the embedding server has
/// no name of its own.
pub const SOFTWARE: &str = concat!("emissary/", env!("CARGO_PKG_VERSION"));

/// One endpoint of a connection: an optional address plus open-ended,
/// string-valued attributes.
///
/// Attributes round-trip through variables named `SERVER_<NAME>` /
/// `REMOTE_<NAME>`; keys are kept lowercase so the mapping stays stable in
/// both directions. Boolean attributes (the capability flags) are stored as
/// `"1"`/`"0"` and read back with the same truthy set the `HTTPS` flag uses.
#[derive(Debug, Default)]
pub struct EndpointInfo {
    addr: Option<Address>,
    attrs: IndexMap<String, String>,
}

/// The server-side endpoint of a connection.
pub type ServerInfo = EndpointInfo;

/// The remote endpoint of a connection.
pub type RemoteInfo = EndpointInfo;

impl EndpointInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_addr(&mut self, addr: Address) {
        self.addr = Some(addr);
    }

    pub fn addr(&self) -> Option<&Address> {
        self.addr.as_ref()
    }

    /// Attaches a free-form attribute. Names are lowercased.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Iterates attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The advertised server software, for endpoints that carry one.
    pub fn software(&self) -> Option<&str> {
        self.attr("software")
    }

    pub fn set_software(&mut self, software: impl Into<String>) {
        self.set_attr("software", software);
    }

    /// Records the concurrency capabilities of the serving side.
    pub fn set_capabilities(
        &mut self,
        multiconnection: bool,
        multithread: bool,
        multiprocess: bool,
    ) {
        self.set_flag("multiconnection", multiconnection);
        self.set_flag("multithread", multithread);
        self.set_flag("multiprocess", multiprocess);
    }

    fn set_flag(&mut self, name: &str, on: bool) {
        self.set_attr(name, if on { "1" } else { "0" });
    }

    /// Reads a flag attribute back as a boolean, `None` when unset.
    pub fn capability(&self, name: &str) -> Option<bool> {
        self.attr(name).map(truthy)
    }

    /// Emits this endpoint's fields into `vars` under the given prefix.
    ///
    /// Attributes always go out. The address pair `*_ADDR`/`*_PORT` goes out
    /// only for an IP-family address that can be materialized; `*_HOST` only
    /// when the hostname is already known, since emission must never trigger
    /// a lookup.
    fn write_vars(&self, prefix: &str, vars: &mut Vars) {
        for (name, value) in &self.attrs {
            vars.insert(format!("{prefix}{}", name.to_ascii_uppercase()), value.as_str());
        }

        let addr = match &self.addr {
            Some(addr) => addr,
            None => return,
        };
        match (addr.addr(), addr.port()) {
            (Ok(literal), Ok(port)) => {
                vars.insert(format!("{prefix}ADDR"), literal);
                vars.insert(format!("{prefix}PORT"), port);
                if let Some(host) = addr.host() {
                    vars.insert(format!("{prefix}HOST"), host);
                }
            }
            _ => {
                tracing::trace!(
                    endpoint = prefix.trim_end_matches('_'),
                    "endpoint address unavailable or not IP; emitted without ADDR/PORT"
                );
            }
        }
    }
}

/// Both endpoints of an accepted connection.
#[derive(Debug, Default)]
pub struct ConnectionInfo {
    pub server: ServerInfo,
    pub remote: RemoteInfo,
}

impl ConnectionInfo {
    pub fn new(server: ServerInfo, remote: RemoteInfo) -> Self {
        Self { server, remote }
    }

    /// Writes both endpoints into `vars`, server side first. Existing
    /// variables of the same name are overwritten; connection info is the
    /// authority on endpoint fields.
    pub(crate) fn write_vars(&self, vars: &mut Vars) {
        self.server.write_vars("SERVER_", vars);
        self.remote.write_vars("REMOTE_", vars);
    }
}

fn address_from_vars(
    vars: &Vars,
    addr_name: &'static str,
    port_name: &'static str,
    host_name: &str,
) -> Result<Address, Error> {
    let literal = vars.get(addr_name).ok_or(Error::MissingVariable(addr_name))?;
    let literal = literal.as_str().ok_or_else(|| Error::InvalidVariable {
        name: addr_name,
        value: literal.to_string(),
    })?;
    // The colon test for v6 versus v4 falls out of IP literal parsing.
    let ip: IpAddr = literal.parse().map_err(|_| Error::InvalidVariable {
        name: addr_name,
        value: literal.to_owned(),
    })?;

    let port = vars.get(port_name).ok_or(Error::MissingVariable(port_name))?;
    let port = port.as_int().ok_or_else(|| Error::InvalidVariable {
        name: port_name,
        value: port.to_string(),
    })?;

    let raw = RawAddress::Inet(SocketAddr::new(ip, port));
    Ok(match vars.get_str(host_name) {
        Some(host) => Address::with_host(raw, host),
        None => Address::new(raw),
    })
}

impl TryFrom<&Vars> for ConnectionInfo {
    type Error = Error;

    /// Rebuilds connection info from its variable rendition.
    ///
    /// Each endpoint requires its `*_ADDR`/`*_PORT` pair; `*_HOST`, when
    /// present, seeds the already-resolved hostname. Every other
    /// `SERVER_*`/`REMOTE_*` variable becomes an attribute on its own
    /// endpoint.
    fn try_from(vars: &Vars) -> Result<Self, Error> {
        let mut info = ConnectionInfo::default();
        info.server.set_addr(address_from_vars(
            vars,
            names::SERVER_ADDR,
            names::SERVER_PORT,
            names::SERVER_HOST,
        )?);
        info.remote.set_addr(address_from_vars(
            vars,
            names::REMOTE_ADDR,
            names::REMOTE_PORT,
            names::REMOTE_HOST,
        )?);

        for (name, value) in vars.iter() {
            if let Some(rest) = name.strip_prefix("SERVER_") {
                let attr = rest.to_ascii_lowercase();
                if !matches!(attr.as_str(), "addr" | "port" | "host") {
                    info.server.set_attr(attr, value.to_string());
                }
            }
            if let Some(rest) = name.strip_prefix("REMOTE_") {
                let attr = rest.to_ascii_lowercase();
                if !matches!(attr.as_str(), "addr" | "port" | "host") {
                    info.remote.set_attr(attr, value.to_string());
                }
            }
        }

        Ok(info)
    }
}
