//! The request metadata facade.

use once_cell::sync::OnceCell;

use crate::{
    connection::{ConnectionInfo, EndpointInfo},
    error::Error,
    headers::Headers,
    paths, translate,
    vars::Vars,
};

/// Unified view of one request's metadata.
///
/// An [`Env`] is built from whichever representation the front end naturally
/// has: a parsed header set plus the listener's [`ConnectionInfo`], or a flat
/// variable mapping from an upstream gateway. Whatever was not supplied is
/// derived on first access and cached for the lifetime of the request; a
/// cached representation is never recomputed or invalidated. Conversions are
/// pure, so concurrent readers can at worst duplicate work, never disagree.
#[derive(Debug)]
pub struct Env {
    headers: OnceCell<Headers>,
    vars: OnceCell<Vars>,
    info: OnceCell<ConnectionInfo>,
}

impl Env {
    /// Wraps a parsed header set and the listener's connection info.
    ///
    /// Nothing is converted yet; path inference runs inside the first
    /// [`vars`][Self::vars] call and may fail there.
    pub fn from_headers(headers: Headers, info: ConnectionInfo) -> Self {
        Self {
            headers: OnceCell::with_value(headers),
            vars: OnceCell::new(),
            info: OnceCell::with_value(info),
        }
    }

    /// Wraps a variable mapping received from an upstream gateway,
    /// completing the path variables up front.
    pub fn from_vars(mut vars: Vars) -> Result<Self, Error> {
        paths::infer(&mut vars)?;
        Ok(Self {
            headers: OnceCell::new(),
            vars: OnceCell::with_value(vars),
            info: OnceCell::new(),
        })
    }

    /// The variable rendition of the request.
    ///
    /// For header-seeded requests the first call translates the headers,
    /// folds in the connection info (which wins on any name collision), and
    /// runs path inference; [`Error::PathIndeterminate`] surfaces here.
    pub fn vars(&self) -> Result<&Vars, Error> {
        self.vars.get_or_try_init(|| {
            let (headers, info) = match (self.headers.get(), self.info.get()) {
                (Some(headers), Some(info)) => (headers, info),
                _ => unreachable!("an env without variables was seeded with headers"),
            };
            tracing::trace!("building request variables from headers and connection info");
            let mut vars = translate::headers_to_vars(headers);
            info.write_vars(&mut vars);
            paths::infer(&mut vars)?;
            Ok(vars)
        })
    }

    /// The header rendition of the request, rebuilt from the variables when
    /// the request arrived that way.
    pub fn headers(&self) -> &Headers {
        self.headers.get_or_init(|| {
            let vars = match self.vars.get() {
                Some(vars) => vars,
                None => unreachable!("an env without headers was seeded with variables"),
            };
            tracing::trace!("rebuilding headers from request variables");
            translate::vars_to_headers(vars)
        })
    }

    /// The connection info, rebuilt from the variables when the request
    /// arrived that way. Rebuilding requires the `*_ADDR`/`*_PORT` pairs.
    pub fn connection_info(&self) -> Result<&ConnectionInfo, Error> {
        self.info.get_or_try_init(|| {
            let vars = match self.vars.get() {
                Some(vars) => vars,
                None => unreachable!("an env without connection info was seeded with variables"),
            };
            tracing::trace!("rebuilding connection info from request variables");
            ConnectionInfo::try_from(vars)
        })
    }

    /// The server endpoint, through [`connection_info`][Self::connection_info].
    pub fn server(&self) -> Result<&EndpointInfo, Error> {
        Ok(&self.connection_info()?.server)
    }

    /// The remote endpoint, through [`connection_info`][Self::connection_info].
    pub fn remote(&self) -> Result<&EndpointInfo, Error> {
        Ok(&self.connection_info()?.remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        addr::Address,
        connection::{RemoteInfo, ServerInfo, SOFTWARE},
        vars::{names, VarValue},
    };
    use std::net::SocketAddr;

    fn listener_info() -> ConnectionInfo {
        let mut server = ServerInfo::new();
        server.set_software(SOFTWARE);
        server.set_capabilities(true, false, false);
        server.set_addr(Address::new("127.0.0.1:8080".parse::<SocketAddr>().unwrap()));
        let mut remote = RemoteInfo::new();
        remote.set_addr(Address::new("10.0.0.9:52000".parse::<SocketAddr>().unwrap()));
        ConnectionInfo::new(server, remote)
    }

    fn parsed_headers() -> Headers {
        let mut headers = Headers::from_iter([
            ("Host", "example.com"),
            ("User-Agent", "test/1.0"),
        ]);
        headers.set_request_line("GET", "/app/foo?x=1", "HTTP/1.1", "http");
        headers
    }

    #[test]
    fn headers_seed_yields_the_guaranteed_variables() {
        let env = Env::from_headers(parsed_headers(), listener_info());
        let vars = env.vars().unwrap();

        assert_eq!(vars.get_str(names::REQUEST_METHOD), Some("GET"));
        assert_eq!(vars.get_str(names::SERVER_PROTOCOL), Some("HTTP/1.1"));
        assert_eq!(vars.get_str(names::SCRIPT_NAME), Some(""));
        assert_eq!(vars.get_str(names::PATH_INFO), Some("/app/foo"));
        assert_eq!(vars.get_str(names::QUERY_STRING), Some("x=1"));
        assert_eq!(vars.get_str(names::SERVER_SOFTWARE), Some(SOFTWARE));
        assert_eq!(vars.get_str(names::SERVER_ADDR), Some("127.0.0.1"));
        assert_eq!(vars.get(names::SERVER_PORT).unwrap().as_int(), Some(8080));
        assert_eq!(vars.get_str(names::REMOTE_ADDR), Some("10.0.0.9"));
        assert_eq!(vars.get(names::REMOTE_PORT).unwrap().as_int(), Some(52000));
        assert_eq!(vars.get_str("HTTP_USER_AGENT"), Some("test/1.0"));
        assert_eq!(vars.get_str(names::HTTP_HOST), Some("example.com"));
    }

    #[test]
    fn representations_are_memoized() {
        let env = Env::from_headers(parsed_headers(), listener_info());
        assert!(std::ptr::eq(env.vars().unwrap(), env.vars().unwrap()));
        assert!(std::ptr::eq(env.headers(), env.headers()));
        assert!(std::ptr::eq(
            env.connection_info().unwrap(),
            env.connection_info().unwrap()
        ));
    }

    #[test]
    fn connection_info_wins_name_collisions() {
        let mut info = listener_info();
        info.server.set_attr("protocol", "h2");
        let env = Env::from_headers(parsed_headers(), info);
        // The header-derived SERVER_PROTOCOL is overwritten by the endpoint
        // attribute of the same name.
        assert_eq!(
            env.vars().unwrap().get_str(names::SERVER_PROTOCOL),
            Some("h2")
        );
    }

    #[test]
    fn vars_seed_rebuilds_headers_and_info() {
        let vars = Vars::from_iter([
            (names::REQUEST_METHOD, VarValue::from("POST")),
            (names::REQUEST_URI, "/svc/item?id=7".into()),
            (names::SERVER_PROTOCOL, "HTTP/1.1".into()),
            (names::SERVER_ADDR, "127.0.0.1".into()),
            (names::SERVER_PORT, 8080.into()),
            (names::REMOTE_ADDR, "10.0.0.9".into()),
            (names::REMOTE_PORT, 52000.into()),
            (names::REMOTE_USER, "alice".into()),
            ("HTTP_USER_AGENT", "test/1.0".into()),
        ]);
        let env = Env::from_vars(vars).unwrap();

        // Inference ran eagerly.
        let vars = env.vars().unwrap();
        assert_eq!(vars.get_str(names::PATH_INFO), Some("/svc/item"));
        assert_eq!(vars.get_str(names::QUERY_STRING), Some("id=7"));

        let headers = env.headers();
        assert_eq!(headers.get(":method"), Some("POST"));
        assert_eq!(headers.get(":path"), Some("/svc/item?id=7"));
        assert_eq!(headers.get(":scheme"), Some("http"));
        assert_eq!(headers.get("user-agent"), Some("test/1.0"));

        assert_eq!(env.remote().unwrap().attr("user"), Some("alice"));
        assert_eq!(
            env.server().unwrap().addr().unwrap().port().unwrap(),
            8080
        );
    }

    #[test]
    fn vars_seed_with_no_path_fails_eagerly() {
        let vars = Vars::from_iter([(names::REQUEST_METHOD, VarValue::from("GET"))]);
        assert!(matches!(Env::from_vars(vars), Err(Error::PathIndeterminate)));
    }

    #[test]
    fn headers_seed_without_a_path_fails_in_vars() {
        let mut headers = Headers::new();
        headers.insert(":method", "OPTIONS");
        let env = Env::from_headers(headers, listener_info());
        assert!(matches!(env.vars(), Err(Error::PathIndeterminate)));
        // The connection info itself is still reachable.
        assert!(env.connection_info().is_ok());
    }

    #[test]
    fn vars_seed_without_endpoints_still_serves_vars() {
        let vars = Vars::from_iter([(names::REQUEST_URI, VarValue::from("/x"))]);
        let env = Env::from_vars(vars).unwrap();
        assert!(env.vars().is_ok());
        assert!(matches!(
            env.connection_info(),
            Err(Error::MissingVariable(names::SERVER_ADDR))
        ));
    }
}
