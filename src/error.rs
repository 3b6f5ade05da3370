//! Error types.

use std::io;

use crate::addr::AddressFamily;

/// Errors that may occur while normalizing request metadata.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Thrown by path inference when none of `PATH_INFO`, `REQUEST_URI`, or
    /// `DOCUMENT_URI` is available to establish the application path.
    ///
    /// This is the only fatal condition in the inference engine; every other
    /// missing input is skipped as best-effort.
    #[error("cannot determine request path: none of PATH_INFO, REQUEST_URI, or DOCUMENT_URI is set")]
    PathIndeterminate,

    /// A variable required to rebuild connection info was absent.
    #[error("missing required variable `{0}`")]
    MissingVariable(&'static str),

    /// A variable required to rebuild connection info had a value that could
    /// not be interpreted (e.g. an address literal that is not an IP, or a
    /// port that is not a number).
    #[error("invalid value {value:?} for variable `{name}`")]
    InvalidVariable {
        name: &'static str,
        value: String,
    },

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Errors related to endpoint addresses.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    /// A port was requested for an address family that has none.
    #[error("only IP addresses have ports (family is {family})")]
    NoPort { family: AddressFamily },

    /// A reverse lookup was requested for an address family that does not
    /// support it.
    #[error("only IP addresses have hostnames (family is {family})")]
    NoHost { family: AddressFamily },

    /// A deferred address could not be materialized.
    #[error("address unavailable")]
    Unavailable(#[source] io::Error),

    /// The reverse DNS lookup itself failed.
    #[error("reverse lookup failed")]
    Resolve(#[source] io::Error),
}
