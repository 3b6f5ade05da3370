//! Bidirectional translation between header fields and request variables.
//!
//! A fixed, ordered table maps the header names with a canonical variable
//! counterpart (the pseudo-headers plus the entity fields); everything else
//! travels through the generic `HTTP_*` sweep. Table entries always win over
//! the sweep, in both directions.

use crate::{
    headers::{pseudo, Headers},
    vars::{names, truthy, Vars},
};

type ForwardFn = fn(&Headers) -> Option<String>;
type BackwardFn = fn(&Vars) -> Option<String>;

struct Entry {
    header: &'static str,
    var: &'static str,
    /// Header value to variable value; identity lookup when absent.
    forward: Option<ForwardFn>,
    /// Variable value to header value; identity lookup when absent.
    backward: Option<BackwardFn>,
}

static TABLE: &[Entry] = &[
    Entry {
        header: pseudo::METHOD,
        var: names::REQUEST_METHOD,
        forward: None,
        backward: None,
    },
    Entry {
        header: pseudo::PATH,
        var: names::REQUEST_URI,
        forward: None,
        backward: None,
    },
    Entry {
        header: pseudo::VERSION,
        var: names::SERVER_PROTOCOL,
        forward: None,
        backward: None,
    },
    Entry {
        header: pseudo::HOST,
        var: names::HTTP_HOST,
        forward: None,
        backward: None,
    },
    Entry {
        header: pseudo::SCHEME,
        var: names::HTTPS,
        forward: Some(scheme_to_flag),
        backward: Some(flag_to_scheme),
    },
    Entry {
        header: "content-length",
        var: names::CONTENT_LENGTH,
        forward: None,
        backward: None,
    },
    Entry {
        header: "content-type",
        var: names::CONTENT_TYPE,
        forward: None,
        backward: None,
    },
];

/// `:scheme` is a string on the wire but a secure-or-not flag in the
/// variable world: `"1"` for https, `"0"` for anything else, nothing when
/// the scheme itself is unknown.
fn scheme_to_flag(headers: &Headers) -> Option<String> {
    headers
        .get(pseudo::SCHEME)
        .map(|scheme| if scheme == "https" { "1" } else { "0" }.to_owned())
}

/// The reverse always has an answer: a truthy flag means https, anything
/// else (including an absent flag) means http.
fn flag_to_scheme(vars: &Vars) -> Option<String> {
    let secure = vars.get_str(names::HTTPS).is_some_and(truthy);
    Some(if secure { "https" } else { "http" }.to_owned())
}

/// Converts a header set into request variables.
///
/// Table entries are applied in order, skipping any whose source header is
/// absent or whose value comes out empty. The sweep then carries every
/// remaining header over as `HTTP_<NAME>`, with the value stripped of
/// surrounding whitespace; names the table already spoke for are left alone.
pub fn headers_to_vars(headers: &Headers) -> Vars {
    let mut vars = Vars::new();

    for entry in TABLE {
        if vars.contains(entry.var) {
            continue;
        }
        let value = match entry.forward {
            Some(forward) => forward(headers),
            None => headers.get(entry.header).map(str::to_owned),
        };
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            vars.insert(entry.var, value);
        }
    }

    for (name, value) in headers.iter() {
        if TABLE.iter().any(|entry| entry.header == name) {
            continue;
        }
        let canonical = name.replace('-', "_").to_ascii_uppercase();
        if vars.contains(&canonical) {
            // A table entry already produced this field (content-length and
            // friends); the table wins.
            continue;
        }
        let prefixed = format!("HTTP_{canonical}");
        if vars.contains(&prefixed) {
            continue;
        }
        vars.insert(prefixed, value.trim());
    }

    vars
}

/// Converts request variables back into a header set, symmetrically to
/// [`headers_to_vars`]: table first, then every `HTTP_*` variable with the
/// prefix stripped, lowercased, and `_` turned back into `-`.
pub fn vars_to_headers(vars: &Vars) -> Headers {
    let mut headers = Headers::new();

    for entry in TABLE {
        if headers.contains(entry.header) {
            continue;
        }
        let value = match entry.backward {
            Some(backward) => backward(vars),
            None => vars.get(entry.var).map(|v| v.to_string()),
        };
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            headers.insert(entry.header, value);
        }
    }

    for (name, value) in vars.iter() {
        let rest = match name.strip_prefix("HTTP_") {
            Some(rest) => rest,
            None => continue,
        };
        let header = rest.replace('_', "-").to_ascii_lowercase();
        if headers.contains(&header) {
            continue;
        }
        headers.insert(header, value.to_string());
    }

    headers
}
