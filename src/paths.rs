//! Path variable inference.
//!
//! Front ends deliver wildly different subsets of the path variables: a
//! proxy gateway may send only `REQUEST_URI`, a web server may send the
//! filesystem fields too. [`infer`] fills in whatever is derivable from
//! whatever is present, in a fixed order, and never overwrites a value that
//! arrived from outside. Only one field is mandatory at the end of the run:
//! `PATH_INFO`, because every application needs it; its absence is the one
//! fatal case.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{
    error::Error,
    vars::{names, Vars},
};

/// Set of characters escaped when rebuilding `REQUEST_URI`: everything but
/// the unreserved characters and `/`.
const QUOTE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn quote(s: &str) -> String {
    utf8_percent_encode(s, QUOTE_SET).to_string()
}

fn unquote(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Removes the mount-point prefix from a document URI. A mount that is not
/// actually a prefix contributes nothing rather than chopping blind.
fn strip_mount<'a>(doc_uri: &'a str, script_name: &str) -> &'a str {
    doc_uri.strip_prefix(script_name).unwrap_or(doc_uri)
}

/// `full` minus a trailing `suffix`, when the suffix is non-empty and
/// actually there.
fn strip_tail(vars: &Vars, full_name: &str, suffix_name: &str) -> Option<String> {
    let full = vars.get_str(full_name)?;
    let suffix = vars.get_str(suffix_name)?;
    if suffix.is_empty() {
        return None;
    }
    full.strip_suffix(suffix).map(str::to_owned)
}

fn concat(vars: &Vars, left_name: &str, right_name: &str) -> Option<String> {
    Some(format!(
        "{}{}",
        vars.get_str(left_name)?,
        vars.get_str(right_name)?
    ))
}

/// Fills in the derivable path variables in place.
///
/// Steps run in a fixed order and each one fires only when its target is
/// still absent. Absent inputs make a step skip silently; the only error is
/// [`Error::PathIndeterminate`], when `PATH_INFO` cannot be established
/// from any of `PATH_INFO`, `REQUEST_URI`, or `DOCUMENT_URI`.
pub fn infer(vars: &mut Vars) -> Result<(), Error> {
    // DOCUMENT_URI and QUERY_STRING split out of REQUEST_URI.
    if !vars.contains(names::DOCUMENT_URI) {
        let parts = vars.get_str(names::REQUEST_URI).map(|uri| {
            let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
            (unquote(path), query.to_owned())
        });
        if let Some((doc_uri, query)) = parts {
            vars.set_default(names::QUERY_STRING, query);
            vars.insert(names::DOCUMENT_URI, doc_uri);
        }
    }

    // Mounted on / unless told otherwise.
    vars.set_default(names::SCRIPT_NAME, "");

    // PATH_INFO, the one field whose absence is fatal.
    if !vars.contains(names::PATH_INFO) {
        let derived = vars.get_str(names::DOCUMENT_URI).map(|doc_uri| {
            let script_name = vars.get_str(names::SCRIPT_NAME).unwrap_or("");
            strip_mount(doc_uri, script_name).to_owned()
        });
        match derived {
            Some(path_info) => vars.insert(names::PATH_INFO, path_info),
            None => {
                tracing::debug!("no PATH_INFO, REQUEST_URI, or DOCUMENT_URI to derive a path from");
                return Err(Error::PathIndeterminate);
            }
        }
    }

    // DOCUMENT_URI second chance, reachable when PATH_INFO was supplied
    // directly and REQUEST_URI was not.
    if !vars.contains(names::DOCUMENT_URI) {
        if let Some(doc_uri) = concat(vars, names::SCRIPT_NAME, names::PATH_INFO) {
            vars.insert(names::DOCUMENT_URI, doc_uri);
        }
    }

    // REQUEST_URI rebuilt from the decoded pieces.
    if !vars.contains(names::REQUEST_URI) {
        let rebuilt = vars.get_str(names::DOCUMENT_URI).map(|doc_uri| {
            let mut uri = quote(doc_uri);
            if let Some(query) = vars.get_str(names::QUERY_STRING).filter(|q| !q.is_empty()) {
                uri.push('?');
                uri.push_str(query);
            }
            uri
        });
        if let Some(request_uri) = rebuilt {
            vars.insert(names::REQUEST_URI, request_uri);
        }
    }

    // DOCUMENT_ROOT from whichever filesystem field carries its suffix.
    if !vars.contains(names::DOCUMENT_ROOT) {
        let root = strip_tail(vars, names::SCRIPT_FILENAME, names::SCRIPT_NAME)
            .or_else(|| strip_tail(vars, names::PATH_TRANSLATED, names::PATH_INFO));
        if let Some(root) = root {
            vars.insert(names::DOCUMENT_ROOT, root);
        }
    }

    // And back down: the filesystem fields from DOCUMENT_ROOT.
    if !vars.contains(names::SCRIPT_FILENAME) {
        if let Some(filename) = concat(vars, names::DOCUMENT_ROOT, names::SCRIPT_NAME) {
            vars.insert(names::SCRIPT_FILENAME, filename);
        }
    }

    if !vars.contains(names::PATH_TRANSLATED) {
        if let Some(translated) = concat(vars, names::DOCUMENT_ROOT, names::PATH_INFO) {
            vars.insert(names::PATH_TRANSLATED, translated);
        }
    }

    Ok(())
}
