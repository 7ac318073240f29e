//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

/// A convenience wrapper around `Result` for `yangtree::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum listing possible fatal error classes.
///
/// User-visible constraint violations (`data-not-unique`,
/// `too-few-elements`, `too-many-elements`) are not errors in this sense;
/// they travel as [`crate::validate::Validity::Invalid`] carrying a
/// [`crate::netconf::RpcError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Two schema nodes claim the same `(namespace, name)`.
    BindAmbiguous,
    /// A `unique` statement combines a list of names with a `/`-separated
    /// schema-node-id.
    MultipleDescendant,
    /// An XPath expression could not be parsed or evaluated.
    XPath,
    /// Malformed XML input.
    Parse,
    /// Plugin registration conflict.
    Plugin,
    /// Internal invariant violation.
    Internal,
}

/// Error type for yangtree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: Option<String>,
    pub path: Option<String>,
    pub apptag: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Error {
        Error {
            kind,
            msg: Some(msg.into()),
            path: None,
            apptag: None,
        }
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::Parse, msg)
    }

    pub(crate) fn xpath(msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::XPath, msg)
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::Internal, msg)
    }
}

impl std::fmt::Display for Error {
    // Print only the base error message by default.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.msg {
            Some(msg) => write!(f, "{}", msg),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl std::error::Error for Error {}
