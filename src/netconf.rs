//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! NETCONF error fragments.

use crate::data::{DataTree, PrintFlags};

pub const NETCONF_BASE_NAMESPACE: &str =
    "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const WITH_DEFAULTS_NAMESPACE: &str =
    "urn:ietf:params:xml:ns:netconf:default:1.0";
pub const WITH_DEFAULTS_ATTR_PREFIX: &str = "wd";

/// A structured NETCONF `rpc-error`, produced by the validation passes and
/// rendered into the caller's reply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RpcError {
    error_type: String,
    error_tag: String,
    error_app_tag: String,
    error_path: String,
    error_message: Option<String>,
    /// Key leaf names and values of the colliding tuple
    /// (`data-not-unique`).
    non_unique: Vec<(String, String)>,
    /// Offending child name (`too-few-elements` / `too-many-elements`).
    bad_element: Option<String>,
}

impl RpcError {
    /// RFC 7950 section 15.1: a `unique` or key constraint is violated.
    pub fn data_not_unique(
        path: impl Into<String>,
        keys: Vec<(String, String)>,
    ) -> RpcError {
        RpcError {
            error_type: "application".to_string(),
            error_tag: "operation-failed".to_string(),
            error_app_tag: "data-not-unique".to_string(),
            error_path: path.into(),
            error_message: Some("data not unique".to_string()),
            non_unique: keys,
            bad_element: None,
        }
    }

    /// RFC 7950 section 15.2/15.3: a min-elements or max-elements
    /// constraint is violated. `too_many` selects the app-tag.
    pub fn minmax_elements(
        parent_path: impl Into<String>,
        name: &str,
        too_many: bool,
    ) -> RpcError {
        let (app_tag, msg) = if too_many {
            ("too-many-elements", "too many elements")
        } else {
            ("too-few-elements", "too few elements")
        };
        RpcError {
            error_type: "application".to_string(),
            error_tag: "operation-failed".to_string(),
            error_app_tag: app_tag.to_string(),
            error_path: format!("{}/{}", parent_path.into(), name),
            error_message: Some(msg.to_string()),
            non_unique: Vec::new(),
            bad_element: Some(name.to_string()),
        }
    }

    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    pub fn tag(&self) -> &str {
        &self.error_tag
    }

    pub fn app_tag(&self) -> &str {
        &self.error_app_tag
    }

    pub fn path(&self) -> &str {
        &self.error_path
    }

    pub fn message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn non_unique(&self) -> &[(String, String)] {
        &self.non_unique
    }

    pub fn bad_element(&self) -> Option<&str> {
        self.bad_element.as_deref()
    }

    /// Render the error as an `rpc-error` XML fragment.
    pub fn to_tree(&self) -> DataTree {
        let mut tree = DataTree::new("rpc-error");
        let root = tree.root();
        tree.add_namespace(root, None, NETCONF_BASE_NAMESPACE);

        let etype = tree.new_element(root, "error-type");
        tree.set_body(etype, &self.error_type);
        let etag = tree.new_element(root, "error-tag");
        tree.set_body(etag, &self.error_tag);
        let eapp = tree.new_element(root, "error-app-tag");
        tree.set_body(eapp, &self.error_app_tag);
        let epath = tree.new_element(root, "error-path");
        tree.set_body(epath, &self.error_path);
        if let Some(msg) = &self.error_message {
            let emsg = tree.new_element(root, "error-message");
            tree.set_body(emsg, msg);
        }
        if !self.non_unique.is_empty() || self.bad_element.is_some() {
            let einfo = tree.new_element(root, "error-info");
            for (name, _) in &self.non_unique {
                let elem = tree.new_element(einfo, "non-unique");
                tree.set_body(elem, name);
            }
            if let Some(name) = &self.bad_element {
                let elem = tree.new_element(einfo, "bad-element");
                tree.set_body(elem, name);
            }
        }
        tree
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.to_tree().print_string(PrintFlags::empty())
        )
    }
}
