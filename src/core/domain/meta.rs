//! Object identity and metadata.
//!
//! Mirrors the subset of cluster object metadata the convergence loop needs:
//! identity, uid, labels, annotations and owner references.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::constants;
use crate::error::ValidationError;

/// Identity of a namespaced resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ResourceId {
    type Err = ValidationError;

    /// Parse `namespace/name`, or a bare `name` in the default namespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = match s.split_once('/') {
            Some((ns, name)) => (ns, name),
            None => (constants::DEFAULT_NAMESPACE, s),
        };

        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ValidationError::InvalidResourceId(s.to_string()));
        }

        validate_name(namespace)?;
        validate_name(name)?;
        Ok(Self::new(namespace, name))
    }
}

/// Validate a resource or namespace name.
///
/// Names follow DNS subdomain rules: lowercase alphanumerics, `-` and `.`,
/// starting and ending with an alphanumeric, at most 253 characters.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > 253 {
        return Err(ValidationError::InvalidName(
            name.to_string(),
            "must be 1-253 characters",
        ));
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    if !valid_chars {
        return Err(ValidationError::InvalidName(
            name.to_string(),
            "only lowercase alphanumerics, '-' and '.' are allowed",
        ));
    }

    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !alnum(name.chars().next()) || !alnum(name.chars().last()) {
        return Err(ValidationError::InvalidName(
            name.to_string(),
            "must start and end with an alphanumeric character",
        ));
    }

    Ok(())
}

/// Link from a dependent object back to the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub controller: bool,
}

/// Object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

fn default_namespace() -> String {
    constants::DEFAULT_NAMESPACE.to_string()
}

impl ObjectMeta {
    pub fn new(id: &ResourceId) -> Self {
        Self {
            name: id.name.clone(),
            namespace: id.namespace.clone(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.namespace, &self.name)
    }

    /// Annotation value, if set.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Make `owner` the controlling owner of this object.
    ///
    /// Replaces any existing reference to the same owner uid and clears the
    /// controller flag on other references.
    ///
    /// # Errors
    ///
    /// Fails when the owner has no uid yet or lives in another namespace;
    /// namespaced owners can only own objects in their own namespace.
    pub fn set_controller(
        &mut self,
        owner: &ObjectMeta,
        api_version: &str,
        kind: &str,
    ) -> Result<(), ValidationError> {
        let uid = owner.uid.clone().ok_or_else(|| {
            ValidationError::OwnerReference(format!("{} {} has no uid", kind, owner.id()))
        })?;

        if owner.namespace != self.namespace {
            return Err(ValidationError::OwnerReference(format!(
                "cross-namespace owner references are disallowed, owner's namespace {}, obj's namespace {}",
                owner.namespace, self.namespace
            )));
        }

        self.owner_references.retain(|r| r.uid != uid);
        for existing in &mut self.owner_references {
            existing.controller = false;
        }
        self.owner_references.push(OwnerReference {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: owner.name.clone(),
            uid,
            controller: true,
        });

        Ok(())
    }
}
