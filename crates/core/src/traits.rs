//! ObjectStore trait definition
//!
//! This trait defines the backend protocol the listing and copy engine drives.
//! It keeps the engine decoupled from the S3 SDK and can be mocked for testing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An object listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Object key
    pub key: String,

    /// Size in bytes
    pub size: u64,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl ObjectRecord {
    /// Create a new ObjectRecord without a timestamp
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
        }
    }
}

/// A key prefix ending in the delimiter, presented as a directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub prefix: String,
}

impl DirectoryRecord {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

/// A listing result handed to the formatter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Object(ObjectRecord),
    Directory(DirectoryRecord),
}

impl Record {
    /// Key of an object, prefix of a directory
    pub fn name(&self) -> &str {
        match self {
            Record::Object(o) => &o.key,
            Record::Directory(d) => &d.prefix,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Record::Directory(_))
    }
}

/// One ListObjectsV2-style request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub bucket: String,

    /// Prefix to filter by (empty for the bucket root)
    pub prefix: String,

    /// Delimiter for grouping; `None` enumerates every key
    pub delimiter: Option<String>,

    /// Continuation token from the previous page
    pub continuation_token: Option<String>,

    /// Maximum number of keys to return per request
    pub max_keys: Option<i32>,
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ObjectRecord>,

    /// Common prefixes, only present when a delimiter was requested
    pub common_prefixes: Vec<String>,

    pub next_continuation_token: Option<String>,

    /// Whether more pages follow
    pub is_truncated: bool,
}

/// The HTTP headers carried by an object and preserved across a copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHeaders {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<Timestamp>,
}

/// Headers and user metadata of an object, as returned by a HEAD request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub headers: ObjectHeaders,
    pub metadata: BTreeMap<String, String>,
    pub size: u64,
    pub last_modified: Option<Timestamp>,
}

/// Who a grant applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Grantee {
    /// Canonical user id
    CanonicalUser {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
    },
    /// Account e-mail address
    Email { address: String },
    /// Predefined group URI
    Group { uri: String },
}

/// Object ACL permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    FullControl,
    Read,
    ReadAcp,
    Write,
    WriteAcp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: Permission,
}

/// Access control list of an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Grants in backend order
    pub grants: Vec<Grant>,
}

/// An in-place copy request, built from a fresh read of the object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyPlan {
    pub bucket: String,
    pub key: String,

    /// `bucket/key`; always the destination itself
    pub copy_source: String,

    /// Replacement user metadata; sent with the REPLACE directive
    pub metadata: BTreeMap<String, String>,

    pub headers: ObjectHeaders,

    /// ACL captured before the copy, reapplied by it
    pub acl: Acl,
}

/// Trait for S3-compatible storage operations
///
/// This trait is implemented by the S3 adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of a listing
    async fn list_page(&self, request: &ListRequest) -> Result<ListPage>;

    /// Get object headers and user metadata
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta>;

    /// Get object ACL
    async fn get_object_acl(&self, bucket: &str, key: &str) -> Result<Acl>;

    /// Copy an object with the REPLACE metadata directive and explicit grants
    async fn copy_object(&self, plan: &CopyPlan) -> Result<()>;

    /// Delete an object
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}
