//! In-place copy with overridden metadata
//!
//! A copy onto itself is the only way to change the headers or user metadata
//! of an existing object, and the backend resets the object ACL on every
//! copy. [`copy_in_place`] reads headers, metadata and ACL first, then issues
//! a REPLACE copy carrying them forward with the caller's changes and the
//! captured grants.
//!
//! The three round trips are not atomic. An object changed by someone else
//! between the ACL read and the copy is not detected.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use jiff::Timestamp;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::traits::{
    Acl, CopyPlan, Grant, Grantee, ObjectHeaders, ObjectMeta, ObjectRecord, ObjectStore,
    Permission,
};
use crate::walk::ObjectVisitor;

/// A header preserved across an in-place copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    CacheControl,
    ContentDisposition,
    ContentEncoding,
    ContentLanguage,
    ContentType,
    Expires,
}

impl Header {
    pub const ALL: [Header; 6] = [
        Header::CacheControl,
        Header::ContentDisposition,
        Header::ContentEncoding,
        Header::ContentLanguage,
        Header::ContentType,
        Header::Expires,
    ];

    /// HTTP header name
    pub const fn as_str(self) -> &'static str {
        match self {
            Header::CacheControl => "Cache-Control",
            Header::ContentDisposition => "Content-Disposition",
            Header::ContentEncoding => "Content-Encoding",
            Header::ContentLanguage => "Content-Language",
            Header::ContentType => "Content-Type",
            Header::Expires => "Expires",
        }
    }

    fn clear(self, headers: &mut ObjectHeaders) {
        match self {
            Header::CacheControl => headers.cache_control = None,
            Header::ContentDisposition => headers.content_disposition = None,
            Header::ContentEncoding => headers.content_encoding = None,
            Header::ContentLanguage => headers.content_language = None,
            Header::ContentType => headers.content_type = None,
            Header::Expires => headers.expires = None,
        }
    }
}

impl FromStr for Header {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Header::ALL
            .into_iter()
            .find(|h| h.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::General(format!(
                    "Unsupported header '{s}'. Expected one of: {}",
                    Header::ALL.map(Header::as_str).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header changes requested by the caller
///
/// Headers left as `None` are carried forward from the source object.
/// A header listed in `remove` is dropped even if the source carries it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderOverrides {
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
    pub expires: Option<Timestamp>,
    pub remove: Vec<Header>,
}

impl HeaderOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, headers: &mut ObjectHeaders) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        set(&mut headers.cache_control, &self.cache_control);
        set(&mut headers.content_disposition, &self.content_disposition);
        set(&mut headers.content_encoding, &self.content_encoding);
        set(&mut headers.content_language, &self.content_language);
        set(&mut headers.content_type, &self.content_type);
        set(&mut headers.expires, &self.expires);

        for header in &self.remove {
            header.clear(headers);
        }
    }
}

/// How user metadata changes across the copy
///
/// The copy itself always sends the REPLACE directive with the resulting
/// map; these variants only decide what that map holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MetadataDirective {
    /// Carry the source metadata forward unchanged
    #[default]
    Keep,
    /// Discard the source metadata, use this map instead
    Replace(BTreeMap<String, String>),
    /// Add or overwrite these keys
    Upsert(BTreeMap<String, String>),
    /// Drop these keys
    Remove(Vec<String>),
}

impl MetadataDirective {
    pub fn apply(&self, source: BTreeMap<String, String>) -> BTreeMap<String, String> {
        match self {
            MetadataDirective::Keep => source,
            MetadataDirective::Replace(map) => map.clone(),
            MetadataDirective::Upsert(map) => {
                let mut metadata = source;
                metadata.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
                metadata
            }
            MetadataDirective::Remove(keys) => {
                let mut metadata = source;
                for key in keys {
                    metadata.remove(key);
                }
                metadata
            }
        }
    }
}

/// `x-amz-copy-source` value naming `bucket/key`
///
/// The backend percent-decodes this header, so the key is encoded. The
/// bucket and the separating slash stay as they are.
fn copy_source(bucket: &str, key: &str) -> String {
    format!("{bucket}/{}", urlencoding::encode(key))
}

/// Build the copy request from a fresh read of the object
pub fn build_plan(
    bucket: &str,
    key: &str,
    source: ObjectMeta,
    acl: Acl,
    headers: &HeaderOverrides,
    directive: &MetadataDirective,
) -> CopyPlan {
    let mut carried = source.headers;
    headers.apply(&mut carried);

    CopyPlan {
        bucket: bucket.to_string(),
        key: key.to_string(),
        copy_source: copy_source(bucket, key),
        metadata: directive.apply(source.metadata),
        headers: carried,
        acl,
    }
}

/// Copy an object onto itself with new headers or metadata, keeping its ACL
///
/// Fails with `SourceFetchFailed` or `AclFetchFailed` before anything is
/// written, or with `CopyFailed` if the copy request fails. Never retries.
pub async fn copy_in_place<S>(
    store: &S,
    bucket: &str,
    key: &str,
    headers: &HeaderOverrides,
    directive: &MetadataDirective,
) -> Result<CopyPlan>
where
    S: ObjectStore + ?Sized,
{
    let source = store
        .head_object(bucket, key)
        .await
        .map_err(|e| Error::SourceFetchFailed {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: Box::new(e),
        })?;

    let acl = store
        .get_object_acl(bucket, key)
        .await
        .map_err(|e| Error::AclFetchFailed {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: Box::new(e),
        })?;

    let plan = build_plan(bucket, key, source, acl, headers, directive);

    store
        .copy_object(&plan)
        .await
        .map_err(|e| Error::CopyFailed {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: Box::new(e),
        })?;

    info!(
        bucket,
        key,
        grants = plan.acl.grants.len(),
        metadata_keys = plan.metadata.len(),
        "copied in place"
    );

    Ok(plan)
}

/// Grant header values for a copy request, one comma-joined list per permission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantHeaders {
    pub full_control: Option<String>,
    pub read: Option<String>,
    pub read_acp: Option<String>,
    pub write_acp: Option<String>,
}

impl GrantHeaders {
    /// Translate captured grants into `x-amz-grant-*` values
    ///
    /// WRITE has no meaning on an object and no copy header; such grants are
    /// dropped with a warning.
    pub fn from_acl(acl: &Acl) -> Self {
        let mut headers = Self::default();

        for Grant {
            grantee,
            permission,
        } in &acl.grants
        {
            let slot = match permission {
                Permission::FullControl => &mut headers.full_control,
                Permission::Read => &mut headers.read,
                Permission::ReadAcp => &mut headers.read_acp,
                Permission::WriteAcp => &mut headers.write_acp,
                Permission::Write => {
                    warn!(?grantee, "dropping WRITE grant, not applicable to objects");
                    continue;
                }
            };

            let value = grantee_header(grantee);
            match slot {
                Some(existing) => {
                    existing.push_str(", ");
                    existing.push_str(&value);
                }
                None => *slot = Some(value),
            }
        }

        headers
    }
}

fn grantee_header(grantee: &Grantee) -> String {
    match grantee {
        Grantee::CanonicalUser { id, .. } => format!("id=\"{id}\""),
        Grantee::Email { address } => format!("emailAddress=\"{address}\""),
        Grantee::Group { uri } => format!("uri=\"{uri}\""),
    }
}

/// Walk visitor applying the same in-place copy to every visited object
pub struct CopyInPlace<'a, S: ?Sized> {
    store: &'a S,
    bucket: String,
    headers: HeaderOverrides,
    directive: MetadataDirective,
    plans: Vec<CopyPlan>,
}

impl<'a, S> CopyInPlace<'a, S>
where
    S: ObjectStore + ?Sized,
{
    pub fn new(
        store: &'a S,
        bucket: impl Into<String>,
        headers: HeaderOverrides,
        directive: MetadataDirective,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            headers,
            directive,
            plans: Vec::new(),
        }
    }

    /// Plans of the copies issued so far
    pub fn plans(&self) -> &[CopyPlan] {
        &self.plans
    }

    pub fn into_plans(self) -> Vec<CopyPlan> {
        self.plans
    }
}

#[async_trait]
impl<'a, S> ObjectVisitor for CopyInPlace<'a, S>
where
    S: ObjectStore + ?Sized,
{
    async fn visit(&mut self, object: &ObjectRecord) -> Result<()> {
        let plan = copy_in_place(
            self.store,
            &self.bucket,
            &object.key,
            &self.headers,
            &self.directive,
        )
        .await?;
        self.plans.push(plan);
        Ok(())
    }
}
