//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from sos-core.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_smithy_types::DateTime;
use aws_smithy_types::date_time::Format;
use tracing::debug;

use sos_core::{
    Acl, Alias, CopyPlan, Error, Grant, GrantHeaders, Grantee, ListPage, ListRequest, ObjectHeaders,
    ObjectMeta, ObjectRecord, ObjectStore, Permission, Result,
};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from an alias configuration
    pub async fn new(alias: &Alias) -> Result<Self> {
        alias.validate()?;

        let credentials = aws_credential_types::Credentials::new(
            alias.access_key.clone(),
            alias.secret_key.clone(),
            None, // session token
            None, // expiry
            "sos-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(alias.region.clone()))
            .endpoint_url(&alias.endpoint)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(alias.path_style())
            .build();

        debug!(alias = %alias.name, endpoint = %alias.endpoint, "S3 client ready");

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_page(&self, request: &ListRequest) -> Result<ListPage> {
        let response = self
            .inner
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix((!request.prefix.is_empty()).then(|| request.prefix.clone()))
            .set_delimiter(request.delimiter.clone())
            .set_continuation_token(request.continuation_token.clone())
            .set_max_keys(request.max_keys)
            .send()
            .await
            .map_err(|e| sdk_error(e, &request.bucket))?;

        let objects = response
            .contents()
            .iter()
            .map(|object| ObjectRecord {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or(0).max(0) as u64,
                last_modified: object.last_modified().and_then(timestamp),
            })
            .collect();

        let common_prefixes = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect();

        Ok(ListPage {
            objects,
            common_prefixes,
            next_continuation_token: response.next_continuation_token().map(str::to_string),
            is_truncated: response.is_truncated().unwrap_or(false),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
        let response = self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(e, &format!("{bucket}/{key}")))?;

        let headers = ObjectHeaders {
            cache_control: response.cache_control().map(str::to_string),
            content_disposition: response.content_disposition().map(str::to_string),
            content_encoding: response.content_encoding().map(str::to_string),
            content_language: response.content_language().map(str::to_string),
            content_type: response.content_type().map(str::to_string),
            expires: response.expires_string().and_then(parse_expires),
        };

        let metadata: BTreeMap<String, String> = response
            .metadata()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Ok(ObjectMeta {
            headers,
            metadata,
            size: response.content_length().unwrap_or(0).max(0) as u64,
            last_modified: response.last_modified().and_then(timestamp),
        })
    }

    async fn get_object_acl(&self, bucket: &str, key: &str) -> Result<Acl> {
        let response = self
            .inner
            .get_object_acl()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(e, &format!("{bucket}/{key}")))?;

        let mut grants = Vec::new();
        for grant in response.grants() {
            let (Some(grantee), Some(permission)) = (grant.grantee(), grant.permission()) else {
                continue;
            };

            let grantee = grantee_from_parts(
                grantee.id(),
                grantee.display_name(),
                grantee.email_address(),
                grantee.uri(),
            );
            match (grantee, permission_from_str(permission.as_str())) {
                (Some(grantee), Some(permission)) => grants.push(Grant {
                    grantee,
                    permission,
                }),
                _ => debug!(?grant, "skipping unrecognized grant"),
            }
        }

        Ok(Acl {
            owner: response
                .owner()
                .and_then(|o| o.id())
                .map(str::to_string),
            grants,
        })
    }

    async fn copy_object(&self, plan: &CopyPlan) -> Result<()> {
        let grants = GrantHeaders::from_acl(&plan.acl);
        let headers = &plan.headers;
        let metadata: HashMap<String, String> = plan
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.inner
            .copy_object()
            .copy_source(&plan.copy_source)
            .bucket(&plan.bucket)
            .key(&plan.key)
            .metadata_directive(aws_sdk_s3::types::MetadataDirective::Replace)
            .set_metadata(Some(metadata))
            .set_cache_control(headers.cache_control.clone())
            .set_content_disposition(headers.content_disposition.clone())
            .set_content_encoding(headers.content_encoding.clone())
            .set_content_language(headers.content_language.clone())
            .set_content_type(headers.content_type.clone())
            .set_expires(headers.expires.map(|t| DateTime::from_secs(t.as_second())))
            .set_grant_full_control(grants.full_control)
            .set_grant_read(grants.read)
            .set_grant_read_acp(grants.read_acp)
            .set_grant_write_acp(grants.write_acp)
            .send()
            .await
            .map_err(|e| sdk_error(e, &format!("{}/{}", plan.bucket, plan.key)))?;

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(e, &format!("{bucket}/{key}")))?;

        Ok(())
    }
}

fn timestamp(dt: &DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(dt.secs()).ok()
}

/// Parse an `Expires` header; malformed values are dropped like the SDK does
fn parse_expires(value: &str) -> Option<jiff::Timestamp> {
    match DateTime::from_str(value, Format::HttpDate) {
        Ok(dt) => timestamp(&dt),
        Err(_) => {
            debug!(value, "ignoring unparseable Expires header");
            None
        }
    }
}

fn sdk_error<E, R>(err: SdkError<E, R>, subject: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    error_from_code(code.as_deref(), subject, message)
}

fn error_from_code(code: Option<&str>, subject: &str, message: String) -> Error {
    match code {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => Error::NotFound(subject.to_string()),
        Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
            Error::Auth(message)
        }
        _ => Error::Network(message),
    }
}

fn grantee_from_parts(
    id: Option<&str>,
    display_name: Option<&str>,
    email: Option<&str>,
    uri: Option<&str>,
) -> Option<Grantee> {
    if let Some(id) = id {
        return Some(Grantee::CanonicalUser {
            id: id.to_string(),
            display_name: display_name.map(str::to_string),
        });
    }
    if let Some(uri) = uri {
        return Some(Grantee::Group {
            uri: uri.to_string(),
        });
    }
    email.map(|address| Grantee::Email {
        address: address.to_string(),
    })
}

fn permission_from_str(value: &str) -> Option<Permission> {
    match value {
        "FULL_CONTROL" => Some(Permission::FullControl),
        "READ" => Some(Permission::Read),
        "READ_ACP" => Some(Permission::ReadAcp),
        "WRITE" => Some(Permission::Write),
        "WRITE_ACP" => Some(Permission::WriteAcp),
        _ => None,
    }
}
