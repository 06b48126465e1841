//! Core type definitions for s3console
//!
//! Everything here is a read-only projection of the object store's state,
//! shaped the way the web console consumes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scoped object-store credentials for a single request
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Access key ID
    pub access_key: String,
    /// Secret access key
    pub secret_key: String,
}

impl Credentials {
    /// Create a new key pair
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// A bucket as listed by the store
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    pub creation_time: Option<DateTime<Utc>>,
}

/// One entry of an object listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Full object key
    pub name: String,
    pub size: i64,
    pub owner_id: String,
    pub owner_name: String,
    pub storage_class: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a delimiter-based object listing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectList {
    pub key_count: i64,
    /// Cursor the page was requested with
    pub start_after: String,
    pub is_truncated: bool,
    pub objects: Vec<ObjectSummary>,
    /// Common prefixes under the requested prefix
    pub directories: Vec<String>,
    /// Cursor for the following page, set only when the page is truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_start_after: Option<String>,
}

impl ObjectList {
    /// Cursor that resumes the listing after this page.
    ///
    /// `None` unless the page is truncated. A trailing directory is extended
    /// with the highest code point so the next page skips every key under it.
    #[must_use]
    pub fn next_cursor(&self) -> Option<String> {
        if !self.is_truncated {
            return None;
        }
        let last_object = self.objects.last().map(|o| o.name.as_str());
        let last_dir = self.directories.last().map(String::as_str);
        match (last_object, last_dir) {
            (Some(o), Some(d)) if o > d => Some(o.to_string()),
            (_, Some(d)) => Some(format!("{d}{}", char::MAX)),
            (Some(o), None) => Some(o.to_string()),
            (None, None) => None,
        }
    }
}

/// Owner of a bucket or object, AWS field naming
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Owner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Grantee of an ACL grant
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Grantee {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// CanonicalUser, AmazonCustomerByEmail or Group
    #[serde(rename = "Type")]
    pub grantee_type: String,
    #[serde(rename = "URI", skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// A single ACL grant
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: String,
}

/// Access control policy as returned by the store
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessControlPolicy {
    pub owner: Owner,
    pub grants: Vec<Grant>,
}

/// Canned ACLs accepted by the set-ACL operations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CannedAcl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    AwsExecRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl CannedAcl {
    /// Header value understood by S3 (`x-amz-acl`)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
            Self::AwsExecRead => "aws-exec-read",
            Self::BucketOwnerRead => "bucket-owner-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }

    /// Whether the ACL can be applied to a bucket (the rest are object-only)
    #[must_use]
    pub const fn applies_to_bucket(&self) -> bool {
        matches!(
            self,
            Self::Private | Self::PublicRead | Self::PublicReadWrite | Self::AuthenticatedRead
        )
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown canned ACL name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown canned acl: {0}")]
pub struct ParseCannedAclError(pub String);

impl FromStr for CannedAcl {
    type Err = ParseCannedAclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            "public-read-write" => Ok(Self::PublicReadWrite),
            "authenticated-read" => Ok(Self::AuthenticatedRead),
            "aws-exec-read" => Ok(Self::AwsExecRead),
            "bucket-owner-read" => Ok(Self::BucketOwnerRead),
            "bucket-owner-full-control" => Ok(Self::BucketOwnerFullControl),
            other => Err(ParseCannedAclError(other.to_string())),
        }
    }
}
