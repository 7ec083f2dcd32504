//! meta command - Rewrite headers and user metadata in place
//!
//! Each selected object is copied onto itself with the requested changes.
//! Its ACL is read first and reapplied by the copy.

use std::collections::BTreeMap;

use clap::{ArgGroup, Args};
use jiff::Timestamp;
use serde::Serialize;
use sos_core::{
    CopyInPlace, Header, HeaderOverrides, ListOptions, MetadataDirective, ObjectStore, Result,
    Selector, WalkSummary, walk,
};

use super::Context;

/// Rewrite object headers and metadata
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("change")
        .required(true)
        .multiple(true)
        .args([
            "set",
            "remove",
            "replace",
            "cache_control",
            "content_disposition",
            "content_encoding",
            "content_language",
            "content_type",
            "expires",
            "unset",
        ])
))]
pub struct MetaArgs {
    /// Selector: [sos://]BUCKET/KEY or [sos://]BUCKET/PREFIX/
    pub path: String,

    /// Apply to every object below the prefix
    #[arg(short, long)]
    pub recursive: bool,

    /// Add or overwrite a user metadata entry
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_pair)]
    pub set: Vec<(String, String)>,

    /// Drop a user metadata entry
    #[arg(long, value_name = "KEY", conflicts_with_all = ["set", "replace"])]
    pub remove: Vec<String>,

    /// Discard existing user metadata; only --set entries remain
    #[arg(long)]
    pub replace: bool,

    #[arg(long, value_name = "VALUE")]
    pub cache_control: Option<String>,

    #[arg(long, value_name = "VALUE")]
    pub content_disposition: Option<String>,

    #[arg(long, value_name = "VALUE")]
    pub content_encoding: Option<String>,

    #[arg(long, value_name = "VALUE")]
    pub content_language: Option<String>,

    #[arg(long, value_name = "VALUE")]
    pub content_type: Option<String>,

    /// Expiry as an RFC 3339 timestamp
    #[arg(long, value_name = "RFC3339")]
    pub expires: Option<Timestamp>,

    /// Drop a header the object currently carries
    #[arg(long, value_name = "HEADER", value_parser = parse_header)]
    pub unset: Vec<Header>,
}

impl MetaArgs {
    fn overrides(&self) -> HeaderOverrides {
        HeaderOverrides {
            cache_control: self.cache_control.clone(),
            content_disposition: self.content_disposition.clone(),
            content_encoding: self.content_encoding.clone(),
            content_language: self.content_language.clone(),
            content_type: self.content_type.clone(),
            expires: self.expires,
            remove: self.unset.clone(),
        }
    }

    fn directive(&self) -> MetadataDirective {
        let set: BTreeMap<String, String> = self.set.iter().cloned().collect();
        if self.replace {
            MetadataDirective::Replace(set)
        } else if !set.is_empty() {
            MetadataDirective::Upsert(set)
        } else if !self.remove.is_empty() {
            MetadataDirective::Remove(self.remove.clone())
        } else {
            MetadataDirective::Keep
        }
    }
}

#[derive(Debug, Serialize)]
struct MetaOutput {
    status: &'static str,
    updated: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped_directories: Vec<String>,
}

/// Execute the meta command
pub async fn execute(args: MetaArgs, ctx: &Context) -> Result<()> {
    let selector = Selector::parse(&args.path, args.recursive)?;
    let session = ctx.session().await?;

    let (updated, outcome) = apply(
        &session.client,
        &selector,
        &session.options,
        args.overrides(),
        args.directive(),
    )
    .await;

    let formatter = &ctx.formatter;
    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            // Copies issued before the failure stay applied.
            if formatter.is_json() {
                formatter.json(&MetaOutput {
                    status: "partial",
                    updated,
                    skipped_directories: Vec::new(),
                });
            } else if !updated.is_empty() {
                for key in &updated {
                    formatter.println(&format!("Updated: {}/{key}", selector.bucket));
                }
                formatter.warning(&format!(
                    "Updated {} object(s) before the failure.",
                    updated.len()
                ));
            }
            return Err(e);
        }
    };

    if formatter.is_json() {
        formatter.json(&MetaOutput {
            status: "success",
            updated,
            skipped_directories: summary.directories,
        });
        return Ok(());
    }

    for key in &updated {
        formatter.println(&format!("Updated: {}/{key}", selector.bucket));
    }
    for dir in &summary.directories {
        formatter.warning(&format!("Skipped directory {dir} (use --recursive)"));
    }
    if updated.is_empty() {
        formatter.warning(&format!("No objects matched {selector}"));
    } else {
        formatter.success(&format!("Updated {} object(s).", updated.len()));
    }
    Ok(())
}

/// Copy every selected object in place
///
/// Returns the keys copied so far alongside the walk outcome, so a failed
/// walk still reports what it changed.
async fn apply<S>(
    store: &S,
    selector: &Selector,
    options: &ListOptions,
    overrides: HeaderOverrides,
    directive: MetadataDirective,
) -> (Vec<String>, Result<WalkSummary>)
where
    S: ObjectStore + ?Sized,
{
    let mut visitor = CopyInPlace::new(store, &selector.bucket, overrides, directive);
    let outcome = walk(store, selector, options, &mut visitor).await;
    let updated = visitor.into_plans().into_iter().map(|p| p.key).collect();
    (updated, outcome)
}

fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn parse_header(s: &str) -> std::result::Result<Header, String> {
    s.parse::<Header>().map_err(|e| e.to_string())
}
