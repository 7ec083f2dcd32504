//! rm command - Remove objects
//!
//! Removes the objects a selector names. Without `--recursive` only the
//! immediate level of a prefix is touched.

use async_trait::async_trait;
use clap::Args;
use serde::Serialize;
use sos_core::{
    ListOptions, ObjectRecord, ObjectStore, ObjectVisitor, Result, Selector, WalkSummary, walk,
};
use tracing::debug;

use super::Context;

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Selector: [sos://]BUCKET/KEY or [sos://]BUCKET/PREFIX/
    pub path: String,

    /// Remove every object below the prefix
    #[arg(short, long)]
    pub recursive: bool,

    /// Only show what would be deleted (dry run)
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    dry_run: bool,
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped_directories: Vec<String>,
    total: usize,
}

/// Walk visitor deleting every visited object
struct Remove<'a, S: ?Sized> {
    store: &'a S,
    bucket: &'a str,
    dry_run: bool,
    removed: Vec<String>,
}

#[async_trait]
impl<'a, S> ObjectVisitor for Remove<'a, S>
where
    S: ObjectStore + ?Sized,
{
    async fn visit(&mut self, object: &ObjectRecord) -> Result<()> {
        if !self.dry_run {
            self.store.delete_object(self.bucket, &object.key).await?;
            debug!(bucket = self.bucket, key = %object.key, "removed");
        }
        self.removed.push(object.key.clone());
        Ok(())
    }
}

/// Execute the rm command
pub async fn execute(args: RmArgs, ctx: &Context) -> Result<()> {
    let selector = Selector::parse(&args.path, args.recursive)?;
    let session = ctx.session().await?;

    let (deleted, outcome) =
        remove(&session.client, &selector, &session.options, args.dry_run).await;

    let formatter = &ctx.formatter;
    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            // Deletes issued before the failure are not undone.
            if formatter.is_json() {
                formatter.json(&RmOutput {
                    status: "partial",
                    dry_run: args.dry_run,
                    total: deleted.len(),
                    deleted,
                    skipped_directories: Vec::new(),
                });
            } else if !deleted.is_empty() {
                for key in &deleted {
                    formatter.println(&format!("Removed: {}/{key}", selector.bucket));
                }
                formatter.warning(&format!(
                    "Removed {} object(s) before the failure.",
                    deleted.len()
                ));
            }
            return Err(e);
        }
    };

    if formatter.is_json() {
        formatter.json(&RmOutput {
            status: "success",
            dry_run: args.dry_run,
            total: deleted.len(),
            deleted,
            skipped_directories: summary.directories,
        });
        return Ok(());
    }

    let verb = if args.dry_run { "Would remove" } else { "Removed" };
    for key in &deleted {
        formatter.println(&format!("{verb}: {}/{key}", selector.bucket));
    }
    for dir in &summary.directories {
        formatter.warning(&format!("Skipped directory {dir} (use --recursive)"));
    }
    if deleted.is_empty() {
        formatter.warning(&format!("No objects matched {selector}"));
    } else if !args.dry_run {
        formatter.success(&format!("Removed {} object(s).", deleted.len()));
    }
    Ok(())
}

/// Delete every selected object; keys removed so far come back even when the walk fails
async fn remove<S>(
    store: &S,
    selector: &Selector,
    options: &ListOptions,
    dry_run: bool,
) -> (Vec<String>, Result<WalkSummary>)
where
    S: ObjectStore + ?Sized,
{
    let mut visitor = Remove {
        store,
        bucket: &selector.bucket,
        dry_run,
        removed: Vec::new(),
    };
    let outcome = walk(store, selector, options, &mut visitor).await;
    (visitor.removed, outcome)
}
