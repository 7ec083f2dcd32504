//! CLI command definitions and execution
//!
//! Every command parses its selector, opens a [`Session`] against the chosen
//! alias and hands the traversal to sos-core. Errors come back here to be
//! reported once and turned into an exit code.

use clap::{Parser, Subcommand};
use sos_core::{CancelSignal, Config, ConfigManager, ListOptions, Result};
use sos_s3::S3Client;
use tracing::debug;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod ls;
mod meta;
mod rm;

/// sos - browse and edit objects on S3-compatible storage
///
/// Lists buckets as directory trees, rewrites object headers and metadata
/// in place without losing ACLs, and removes objects by prefix.
#[derive(Parser, Debug)]
#[command(name = "sos")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Alias to connect with (defaults.alias, or the only configured one)
    #[arg(long, global = true, env = "SOS_ALIAS")]
    pub alias: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List objects and directories under a prefix
    Ls(ls::LsArgs),

    /// Rewrite object headers and metadata in place, keeping ACLs
    Meta(meta::MetaArgs),

    /// Remove objects
    Rm(rm::RmArgs),
}

/// What every command gets: the loaded config, the alias choice and a formatter
pub struct Context {
    pub config: Config,
    pub alias: Option<String>,
    pub formatter: Formatter,
}

/// A connected client plus the listing options derived from config
pub struct Session {
    pub client: S3Client,
    pub options: ListOptions,
}

impl Context {
    /// Connect to the selected alias and arm Ctrl+C cancellation
    pub async fn session(&self) -> Result<Session> {
        let alias = self.config.alias(self.alias.as_deref())?;
        let client = S3Client::new(alias).await?;

        let cancel = CancelSignal::new();
        let signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, stopping before the next page");
                signal.cancel();
            }
        });

        Ok(Session {
            client,
            options: ListOptions {
                max_keys: self.config.defaults.page_size,
                cancel: Some(cancel),
            },
        })
    }
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let mut output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    let config = match ConfigManager::new().and_then(|manager| manager.load()) {
        Ok(config) => config,
        Err(e) => {
            Formatter::new(output_config).failure(&e);
            return ExitCode::from(&e);
        }
    };
    output_config.json |= config.defaults.output == "json";

    let ctx = Context {
        config,
        alias: cli.alias,
        formatter: Formatter::new(output_config),
    };

    let result = match cli.command {
        Commands::Ls(args) => ls::execute(args, &ctx).await,
        Commands::Meta(args) => meta::execute(args, &ctx).await,
        Commands::Rm(args) => rm::execute(args, &ctx).await,
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            ctx.formatter.failure(&e);
            ExitCode::from(&e)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use sos_core::{
        Acl, CopyPlan, Error, ListPage, ListRequest, ObjectMeta, ObjectRecord, ObjectStore,
    };

    use super::*;

    /// In-memory bucket serving single-page listings
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub objects: Mutex<BTreeMap<String, u64>>,
        pub copies: Mutex<Vec<CopyPlan>>,
        /// Copies and deletes of this key fail
        pub fail_key: Option<String>,
    }

    impl MemoryStore {
        pub fn with_keys(keys: &[&str]) -> Self {
            let store = Self::default();
            store
                .objects
                .lock()
                .unwrap()
                .extend(keys.iter().map(|k| (k.to_string(), k.len() as u64)));
            store
        }

        pub fn failing_on(mut self, key: &str) -> Self {
            self.fail_key = Some(key.to_string());
            self
        }

        fn check(&self, key: &str) -> Result<()> {
            match &self.fail_key {
                Some(fail) if fail == key => Err(Error::Network(format!("503 SlowDown: {key}"))),
                _ => Ok(()),
            }
        }

        pub fn keys(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn list_page(&self, request: &ListRequest) -> Result<ListPage> {
            let mut page = ListPage::default();
            for (key, size) in self.objects.lock().unwrap().iter() {
                let Some(rest) = key.strip_prefix(&request.prefix) else {
                    continue;
                };
                match request
                    .delimiter
                    .as_deref()
                    .and_then(|d| rest.find(d).map(|i| (d, i)))
                {
                    Some((d, i)) => {
                        let prefix = format!("{}{}{d}", request.prefix, &rest[..i]);
                        if !page.common_prefixes.contains(&prefix) {
                            page.common_prefixes.push(prefix);
                        }
                    }
                    None => page.objects.push(ObjectRecord::new(key.clone(), *size)),
                }
            }
            Ok(page)
        }

        async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
            let objects = self.objects.lock().unwrap();
            let size = objects
                .get(key)
                .ok_or_else(|| Error::NotFound(format!("{bucket}/{key}")))?;
            Ok(ObjectMeta {
                size: *size,
                ..Default::default()
            })
        }

        async fn get_object_acl(&self, _bucket: &str, _key: &str) -> Result<Acl> {
            Ok(Acl::default())
        }

        async fn copy_object(&self, plan: &CopyPlan) -> Result<()> {
            self.check(&plan.key)?;
            self.copies.lock().unwrap().push(plan.clone());
            Ok(())
        }

        async fn delete_object(&self, _bucket: &str, key: &str) -> Result<()> {
            self.check(key)?;
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sos", "ls", "bucket/dir/", "--json", "--alias", "gva"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.alias.as_deref(), Some("gva"));
        assert!(matches!(cli.command, Commands::Ls(_)));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["sos"]).is_err());
    }
}
