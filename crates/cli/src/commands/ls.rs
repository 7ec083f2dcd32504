//! ls command - List objects and directories
//!
//! Buffered by default: directories first, then objects. With `--stream`
//! each key is printed the moment its page arrives.

use clap::Args;
use serde::Serialize;
use sos_core::{
    ListOptions, ListSummary, ObjectStore, Record, Result, Selector, Streaming, list_buffered,
    list_objects,
};

use super::Context;
use crate::output::Formatter;

/// List objects under a prefix
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Selector: [sos://]BUCKET[/PREFIX]
    pub path: String,

    /// List recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Print keys as they arrive instead of buffering the whole listing
    #[arg(short, long)]
    pub stream: bool,

    /// Show totals after the listing
    #[arg(long)]
    pub summarize: bool,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    items: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    pages: usize,
    total_objects: usize,
    total_directories: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

impl From<ListSummary> for Summary {
    fn from(summary: ListSummary) -> Self {
        Self {
            pages: summary.pages,
            total_objects: summary.objects,
            total_directories: summary.directories,
            total_size_bytes: summary.total_size_bytes,
            total_size_human: humansize::format_size(summary.total_size_bytes, humansize::BINARY),
        }
    }
}

/// Execute the ls command
pub async fn execute(args: LsArgs, ctx: &Context) -> Result<()> {
    let selector = Selector::parse(&args.path, args.recursive)?;
    let session = ctx.session().await?;

    if args.stream {
        let summary = stream(&session.client, &selector, &session.options, &ctx.formatter).await?;
        if args.summarize {
            print_summary(&ctx.formatter, summary.into());
        }
        return Ok(());
    }

    let (items, summary) = list_buffered(&session.client, &selector, &session.options).await?;
    let summary = args.summarize.then(|| Summary::from(summary));

    if ctx.formatter.is_json() {
        ctx.formatter.json(&LsOutput { items, summary });
        return Ok(());
    }

    for record in &items {
        ctx.formatter.println(&line(record));
    }
    if let Some(summary) = summary {
        print_summary(&ctx.formatter, summary);
    }
    Ok(())
}

async fn stream<S>(
    store: &S,
    selector: &Selector,
    options: &ListOptions,
    formatter: &Formatter,
) -> Result<ListSummary>
where
    S: ObjectStore + ?Sized,
{
    let mut sink = Streaming::new(|record: Record| {
        if formatter.is_json() {
            formatter.json_line(&record);
        } else {
            formatter.println(record.name());
        }
        Ok(())
    });
    list_objects(store, selector, options, &mut sink).await
}

fn print_summary(formatter: &Formatter, summary: Summary) {
    if formatter.is_json() {
        formatter.json_line(&summary);
    } else {
        formatter.println(&format!(
            "\nTotal: {} objects, {} directories, {}",
            summary.total_objects, summary.total_directories, summary.total_size_human
        ));
    }
}

/// One human-readable listing line
fn line(record: &Record) -> String {
    match record {
        Record::Directory(dir) => format!("{:19} {:>10} {}", "", "DIR", dir.prefix),
        Record::Object(object) => {
            let date = object
                .last_modified
                .map(|d| d.strftime("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| " ".repeat(19));
            let size = humansize::format_size(object.size, humansize::BINARY);
            format!("{date} {size:>10} {}", object.key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::MemoryStore;
    use sos_core::{DirectoryRecord, ObjectRecord};

    #[test]
    fn test_directory_line() {
        let line = line(&Record::Directory(DirectoryRecord::new("photos/")));
        assert!(line.ends_with("DIR photos/"));
        assert!(line.starts_with(&" ".repeat(19)));
    }

    #[test]
    fn test_object_line() {
        let object = ObjectRecord {
            key: "photos/cat.jpg".into(),
            size: 2048,
            last_modified: Some(jiff::Timestamp::from_second(0).unwrap()),
        };
        let line = line(&Record::Object(object));
        assert!(line.starts_with("1970-01-01 00:00:00"));
        assert!(line.contains("2 KiB"));
        assert!(line.ends_with("photos/cat.jpg"));
    }

    #[test]
    fn test_summary_from_list_summary() {
        let summary = Summary::from(ListSummary {
            pages: 2,
            objects: 3,
            directories: 1,
            total_size_bytes: 1024,
        });
        assert_eq!(summary.total_objects, 3);
        assert_eq!(summary.total_size_human, "1 KiB");
    }

    #[test]
    fn test_ls_args_stream_flag() {
        use clap::Parser;
        let cli =
            crate::commands::Cli::try_parse_from(["sos", "ls", "-r", "-s", "sos://b/p/"]).unwrap();
        match cli.command {
            crate::commands::Commands::Ls(args) => {
                assert!(args.recursive);
                assert!(args.stream);
                assert_eq!(args.path, "sos://b/p/");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_counts_what_it_prints() {
        let store = MemoryStore::with_keys(&["a/x", "a/y", "b/z", "c"]);
        let formatter = Formatter::new(crate::output::OutputConfig {
            quiet: true,
            ..Default::default()
        });

        let summary = stream(
            &store,
            &Selector::new("b", "", false),
            &ListOptions::default(),
            &formatter,
        )
        .await
        .unwrap();
        assert_eq!(summary.directories, 2);
        assert_eq!(summary.objects, 1);
    }

    #[tokio::test]
    async fn test_buffered_listing_puts_directories_first() {
        let store = MemoryStore::with_keys(&["a/x", "c", "b/z"]);
        let (items, _) = list_buffered(
            &store,
            &Selector::new("b", "", false),
            &ListOptions::default(),
        )
        .await
        .unwrap();

        let names: Vec<_> = items.iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["a/", "b/", "c"]);
    }
}
