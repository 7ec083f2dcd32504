//! Human-readable and JSON rendering of command results
//!
//! In JSON mode stdout carries only JSON documents and status lines are
//! suppressed; failures still go to stderr as a JSON object.

use serde::Serialize;
use sos_core::Error;

use super::OutputConfig;

/// Status line flavours, each with its own marker and ANSI color
#[derive(Debug, Clone, Copy)]
enum Status {
    Ok,
    Warn,
    Fail,
}

impl Status {
    fn marker(self) -> (&'static str, &'static str) {
        match self {
            Status::Ok => ("✓", "32"),
            Status::Warn => ("⚠", "33"),
            Status::Fail => ("✗", "31"),
        }
    }
}

/// Renders command output according to the global flags
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    /// ANSI colors only for human output with `--no-color` unset
    pub fn colors_enabled(&self) -> bool {
        !(self.config.no_color || self.config.json)
    }

    fn status_line(&self, status: Status, message: &str) -> String {
        let (marker, color) = status.marker();
        if self.colors_enabled() {
            format!("\x1b[{color}m{marker}\x1b[0m {message}")
        } else {
            format!("{marker} {message}")
        }
    }

    /// Final confirmation of a command; silent in quiet and JSON modes
    pub fn success(&self, message: &str) {
        if !self.config.quiet && !self.config.json {
            println!("{}", self.status_line(Status::Ok, message));
        }
    }

    /// Non-fatal notice on stderr; silent in quiet and JSON modes
    pub fn warning(&self, message: &str) {
        if !self.config.quiet && !self.config.json {
            eprintln!("{}", self.status_line(Status::Warn, message));
        }
    }

    /// Report a failed command. Always printed, quiet or not.
    ///
    /// JSON output carries the exit code, the cursor a listing can be
    /// resumed from and whether a copy request had already been sent.
    pub fn failure(&self, err: &Error) {
        if self.config.json {
            let body = serde_json::json!({
                "error": err.to_string(),
                "exit_code": err.exit_code(),
                "cursor": err.cursor(),
                "write_attempted": err.write_attempted(),
            });
            eprintln!("{body:#}");
            return;
        }

        eprintln!("{}", self.status_line(Status::Fail, &err.to_string()));
        if err.write_attempted() {
            self.warning("The copy request was sent; the object may already carry the new state.");
        }
    }

    /// Pretty-printed JSON document on stdout
    pub fn json<T: Serialize>(&self, value: &T) {
        self.emit(serde_json::to_string_pretty(value));
    }

    /// Single-line JSON document on stdout, for streamed records
    pub fn json_line<T: Serialize>(&self, value: &T) {
        self.emit(serde_json::to_string(value));
    }

    fn emit(&self, rendered: serde_json::Result<String>) {
        match rendered {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("{}", self.status_line(Status::Fail, &e.to_string())),
        }
    }

    /// Plain line on stdout unless `--quiet`
    pub fn println(&self, message: &str) {
        if !self.config.quiet {
            println!("{message}");
        }
    }
}
