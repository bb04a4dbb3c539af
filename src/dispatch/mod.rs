//! Command parsing and the thread-per-command driver.
//!
//! A command file starts with a `threads,<count>` header line, then one
//! command per line from the vocabulary `insert,<name>,<salary>` |
//! `delete,<name>` | `search,<name>`. The driver dispatches one worker
//! per command line - up to the header count - joins them all, and then
//! emits the final report. Lines that do not parse are skipped silently;
//! the table never sees them.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crate::audit::Audit;
use crate::table::{Table, MAX_NAME_LEN};

/// One unit of dispatched work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert or update a record.
    Insert {
        /// Record key.
        name: String,
        /// Record value.
        salary: u32,
    },
    /// Remove a record by name.
    Delete {
        /// Record key.
        name: String,
    },
    /// Look up a record by name.
    Search {
        /// Record key.
        name: String,
    },
}

fn valid_name(raw: &str) -> Option<&str> {
    let name = raw.trim();
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return None;
    }
    Some(name)
}

impl Command {
    /// Parse one command line. Returns `None` for anything malformed:
    /// unknown verb, missing field, oversized name, non-numeric salary.
    /// Fields beyond the expected ones are ignored.
    pub fn parse(line: &str) -> Option<Command> {
        let mut fields = line.trim().split(',');
        match fields.next()? {
            "insert" => {
                let name = valid_name(fields.next()?)?.to_string();
                let salary = fields.next()?.trim().parse().ok()?;
                Some(Command::Insert { name, salary })
            }
            "delete" => {
                let name = valid_name(fields.next()?)?.to_string();
                Some(Command::Delete { name })
            }
            "search" => {
                let name = valid_name(fields.next()?)?.to_string();
                Some(Command::Search { name })
            }
            _ => None,
        }
    }

    fn execute(&self, table: &Table) {
        match self {
            Command::Insert { name, salary } => {
                table.insert(name, *salary);
            }
            Command::Delete { name } => {
                table.delete(name);
            }
            Command::Search { name } => {
                table.search(name);
            }
        }
    }
}

/// Driver failures. Worker-level conditions (not-found, malformed lines)
/// are not errors; only the file plumbing can fail.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Reading the command file failed.
    #[error("command file io: {0}")]
    Io(#[from] std::io::Error),
    /// The first line was not a `threads,<count>` header.
    #[error("missing or malformed thread count header")]
    BadHeader,
}

/// Parse the `threads,<count>` header line.
fn parse_header(line: &str) -> Option<usize> {
    let mut fields = line.trim().split(',');
    if fields.next()? != "threads" {
        return None;
    }
    fields.next()?.trim().parse().ok()
}

/// Dispatch one worker thread per command against `table`, joining all of
/// them before returning.
pub fn run_commands(table: &Table, commands: &[Command]) {
    tracing::debug!(workers = commands.len(), "dispatching");
    thread::scope(|s| {
        for cmd in commands {
            s.spawn(move || cmd.execute(table));
        }
    });
}

/// Run a whole command file: parse the header, dispatch up to `count`
/// command lines concurrently, join, and write the audit log plus final
/// report to `output`.
pub fn run_file<W: Write + Send + 'static>(input: &Path, output: W) -> Result<(), DispatchError> {
    let reader = BufReader::new(File::open(input)?);
    let mut lines = reader.lines();

    let header = lines.next().ok_or(DispatchError::BadHeader)??;
    let count = parse_header(&header).ok_or(DispatchError::BadHeader)?;

    // Each line consumes one dispatch slot whether or not it parses;
    // malformed lines are dropped here and never reach a worker.
    let mut commands = Vec::with_capacity(count);
    for line in lines.take(count) {
        if let Some(cmd) = Command::parse(&line?) {
            commands.push(cmd);
        }
    }

    let audit = Arc::new(Audit::to_writer(output));
    let mut table = Table::with_audit(audit);
    run_commands(&table, &commands);
    table.report();
    Ok(())
}
