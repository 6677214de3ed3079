//! Archive primitives.
//!
//! The reconciler only needs three operations from the archive: list the
//! current members, delete a set of members, and add-or-replace members from
//! a directory of staged files. [`ArTool`] provides them by running the
//! system `ar` program:
//!
//! | primitive                | invocation                       |
//! |--------------------------|----------------------------------|
//! | list                     | `ar -pv <archive>`               |
//! | delete members           | `ar -d <archive> @<list-file>`   |
//! | add or replace members   | `ar -rc <archive> <dir>/<key>…`  |

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use deem_core::{Key, Record};

use crate::error::{io_err, SyncError};
use crate::pipeline::scratch_root_for;
use crate::tokens::Tokens;

/// Prefix shared by every scratch directory and list file.
pub(crate) const SCRATCH_PREFIX: &str = "tmp_deem_";

/// The three primitives a key/value archive must provide.
pub trait Archive {
    /// Current members, or `None` when the archive does not exist yet.
    fn list(&self) -> Result<Option<Vec<Record>>, SyncError>;

    /// Remove the named members.
    fn delete_members(&self, keys: &[Key]) -> Result<(), SyncError>;

    /// Insert or overwrite one member per file in `dir`, named after the file.
    fn add_or_replace_members(&self, dir: &Path) -> Result<(), SyncError>;
}

// ---------------------------------------------------------------------------
// ArTool
// ---------------------------------------------------------------------------

/// An `ar` archive driven through the external `ar` program.
#[derive(Debug, Clone)]
pub struct ArTool {
    program: PathBuf,
    archive: PathBuf,
}

impl ArTool {
    /// Use `program` as-is, without checking that it exists.
    pub fn new(program: impl Into<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            archive: archive.into(),
        }
    }

    /// Resolve `program` on `PATH` (or as a path) before using it.
    pub fn locate(program: &str, archive: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let program = which::which(program).map_err(|source| SyncError::ToolNotFound {
            program: program.to_string(),
            source,
        })?;
        Ok(Self::new(program, archive))
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the tool with `args` and return its stdout.
    fn run<I, S>(&self, args: I) -> Result<Vec<u8>, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let command = describe(&self.program, &args);
        tracing::debug!("running: {command}");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SyncError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SyncError::ToolFailed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl Archive for ArTool {
    fn list(&self) -> Result<Option<Vec<Record>>, SyncError> {
        match fs::File::open(&self.archive) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&self.archive, e)),
        }
        let mut args = vec![OsString::from("-pv")];
        args.push(self.archive.clone().into_os_string());
        let stdout = self.run(args)?;
        parse_listing(&self.archive, &stdout).map(Some)
    }

    fn delete_members(&self, keys: &[Key]) -> Result<(), SyncError> {
        let root = scratch_root_for(&self.archive);
        let mut list = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempfile_in(&root)
            .map_err(|e| io_err(&root, e))?;
        for key in keys {
            write!(list, " {}", response_word(key)).map_err(|e| io_err(list.path(), e))?;
        }
        list.flush().map_err(|e| io_err(list.path(), e))?;

        let mut response = OsString::from("@");
        response.push(list.path());
        let mut args = vec![OsString::from("-d")];
        args.push(self.archive.clone().into_os_string());
        args.push(response);
        let result = self.run(args).map(drop);

        let list_path = list.path().to_path_buf();
        if let Err(e) = list.close() {
            tracing::warn!("could not remove list file {}: {e}", list_path.display());
        }
        result
    }

    fn add_or_replace_members(&self, dir: &Path) -> Result<(), SyncError> {
        let files = staged_files(dir)?;
        if files.is_empty() {
            return Ok(());
        }
        let mut args = vec![OsString::from("-rc")];
        args.push(self.archive.clone().into_os_string());
        args.extend(files.into_iter().map(PathBuf::into_os_string));
        self.run(args).map(drop)
    }
}

/// Regular files in `dir`, sorted by name.
pub(crate) fn staged_files(dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| io_err(entry.path(), e))?
            .is_file();
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Quote a key for an `@file` response list, where backslash and
/// both quote characters are special.
fn response_word(key: &Key) -> String {
    let mut word = String::with_capacity(key.as_str().len());
    for c in key.as_str().chars() {
        if matches!(c, '\\' | '\'' | '"') {
            word.push('\\');
        }
        word.push(c);
    }
    word
}

fn describe(program: &Path, args: &[OsString]) -> String {
    let mut command = program.display().to_string();
    for arg in args {
        command.push(' ');
        command.push_str(&arg.to_string_lossy());
    }
    command
}

// ---------------------------------------------------------------------------
// Listing parser
// ---------------------------------------------------------------------------

/// Parse `ar -pv` output into records.
///
/// Each member is printed as a `<name>` decoration followed by its content.
/// The parser is strict: every entry must be exactly one decorated name token
/// and one content token. Only the outermost brackets are decoration, so a
/// member named `<k` lists as `<<k>`.
pub fn parse_listing(archive: &Path, listing: &[u8]) -> Result<Vec<Record>, SyncError> {
    let mut tokens = Tokens::new(listing);
    let mut records = Vec::new();
    let mut entry = 0;

    while let Some(name) = tokens.next() {
        entry += 1;
        let malformed = |reason: String| SyncError::MalformedListing {
            archive: archive.to_path_buf(),
            entry,
            reason,
        };
        let name = name.map_err(|e| io_err(archive, e))?;

        if name.len() < 2 || name.first() != Some(&b'<') || name.last() != Some(&b'>') {
            return Err(malformed(format!(
                "expected a '<name>' decoration, found '{}'",
                String::from_utf8_lossy(&name)
            )));
        }
        let key = &name[1..name.len() - 1];

        let value = match tokens.next() {
            Some(value) => value.map_err(|e| io_err(archive, e))?,
            None => {
                return Err(malformed(format!(
                    "member '{}' has no content",
                    String::from_utf8_lossy(key)
                )))
            }
        };
        let record = Record::parse(key, &value).map_err(|e| malformed(e.to_string()))?;
        records.push(record);
    }

    Ok(records)
}
