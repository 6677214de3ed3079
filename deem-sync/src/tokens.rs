//! Whitespace tokenizer and the desired-state record stream.
//!
//! Input is a flat sequence of tokens separated by any run of ASCII
//! whitespace; tokens are consumed in `key value` pairs. Line structure is
//! irrelevant: `a 1 b 2` and `a\n1\nb\n2` describe the same records.

use std::io::{self, BufRead, ErrorKind};

use deem_core::{Record, RecordError};

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Single-pass iterator over whitespace-separated byte tokens.
#[derive(Debug)]
pub struct Tokens<R> {
    reader: R,
    done: bool,
}

impl<R: BufRead> Tokens<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for Tokens<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut token = Vec::new();
        loop {
            let buf = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            if buf.is_empty() {
                self.done = true;
                return if token.is_empty() { None } else { Some(Ok(token)) };
            }

            let mut used = 0;
            let mut complete = false;
            for &byte in buf {
                used += 1;
                if !byte.is_ascii_whitespace() {
                    token.push(byte);
                } else if !token.is_empty() {
                    complete = true;
                    break;
                }
            }
            self.reader.consume(used);
            if complete {
                return Some(Ok(token));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DesiredStream
// ---------------------------------------------------------------------------

/// Why a [`DesiredStream`] stopped yielding records.
#[derive(Debug)]
pub enum StreamEnd {
    /// Clean end of input.
    Exhausted,
    /// A key token had no value after it.
    UnpairedKey { key: String },
    /// A token pair did not form a valid record.
    Invalid { entry: usize, error: RecordError },
    /// Reading the underlying input failed.
    Read(io::Error),
}

impl StreamEnd {
    pub fn is_clean(&self) -> bool {
        matches!(self, StreamEnd::Exhausted)
    }
}

/// Records of the desired state, in arrival order.
///
/// Termination is lenient: anything that is not a well-formed pair ends the
/// stream with a warning instead of failing the run. [`DesiredStream::end`]
/// tells which way it stopped.
#[derive(Debug)]
pub struct DesiredStream<R> {
    tokens: Tokens<R>,
    read: usize,
    end: Option<StreamEnd>,
}

impl<R: BufRead> DesiredStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            tokens: Tokens::new(reader),
            read: 0,
            end: None,
        }
    }

    /// `None` while the stream still has records to give.
    pub fn end(&self) -> Option<&StreamEnd> {
        self.end.as_ref()
    }

    fn stop(&mut self, end: StreamEnd) -> Option<Record> {
        match &end {
            StreamEnd::Exhausted => {}
            StreamEnd::UnpairedKey { key } => {
                tracing::warn!("input ends with key '{key}' and no value; ignoring it")
            }
            StreamEnd::Invalid { entry, error } => {
                tracing::warn!("input record {entry} is invalid ({error}); stopping there")
            }
            StreamEnd::Read(e) => tracing::warn!("error reading input: {e}"),
        }
        self.end = Some(end);
        None
    }
}

impl<R: BufRead> Iterator for DesiredStream<R> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.end.is_some() {
            return None;
        }
        let key = match self.tokens.next() {
            None => return self.stop(StreamEnd::Exhausted),
            Some(Err(e)) => return self.stop(StreamEnd::Read(e)),
            Some(Ok(key)) => key,
        };
        let value = match self.tokens.next() {
            None => {
                let key = String::from_utf8_lossy(&key).into_owned();
                return self.stop(StreamEnd::UnpairedKey { key });
            }
            Some(Err(e)) => return self.stop(StreamEnd::Read(e)),
            Some(Ok(value)) => value,
        };
        self.read += 1;
        match Record::parse(&key, &value) {
            Ok(record) => Some(record),
            Err(error) => self.stop(StreamEnd::Invalid {
                entry: self.read,
                error,
            }),
        }
    }
}
