//! Delimited-text record files shared by every store.
//!
//! Each backing file is a header row followed by data rows. Every [`Row`]
//! keeps the bytes it was read from, so rewrites copy untouched rows through
//! byte-for-byte (quoting and line endings included) and only re-serialize
//! rows whose fields changed. Typed decoding happens in the stores.
//!
//! Whole-file rewrites go through [`RecordFile::transact`]: read a snapshot,
//! transform it in memory, then write a sibling temporary file and rename it
//! over the target. Readers never see a half-written file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, Terminator, WriterBuilder};

use crate::error::StoreError;

/// Ordered header fields of one kind of backing file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: &'static [&'static str],
}

impl Schema {
    pub const INVENTORY: Schema = Schema::new(&["Item Name", "SKU", "Quantity", "Status"]);
    pub const AUDIT: Schema = Schema::new(&["Timestamp", "Action", "SKU"]);
    pub const CREDENTIALS: Schema = Schema::new(&["username", "password_hash"]);

    pub const fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    pub fn header(&self) -> ByteRecord {
        ByteRecord::from(self.fields.to_vec())
    }

    /// Exact, ordered equality with `header`.
    pub fn matches(&self, header: &ByteRecord) -> bool {
        header.len() == self.fields.len()
            && header
                .iter()
                .zip(self.fields)
                .all(|(have, want)| have == want.as_bytes())
    }

    /// Column index of every schema field within `header`, in schema order.
    ///
    /// `None` if any field is missing. Extra or reordered columns are fine.
    pub fn columns(&self, header: &ByteRecord) -> Option<Vec<usize>> {
        self.fields
            .iter()
            .map(|want| header.iter().position(|have| have == want.as_bytes()))
            .collect()
    }
}

/// Line terminator used when a row has to be (re)serialized.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Terminator of the first line in `bytes`, if it has one.
    fn detect(bytes: &[u8]) -> Option<Self> {
        let nl = bytes.iter().position(|&b| b == b'\n')?;
        Some(if nl > 0 && bytes[nl - 1] == b'\r' {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        })
    }

    fn terminator(self) -> Terminator {
        match self {
            LineEnding::Lf => Terminator::Any(b'\n'),
            LineEnding::CrLf => Terminator::CRLF,
        }
    }

    fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

/// One row of a backing file.
///
/// A row read from disk remembers the exact bytes it occupied (quoting,
/// line ending, any blank lines after it) and is written back as those
/// bytes until its fields are replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    record: ByteRecord,
    raw: Option<Vec<u8>>,
}

impl Row {
    pub fn new(record: ByteRecord) -> Self {
        Self { record, raw: None }
    }

    pub fn record(&self) -> &ByteRecord {
        &self.record
    }

    /// Replace the fields. The row is re-serialized on the next write.
    pub fn set_record(&mut self, record: ByteRecord) {
        self.record = record;
        self.raw = None;
    }

    /// Bytes as they were on disk; `None` for new or edited rows.
    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }
}

impl From<ByteRecord> for Row {
    fn from(record: ByteRecord) -> Self {
        Row::new(record)
    }
}

impl Deref for Row {
    type Target = ByteRecord;

    fn deref(&self) -> &ByteRecord {
        &self.record
    }
}

/// In-memory copy of a whole backing file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// First row, if the file has any rows at all.
    pub header: Option<Row>,
    pub rows: Vec<Row>,
    /// Terminator for rows written fresh into this file.
    pub line_ending: LineEnding,
}

impl Snapshot {
    /// A new file: `header` followed by `rows`.
    pub fn fresh(header: ByteRecord, rows: &[ByteRecord]) -> Self {
        Self {
            header: Some(Row::new(header)),
            rows: rows.iter().cloned().map(Row::new).collect(),
            line_ending: LineEnding::default(),
        }
    }

    pub fn columns(&self, schema: &Schema) -> Option<Vec<usize>> {
        self.header.as_ref().and_then(|h| schema.columns(h))
    }

    /// Parse `bytes`, keeping each record's exact byte span.
    fn parse(bytes: &[u8]) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows: Vec<Row> = Vec::new();
        let mut record = ByteRecord::new();
        let mut start = 0;
        while reader.read_byte_record(&mut record)? {
            let mut end = usize::try_from(reader.position().byte()).unwrap_or(bytes.len());
            // The reader stops after the CR of a CRLF; the LF belongs to this row.
            if end > 0 && bytes[end - 1] == b'\r' && bytes.get(end) == Some(&b'\n') {
                end += 1;
            }
            // Blank lines skipped before this record stay with the previous row.
            let blank = bytes[start..end]
                .iter()
                .take_while(|&&b| b == b'\r' || b == b'\n')
                .count();
            if let Some(raw) = rows.last_mut().and_then(|last| last.raw.as_mut()) {
                raw.extend_from_slice(&bytes[start..start + blank]);
                start += blank;
            }
            rows.push(Row {
                record: record.clone(),
                raw: Some(bytes[start..end].to_vec()),
            });
            start = end;
        }
        if start < bytes.len() {
            if let Some(raw) = rows.last_mut().and_then(|last| last.raw.as_mut()) {
                raw.extend_from_slice(&bytes[start..]);
            }
        }

        let mut rows = rows.into_iter();
        Ok(Self {
            header: rows.next(),
            rows: rows.collect(),
            line_ending: LineEnding::detect(bytes).unwrap_or_default(),
        })
    }

    /// Serialize: verbatim rows as read, everything else with `line_ending`.
    fn to_bytes(&self) -> Result<Vec<u8>, csv::Error> {
        let mut out = Vec::new();
        for row in self.header.iter().chain(&self.rows) {
            if !out.is_empty() && !matches!(out.last(), Some(b'\n' | b'\r')) {
                out.extend_from_slice(self.line_ending.as_bytes());
            }
            match row.raw() {
                Some(raw) => out.extend_from_slice(raw),
                None => out.extend_from_slice(&encode(row.record(), self.line_ending)?),
            }
        }
        Ok(out)
    }
}

fn encode(record: &ByteRecord, line_ending: LineEnding) -> Result<Vec<u8>, csv::Error> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .terminator(line_ending.terminator())
        .from_writer(Vec::new());
    writer.write_byte_record(record)?;
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Result of a [`RecordFile::transact`] transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Write the transformed snapshot back.
    Commit(T),
    /// Leave the file as it was.
    Abort(T),
}

/// Outcome of [`RecordFile::ensure_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderCheck {
    Intact,
    /// The header was rewritten; `preserved_rows` rows were carried over.
    Repaired { preserved_rows: usize },
}

/// A backing file. No handle is held between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> Result<bool, StoreError> {
        self.path
            .try_exists()
            .map_err(|e| StoreError::io(&self.path, e))
    }

    fn ensure_parent_dir(&self) -> Result<(), StoreError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))
            }
            _ => Ok(()),
        }
    }

    /// Create the file with `schema`'s header and `seed` rows unless it
    /// already exists. Returns whether it was created.
    pub fn create_if_missing(
        &self,
        schema: &Schema,
        seed: &[ByteRecord],
    ) -> Result<bool, StoreError> {
        if self.exists()? {
            return Ok(false);
        }
        self.ensure_parent_dir()?;
        self.replace(&Snapshot::fresh(schema.header(), seed))?;
        tracing::debug!(path = %self.path.display(), rows = seed.len(), "record file created");
        Ok(true)
    }

    /// Make sure the first row is exactly `schema`'s header.
    ///
    /// A missing file is created. On mismatch every existing row, including
    /// the rejected first row, is kept byte-for-byte beneath a fresh header.
    pub fn ensure_header(&self, schema: &Schema) -> Result<HeaderCheck, StoreError> {
        self.ensure_parent_dir()?;
        OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;

        let mut snapshot = self.snapshot()?;
        if snapshot.header.as_ref().is_some_and(|h| schema.matches(h)) {
            return Ok(HeaderCheck::Intact);
        }

        if let Some(rejected) = snapshot.header.take() {
            snapshot.rows.insert(0, rejected);
        }
        snapshot.header = Some(Row::new(schema.header()));
        self.replace(&snapshot)?;
        Ok(HeaderCheck::Repaired {
            preserved_rows: snapshot.rows.len(),
        })
    }

    /// Read the whole file.
    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let bytes = fs::read(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Snapshot::parse(&bytes).map_err(|e| StoreError::csv(&self.path, e))
    }

    /// Append one row, creating the file with `schema`'s header first if it
    /// has gone missing. The row takes the file's existing line ending.
    pub fn append(&self, schema: &Schema, row: &ByteRecord) -> Result<(), StoreError> {
        self.create_if_missing(schema, &[])?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        let tail = Tail::read(&mut file).map_err(|e| StoreError::io(&self.path, e))?;

        let mut bytes = Vec::new();
        // A hand-edited file may lack a final newline; don't glue onto its last row.
        if tail.unterminated {
            bytes.extend_from_slice(tail.line_ending.as_bytes());
        }
        bytes.extend(encode(row, tail.line_ending).map_err(|e| StoreError::csv(&self.path, e))?);

        file.write_all(&bytes)
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.sync_data().map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    /// Atomically replace the file's contents with `snapshot`.
    pub fn replace(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = snapshot
            .to_bytes()
            .map_err(|e| StoreError::csv(&self.path, e))?;
        let tmp = self.temp_path()?;
        let result = write_synced(&tmp, &bytes).and_then(|()| {
            fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))
        });
        if result.is_err() {
            // Nothing to recover if the temp file is already gone.
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn temp_path(&self) -> Result<PathBuf, StoreError> {
        let Some(name) = self.path.file_name() else {
            return Err(StoreError::io(
                &self.path,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            ));
        };
        let mut tmp_name = name.to_os_string();
        tmp_name.push(".tmp");
        Ok(self.path.with_file_name(tmp_name))
    }

    /// Snapshot transaction: read all, transform, write all (on commit).
    ///
    /// Either the file afterwards reflects the whole transform or it is
    /// unchanged. Rows the transform leaves alone keep their bytes.
    pub fn transact<T, F>(&self, transform: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Snapshot) -> Outcome<T>,
    {
        let mut snapshot = self.snapshot()?;
        match transform(&mut snapshot) {
            Outcome::Abort(value) => Ok(value),
            Outcome::Commit(value) => {
                self.replace(&snapshot)?;
                tracing::debug!(
                    path = %self.path.display(),
                    rows = snapshot.rows.len(),
                    "record file rewritten"
                );
                Ok(value)
            }
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    file.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    file.sync_all().map_err(|e| StoreError::io(path, e))
}

/// How an existing file ends.
struct Tail {
    unterminated: bool,
    line_ending: LineEnding,
}

impl Tail {
    fn read(file: &mut File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(Self {
                unterminated: false,
                line_ending: LineEnding::default(),
            });
        }

        let mut last = [0u8; 2];
        let take = len.min(2) as usize;
        file.seek(SeekFrom::End(-(take as i64)))?;
        file.read_exact(&mut last[..take])?;
        let last = &last[..take];

        if last.ends_with(b"\r\n") {
            return Ok(Self {
                unterminated: false,
                line_ending: LineEnding::CrLf,
            });
        }
        if last.ends_with(b"\n") {
            return Ok(Self {
                unterminated: false,
                line_ending: LineEnding::Lf,
            });
        }

        file.seek(SeekFrom::Start(0))?;
        let mut first_line = Vec::new();
        BufReader::new(&mut *file).read_until(b'\n', &mut first_line)?;
        Ok(Self {
            unterminated: !last.ends_with(b"\r"),
            line_ending: LineEnding::detect(&first_line).unwrap_or_default(),
        })
    }
}

/// Decode field `idx` of `row` as UTF-8.
pub fn text_field(row: &ByteRecord, idx: usize) -> Option<&str> {
    row.get(idx).and_then(|raw| std::str::from_utf8(raw).ok())
}
