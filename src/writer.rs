use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::errors::Result;
use crate::record::VcfRecord;
use crate::types::Header;

/// Destination of records leaving a filter pass.
pub trait RecordSink<R> {
    fn write_record(&mut self, record: &R) -> Result<()>;

    /// Write a line that could not be parsed into a record.
    /// Sinks that only hold parsed records drop it.
    fn write_raw(&mut self, _line: &str) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<R: Clone> RecordSink<R> for Vec<R> {
    fn write_record(&mut self, record: &R) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// An absent sink accepts and drops everything.
impl<R, S: RecordSink<R>> RecordSink<R> for Option<S> {
    fn write_record(&mut self, record: &R) -> Result<()> {
        match self {
            Some(sink) => sink.write_record(record),
            None => Ok(()),
        }
    }

    fn write_raw(&mut self, line: &str) -> Result<()> {
        match self {
            Some(sink) => sink.write_raw(line),
            None => Ok(()),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self {
            Some(sink) => sink.finish(),
            None => Ok(()),
        }
    }
}

/// Writes a VCF header followed by records, as text.
pub struct VcfWriter<W: Write> {
    inner: W,
}

impl<W: Write> VcfWriter<W> {
    /// Wrap `inner` and write `header` to it.
    pub fn new(mut inner: W, header: &Header) -> Result<Self> {
        for line in header.lines() {
            writeln!(inner, "{}", line)?;
        }
        Ok(Self { inner })
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> RecordSink<VcfRecord> for VcfWriter<W> {
    fn write_record(&mut self, record: &VcfRecord) -> Result<()> {
        writeln!(self.inner, "{}", record.line())?;
        Ok(())
    }

    fn write_raw(&mut self, line: &str) -> Result<()> {
        writeln!(self.inner, "{}", line)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// An output file written under a temporary name next to its target and
/// moved into place by [`StagedFile::commit`]. Dropped without a commit, the
/// temporary file is removed, so a failed pass leaves no partial output.
pub struct StagedFile {
    file: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = tempfile::Builder::new()
            .prefix(".vcf-filter-")
            .suffix(".partial")
            .tempfile_in(dir)?;
        Ok(StagedFile { file, path })
    }

    /// A writer over the temporary file, with `header` already written.
    pub fn writer(&self, header: &Header) -> Result<VcfWriter<BufWriter<File>>> {
        VcfWriter::new(BufWriter::new(self.file.as_file().try_clone()?), header)
    }

    /// Move the temporary file to its target path.
    pub fn commit(self) -> Result<()> {
        self.file.persist(&self.path).map_err(io::Error::from)?;
        Ok(())
    }
}
