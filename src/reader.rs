use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::debug;

use crate::errors::{Error, Result};
use crate::record::VcfRecord;
use crate::types::Header;

pub struct VcfRecords<R: BufRead> {
    header: Header,
    line_buf: Vec<u8>,
    line_number: usize,
    finished: bool,
    inner: R,
}

impl<R: BufRead> VcfRecords<R> {
    pub fn header(&self) -> &Header {
        &self.header
    }
}

impl VcfRecords<BufReader<Box<dyn Read>>> {
    /// Open a plain or compressed (gzip) VCF file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (reader, format) = niffler::from_path(path)?;
        debug!("opened VCF input ({:?})", format);
        Self::new(BufReader::new(reader))
    }
}

impl<R: BufRead> VcfRecords<R> {
    /// Read the header; the reader is left at the first data line.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = Header::default();
        let mut line_buf = Vec::new();
        let mut line_number = 0;
        loop {
            line_buf.clear();
            if reader.read_until(b'\n', &mut line_buf)? == 0 {
                return Err(Error::Header("missing #CHROM line".into()));
            }
            line_number += 1;
            let line = std::str::from_utf8(&line_buf)
                .map_err(|_| Error::Header(format!("line {} is not valid UTF-8", line_number)))?
                .trim_end_matches(&['\n', '\r'][..]);
            if line.starts_with("##") {
                header.push_meta_line(line)?;
            } else if line.starts_with('#') {
                header.push_column_line(line)?;
                break;
            } else if !line.is_empty() {
                return Err(Error::Header(format!(
                    "data line {} before the #CHROM line",
                    line_number
                )));
            }
        }
        Ok(Self {
            header,
            line_buf,
            line_number,
            finished: false,
            inner: reader,
        })
    }
}

impl<R: BufRead> Iterator for VcfRecords<R> {
    type Item = Result<VcfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.line_buf.clear();
            match self.inner.read_until(b'\n', &mut self.line_buf) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    self.line_number += 1;
                    let line = match std::str::from_utf8(&self.line_buf) {
                        Ok(line) => line.trim_end_matches(&['\n', '\r'][..]),
                        Err(e) => {
                            let line = String::from_utf8_lossy(&self.line_buf);
                            return Some(Err(Error::MalformedRecord {
                                line_number: self.line_number,
                                line: line.trim_end_matches(&['\n', '\r'][..]).to_owned(),
                                reason: format!("not valid UTF-8 ({})", e),
                            }));
                        }
                    };
                    if line.is_empty() {
                        continue;
                    }
                    return Some(VcfRecord::from_line(line, &self.header, self.line_number));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}
