//! Incremental echo for the unvalidated streaming endpoint.
//!
//! Body chunks are pushed into [`EchoStream`] as they arrive and every
//! completed CSV record is written back straight away. Nothing is bounded
//! or converted; only the field count is checked, as the CSV decoder does.

use csv_core::{ReadRecordResult, Reader};

use crate::error::ValidationError;

/// Push-based CSV echo.
pub struct EchoStream {
    reader: Reader,
    fields: Vec<u8>,
    fields_len: usize,
    ends: Vec<usize>,
    ends_len: usize,
    record_line: u64,
    in_record: bool,
    expected_fields: Option<usize>,
    records: u64,
}

impl Default for EchoStream {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoStream {
    pub fn new() -> Self {
        Self {
            reader: Reader::new(),
            fields: vec![0; 1024],
            fields_len: 0,
            ends: vec![0; 64],
            ends_len: 0,
            record_line: 1,
            in_record: false,
            expected_fields: None,
            records: 0,
        }
    }

    /// Number of records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Decode `chunk`, appending each completed record to `out`.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<(), ValidationError> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.drive(chunk, out)
    }

    /// Flush the last record once the body has ended.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), ValidationError> {
        self.drive(&[], out)
    }

    fn drive(&mut self, mut input: &[u8], out: &mut Vec<u8>) -> Result<(), ValidationError> {
        let at_eof = input.is_empty();

        loop {
            // Blank lines are skipped here rather than by the decoder so the
            // record is stamped with the line it actually starts on.
            if !self.in_record {
                let blank = input
                    .iter()
                    .take_while(|&&b| b == b'\n' || b == b'\r')
                    .count();
                let newlines = input[..blank].iter().filter(|&&b| b == b'\n').count();
                self.reader.set_line(self.reader.line() + newlines as u64);
                input = &input[blank..];
                if !input.is_empty() {
                    self.in_record = true;
                    self.record_line = self.reader.line();
                }
            }
            // An empty slice tells the decoder the input has ended.
            if input.is_empty() && !at_eof {
                return Ok(());
            }

            let (result, nin, nout, nend) = self.reader.read_record(
                input,
                &mut self.fields[self.fields_len..],
                &mut self.ends[self.ends_len..],
            );
            input = &input[nin..];
            self.fields_len += nout;
            self.ends_len += nend;

            match result {
                ReadRecordResult::InputEmpty => return Ok(()),
                ReadRecordResult::OutputFull => {
                    let len = self.fields.len();
                    self.fields.resize(len * 2, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let len = self.ends.len();
                    self.ends.resize(len * 2, 0);
                }
                ReadRecordResult::Record => {
                    self.in_record = false;
                    let emitted = self.emit(out);
                    self.fields_len = 0;
                    self.ends_len = 0;
                    emitted?;
                }
                ReadRecordResult::End => return Ok(()),
            }
        }
    }

    fn emit(&mut self, out: &mut Vec<u8>) -> Result<(), ValidationError> {
        let count = self.ends_len;
        match self.expected_fields {
            None => self.expected_fields = Some(count),
            Some(expected) if expected != count => {
                return Err(ValidationError::MalformedCsv {
                    line: self.record_line,
                    detail: "wrong number of fields".to_string(),
                });
            }
            Some(_) => {}
        }

        let mut start = 0;
        for (i, &end) in self.ends[..count].iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            out.extend_from_slice(&self.fields[start..end]);
            start = end;
        }
        out.push(b'\n');
        self.records += 1;
        Ok(())
    }
}

/// Text written into an already started stream when decoding fails.
pub fn stream_error_line(err: &ValidationError) -> String {
    format!("Error: parsing CSV: {}\n", err)
}
