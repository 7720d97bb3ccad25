use super::{TelemetryRecord, TelemetrySink};
use crate::error::TelemetryError;
use csv::{QuoteStyle, Writer, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// The trailing marker column of each row.
const ROW_MARKER: u32 = 1000;

/// Writes one tab separated row per tick: elapsed time, latitude, longitude,
/// bus ID and a constant marker column.
pub struct TsvSink<W: Write> {
    writer: Writer<W>,
}

impl TsvSink<File> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TelemetryError> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> TsvSink<W> {
    /// Writes rows to `inner`.
    pub fn new(inner: W) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::NonNumeric)
            .has_headers(false)
            .from_writer(inner);
        Self { writer }
    }

    /// Flushes the rows and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, TelemetryError> {
        self.writer
            .into_inner()
            .map_err(|err| TelemetryError::Io(err.into_error()))
    }
}

impl<W: Write> TelemetrySink for TsvSink<W> {
    fn emit(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        self.writer.serialize((
            record.elapsed,
            record.position.latitude,
            record.position.longitude,
            record.bus_id,
            ROW_MARKER,
        ))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TelemetryError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::telemetry::sample_record;

    #[test]
    fn writes_rows() {
        let mut sink = TsvSink::new(vec![]);
        sink.emit(&sample_record(0)).unwrap();
        sink.emit(&sample_record(2)).unwrap();
        sink.finish().unwrap();
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "0.0\t38.715802\t-9.23501\t7\t1000",
                "2.0\t38.715802\t-9.23501\t7\t1000",
            ]
        );
    }
}
