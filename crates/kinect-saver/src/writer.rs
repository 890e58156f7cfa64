//! Line writer that flushes in large batches.

use std::io::{self, Write};

/// Buffers whole lines and writes them through once the pending byte count
/// exceeds a threshold.
#[derive(Debug)]
pub struct ThresholdWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
    threshold: usize,
}

impl<W: Write> ThresholdWriter<W> {
    pub fn new(inner: W, threshold: usize) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            threshold,
        }
    }

    /// Append `line` plus a newline, flushing if over the threshold.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.pending.extend_from_slice(line.as_bytes());
        self.pending.push(b'\n');
        if self.pending.len() > self.threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Write out everything pending.
    ///
    /// On error only the bytes the inner writer did not accept stay pending.
    pub fn flush(&mut self) -> io::Result<()> {
        let mut written = 0;
        let result = loop {
            if written == self.pending.len() {
                break Ok(());
            }
            match self.inner.write(&self.pending[written..]) {
                Ok(0) => break Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        self.pending.drain(..written);
        result?;
        self.inner.flush()
    }

    /// Bytes not yet handed to the inner writer.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flush and return the inner writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holds_until_threshold_exceeded() {
        let mut writer = ThresholdWriter::new(Vec::new(), 10);

        writer.write_line("abcd").unwrap();
        writer.write_line("efgh").unwrap();
        assert!(writer.get_ref().is_empty());
        assert_eq!(writer.pending_len(), 10);

        writer.write_line("i").unwrap();
        assert_eq!(writer.get_ref().as_slice(), b"abcd\nefgh\ni\n");
        assert_eq!(writer.pending_len(), 0);
    }

    /// Accepts `budget` bytes, then fails once per exhausted budget.
    struct ChokingWriter {
        written: Vec<u8>,
        budget: usize,
    }

    impl Write for ChokingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                self.budget = 4;
                return Err(io::Error::new(io::ErrorKind::Other, "disk hiccup"));
            }
            let n = buf.len().min(self.budget);
            self.written.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_flush_never_repeats_written_bytes() {
        let inner = ChokingWriter {
            written: Vec::new(),
            budget: 6,
        };
        let mut writer = ThresholdWriter::new(inner, 1 << 20);
        writer.write_line("row-1").unwrap();
        writer.write_line("row-2").unwrap();

        assert!(writer.flush().is_err());
        assert_eq!(writer.pending_len(), 6);

        // Each retry gets four more bytes through before the next hiccup.
        while writer.flush().is_err() {}
        assert_eq!(writer.pending_len(), 0);
        assert_eq!(writer.get_ref().written, b"row-1\nrow-2\n");
    }

    #[test]
    fn test_into_inner_flushes_remainder() {
        let mut writer = ThresholdWriter::new(Vec::new(), 1 << 20);
        writer.write_line("row").unwrap();
        assert_eq!(writer.into_inner().unwrap(), b"row\n");
    }
}
