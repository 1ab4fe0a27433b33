//! Output sinks
//!
//! A sink receives finished lines in emission order. Line terminators are
//! the sink's business; the emitter hands over bare lines plus a flag
//! telling whether the controller should acknowledge the line before the
//! next one is sent.

use crate::config::LineEnding;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Destination of emitted lines
pub trait LineSink {
    /// Write one line, without terminator
    fn write_line(&mut self, line: &str, expects_ack: bool) -> io::Result<()>;

    /// Push buffered lines to the underlying resource
    fn flush(&mut self) -> io::Result<()>;

    /// Release the underlying resource, flushing first
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl<S: LineSink + ?Sized> LineSink for &mut S {
    fn write_line(&mut self, line: &str, expects_ack: bool) -> io::Result<()> {
        (**self).write_line(line, expects_ack)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: LineSink + ?Sized> LineSink for Box<S> {
    fn write_line(&mut self, line: &str, expects_ack: bool) -> io::Result<()> {
        (**self).write_line(line, expects_ack)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Buffered sink over any [`Write`]
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: BufWriter<W>,
    line_ending: LineEnding,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            line_ending: LineEnding::Unix,
        }
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Flush and hand back the wrapped writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl WriterSink<File> {
    /// Create (or truncate) the file at `path`
    pub fn create_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn write_line(&mut self, line: &str, _expects_ack: bool) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(self.line_ending.as_str().as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// In-memory sink, mostly for tests and previews
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemorySink {
    pub lines: Vec<String>,
    pub acks: Vec<bool>,
    pub closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<&str> {
        self.lines.iter().map(String::as_str).collect()
    }

    /// Lines joined with `\n`, as a file would read back
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl LineSink for MemorySink {
    fn write_line(&mut self, line: &str, expects_ack: bool) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink is closed"));
        }
        self.lines.push(line.to_string());
        self.acks.push(expects_ack);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Link to a physical controller (serial port, socket, ...)
///
/// `send` blocks until the controller acknowledged the line when
/// `expects_ack` is set. Any error is fatal to the write.
pub trait Transport {
    fn send(&mut self, line: &str, expects_ack: bool) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Forwards every line to a [`Transport`]
#[derive(Debug)]
pub struct TransportSink<T: Transport> {
    transport: T,
}

impl<T: Transport> TransportSink<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: Transport> LineSink for TransportSink<T> {
    fn write_line(&mut self, line: &str, expects_ack: bool) -> io::Result<()> {
        self.transport.send(line, expects_ack)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.transport.close()
    }
}

/// Writes every line to two sinks, `first` then `second`
#[derive(Debug, Default)]
pub struct TeeSink<A: LineSink, B: LineSink> {
    pub first: A,
    pub second: B,
}

impl<A: LineSink, B: LineSink> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: LineSink, B: LineSink> LineSink for TeeSink<A, B> {
    fn write_line(&mut self, line: &str, expects_ack: bool) -> io::Result<()> {
        self.first.write_line(line, expects_ack)?;
        self.second.write_line(line, expects_ack)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }

    /// Both sinks are closed even when the first one fails
    fn close(&mut self) -> io::Result<()> {
        let first = self.first.close();
        let second = self.second.close();
        first.and(second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<(String, bool)>,
        closed: bool,
    }

    impl Transport for RecordingTransport {
        fn send(&mut self, line: &str, expects_ack: bool) -> io::Result<()> {
            self.sent.push((line.to_string(), expects_ack));
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn test_writer_sink_line_endings() {
        let mut sink = WriterSink::new(Vec::new()).with_line_ending(LineEnding::Windows);
        sink.write_line("G91", false).unwrap();
        sink.write_line("G1 X1", false).unwrap();
        let bytes = sink.into_inner().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "G91\r\nG1 X1\r\n");
    }

    #[test]
    fn test_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gcode");
        let mut sink = WriterSink::create_file(&path).unwrap();
        sink.write_line("G90", false).unwrap();
        sink.close().unwrap();
        drop(sink);

        let mut text = String::new();
        File::open(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "G90\n");
    }

    #[test]
    fn test_memory_sink_rejects_writes_after_close() {
        let mut sink = MemorySink::new();
        sink.write_line("M05", true).unwrap();
        sink.close().unwrap();
        assert!(sink.write_line("M09", true).is_err());
        assert_eq!(sink.lines(), vec!["M05"]);
        assert_eq!(sink.acks, vec![true]);
    }

    #[test]
    fn test_tee_forwards_to_transport() {
        let mut tee = TeeSink::new(MemorySink::new(), TransportSink::new(RecordingTransport::default()));
        tee.write_line("M03 S1000", true).unwrap();
        tee.close().unwrap();

        let (memory, transport) = tee.into_parts();
        let transport = transport.into_inner();
        assert_eq!(memory.lines(), vec!["M03 S1000"]);
        assert_eq!(transport.sent, vec![("M03 S1000".to_string(), true)]);
        assert!(memory.closed && transport.closed);
    }
}
