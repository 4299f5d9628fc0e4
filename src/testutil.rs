//! In-memory duplex stream double for exercising partial-I/O behavior
//! without a real socket.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// A fake connected stream: bytes pushed via [`TestStream::push_inbound`]
/// are what `read` returns; bytes written land in [`TestStream::outbound`].
/// Both sides can be capped to a fixed chunk size to simulate a kernel
/// buffer only accepting part of a call.
pub struct TestStream {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    read_chunk: Option<usize>,
    write_chunk: Option<usize>,
}

impl TestStream {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            read_chunk: None,
            write_chunk: None,
        }
    }

    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    pub fn outbound(&self) -> &[u8] {
        &self.outbound
    }

    pub fn clear_outbound(&mut self) {
        self.outbound.clear();
    }

    pub fn set_read_chunk(&mut self, n: usize) {
        self.read_chunk = Some(n);
    }

    pub fn set_write_chunk(&mut self, n: usize) {
        self.write_chunk = Some(n);
    }
}

impl Default for TestStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for TestStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.inbound.is_empty() {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }
        let cap = self.read_chunk.unwrap_or(buf.len()).min(buf.len());
        let n = cap.min(self.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.inbound.pop_front().expect("checked len above");
        }
        Ok(n)
    }
}

impl Write for TestStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.write_chunk.unwrap_or(buf.len()).min(buf.len());
        self.outbound.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
