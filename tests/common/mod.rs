use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// Integration-test twin of `agentx_rs::testutil::TestStream` (that one is
/// `#[cfg(test)]`-private to the lib crate and unreachable from here).
pub struct TestStream {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    read_chunk: Option<usize>,
}

impl TestStream {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            read_chunk: None,
        }
    }

    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    pub fn outbound(&self) -> &[u8] {
        &self.outbound
    }

    pub fn set_read_chunk(&mut self, n: usize) {
        self.read_chunk = Some(n);
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
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
