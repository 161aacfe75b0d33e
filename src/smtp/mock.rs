use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::session::Transport;

#[derive(Default)]
struct Wire {
    inbound: Vec<u8>,
    position: usize,
    outbound: Vec<u8>,
    shut_down: bool,
}

/// In-memory server: every reply is queued up front and handed out as the
/// session reads. Clones share the same wire so tests can inspect what the
/// session wrote after it has been dropped.
#[derive(Clone, Default)]
pub(crate) struct ScriptedStream {
    wire: Arc<Mutex<Wire>>,
}

impl ScriptedStream {
    pub(crate) fn new(replies: &[&str]) -> Self {
        let stream = Self::default();
        stream.lock().inbound = replies.concat().into_bytes();
        stream
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.lock().outbound)
            .split("\r\n")
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    fn lock(&self) -> MutexGuard<'_, Wire> {
        self.wire.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut wire = self.lock();
        if wire.shut_down {
            return Ok(0);
        }
        let start = wire.position;
        let n = buf.len().min(wire.inbound.len() - start);
        buf[..n].copy_from_slice(&wire.inbound[start..start + n]);
        wire.position += n;
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut wire = self.lock();
        if wire.shut_down {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream shut down"));
        }
        wire.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedStream {
    fn set_io_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) {
        self.lock().shut_down = true;
    }
}
