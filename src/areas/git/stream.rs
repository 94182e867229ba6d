use crate::areas::producer::LogStream;
use crate::artifacts::log::record::LogRecordReader;
use crate::artifacts::objects::commit::Commit;
use crate::error::{EngineError, Result};
use std::collections::VecDeque;
use std::io::{BufReader, ErrorKind, Read};
use std::process::{Child, ChildStdout};
use std::thread::{self, JoinHandle};

/// Bytes of stderr kept for the error message
const STDERR_TAIL: usize = 8 * 1024;

/// Commit stream backed by a running `git log` process
///
/// Stderr is drained on its own thread while stdout is read, so warnings
/// never fill the pipe and stall the process.
pub struct GitLogStream {
    command: String,
    child: Option<Child>,
    records: LogRecordReader<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
}

impl GitLogStream {
    pub(crate) fn new(command: String, mut child: Child) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::transport(&command, "stdout is not captured"))?;

        let stderr = child
            .stderr
            .take()
            .map(|pipe| drain_tail(pipe, STDERR_TAIL));

        Ok(GitLogStream {
            command,
            child: Some(child),
            records: LogRecordReader::new(BufReader::new(stdout)),
            stderr,
        })
    }

    /// Reap the process once its stdout is drained
    fn finish(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|drain| drain.join().ok())
            .unwrap_or_default();
        if status.success() {
            return Ok(());
        }

        Err(EngineError::transport(&self.command, stderr.trim()))
    }
}

impl LogStream for GitLogStream {
    fn next(&mut self) -> Result<Option<Commit>> {
        if self.child.is_none() {
            return Ok(None);
        }

        match self.records.next_record() {
            Ok(Some(commit)) => Ok(Some(commit)),
            Ok(None) => self.finish().map(|_| None),
            Err(error) => {
                self.close();
                Err(error)
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            // the process may already be gone
            let _ = child.kill();
            let _ = child.wait();
            // the drain ends on its own once the pipe closes
            self.stderr.take();
            tracing::debug!(command = %self.command, "log stream closed");
        }
    }
}

impl Drop for GitLogStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read `pipe` to its end on a new thread, keeping the last `limit` bytes
fn drain_tail<R: Read + Send + 'static>(mut pipe: R, limit: usize) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut tail = VecDeque::<u8>::with_capacity(limit);
        let mut chunk = [0u8; 4096];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => {
                    tail.extend(&chunk[..read]);
                    let excess = tail.len().saturating_sub(limit);
                    tail.drain(..excess);
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        String::from_utf8_lossy(tail.make_contiguous()).into_owned()
    })
}
