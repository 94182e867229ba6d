use derive_new::new;
use is_terminal::IsTerminal;
use minus::Pager;
use std::io::{self, Write};

/// Wrapper that implements `Write` for the minus pager
///
/// The minus pager doesn't implement `std::io::Write` directly, so this wrapper
/// adapts it for the renderers, which only know about `Write`.
#[derive(new)]
pub struct PagerWriter {
    pager: Pager,
}

impl Write for PagerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s =
            std::str::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.pager.push_str(s).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Where rendered history goes
pub enum HistoryOutput {
    Paged(PagerWriter),
    Plain(io::Stdout),
}

impl HistoryOutput {
    /// Page only when asked to and stdout is an interactive terminal
    pub fn open(use_pager: bool, prompt: &str) -> io::Result<Self> {
        if use_pager && io::stdout().is_terminal() {
            let pager = Pager::new();
            pager.set_prompt(prompt).map_err(io::Error::other)?;
            Ok(HistoryOutput::Paged(PagerWriter::new(pager)))
        } else {
            Ok(HistoryOutput::Plain(io::stdout()))
        }
    }

    /// Hand the buffered output to the pager, blocking until it is dismissed
    pub fn finish(self) -> io::Result<()> {
        match self {
            HistoryOutput::Paged(writer) => minus::page_all(writer.pager).map_err(io::Error::other),
            HistoryOutput::Plain(mut stdout) => stdout.flush(),
        }
    }
}

impl Write for HistoryOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            HistoryOutput::Paged(writer) => writer.write(buf),
            HistoryOutput::Plain(stdout) => stdout.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            HistoryOutput::Paged(writer) => writer.flush(),
            HistoryOutput::Plain(stdout) => stdout.flush(),
        }
    }
}
