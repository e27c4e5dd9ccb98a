//! Destinations for values printed by `PRN`.

use std::io::Write;

/// Receives one value per executed `PRN`, in program order.
pub trait Output {
    fn emit(&mut self, value: u8) -> std::io::Result<()>;
}

/// Collects printed values; used by tests, the debugger and WASM.
impl Output for Vec<u8> {
    fn emit(&mut self, value: u8) -> std::io::Result<()> {
        self.push(value);
        Ok(())
    }
}

/// Prints each value in decimal on its own line.
#[derive(Debug, Default)]
pub struct LineWriter<W: Write> {
    inner: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Output for LineWriter<W> {
    fn emit(&mut self, value: u8) -> std::io::Result<()> {
        writeln!(self.inner, "{}", value)
    }
}

/// Standard output sink used by the CLI.
pub fn stdout() -> LineWriter<std::io::Stdout> {
    LineWriter::new(std::io::stdout())
}
