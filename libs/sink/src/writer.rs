use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Куда consumer sink'а рендерит строки.
///
/// Вызывается из единственного consumer'а на blocking потоке, по одной
/// строке за раз; блокирующий I/O здесь допустим.
/// Ошибка записи логируется, consumer переходит к следующему сообщению.
pub trait SinkWriter: Send + Sync + 'static {
    fn write_line(&self, line: &str) -> io::Result<()>;
}

/// Пишет строку как INFO событие `tracing` с target `sink`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWriter;

impl SinkWriter for TracingWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        tracing::info!(target: "sink", "{line}");
        Ok(())
    }
}

/// Plain line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutWriter;

impl SinkWriter for StdoutWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")
    }
}

/// Собирает строки в памяти.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    lines: Mutex<Vec<String>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Копия всех строк в порядке рендера.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SinkWriter for MemoryWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_writer_keeps_order() {
        let writer = MemoryWriter::new();
        assert!(writer.is_empty());
        writer.write_line("a").unwrap();
        writer.write_line("b").unwrap();
        assert_eq!(writer.lines(), vec!["a", "b"]);
        assert_eq!(writer.len(), 2);
    }

    #[test]
    fn tracing_and_stdout_writers_never_fail() {
        assert!(TracingWriter.write_line("[AUDIT] CREATE user_id=1 ts=x").is_ok());
        assert!(StdoutWriter.write_line("[NOTIFY] created user_id=1 ts=x").is_ok());
    }
}
