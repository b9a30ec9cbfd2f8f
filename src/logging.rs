use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_CAP: u64 = 10 * 1024 * 1024;

/// Stdout always; a size-capped file as well when `log_file` is given.
pub fn init_logging(log_level: Level, log_file: Option<&str>) {
    let level_filter = LevelFilter::from_level(log_level);
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_filter(level_filter);

    let file_layer = log_file.map(|path| {
        let writer = CappedLog::new(PathBuf::from(path), DEFAULT_LOG_CAP);
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .with_filter(level_filter)
    });

    tracing_subscriber::registry().with(stdout_layer).with(file_layer).init();
}

/// Append-only log file that keeps only its newest half once it reaches `cap` bytes.
#[derive(Clone, Debug)]
pub struct CappedLog {
    path: PathBuf,
    cap: u64,
    lock: Arc<Mutex<()>>,
}

impl CappedLog {
    pub fn new(path: PathBuf, cap: u64) -> Self {
        Self {
            path,
            cap,
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn trim_if_full(&self) -> io::Result<()> {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size < self.cap {
            return Ok(());
        }

        let keep = self.cap / 2;
        let mut tail = Vec::with_capacity(keep as usize);
        let mut file = OpenOptions::new().read(true).open(&self.path)?;
        file.seek(SeekFrom::Start(size.saturating_sub(keep)))?;
        file.read_to_end(&mut tail)?;

        // Start the kept part on a line boundary
        if let Some(pos) = tail.iter().position(|b| *b == b'\n') {
            tail.drain(..=pos);
        }

        std::fs::write(&self.path, &tail)
    }
}

impl Write for CappedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.trim_if_full()?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
