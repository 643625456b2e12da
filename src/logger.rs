use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub trait Logger: Send + Sync {
    fn connected(&self, _addr: &str) {}
    fn command(&self, _line: &str) {}
    fn copy_done(&self, _src: &str, _dst: &Path, _bytes: u64) {}
    fn dir_enter(&self, _remote: &str, _local: &Path) {}
    fn error(&self, _context: &str, _path: &str, _msg: &str) {}
    fn done(&self, _files: u64, _bytes: u64, _seconds: f64) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn connected(&self, addr: &str) {
        self.line(&format!("CONNECT addr={}", addr));
    }
    fn command(&self, line: &str) {
        self.line(&format!("CMD line={}", line));
    }
    fn copy_done(&self, src: &str, dst: &Path, bytes: u64) {
        self.line(&format!("COPY src={} dst={} bytes={}", src, dst.display(), bytes));
    }
    fn dir_enter(&self, remote: &str, local: &Path) {
        self.line(&format!("DIR remote={} local={}", remote, local.display()));
    }
    fn error(&self, context: &str, path: &str, msg: &str) {
        self.line(&format!("ERROR ctx={} path={} msg={}", context, path, msg));
    }
    fn done(&self, files: u64, bytes: u64, seconds: f64) {
        self.line(&format!("DONE files={files} bytes={bytes} seconds={seconds:.3}"));
    }
}
