//! Transfer engine: single-file copies in both directions and the recursive
//! download walk
//!
//! A directory walk is nothing more than repeated single-item downloads. The
//! agent answers `cp <dir> ... download` with a zero size header, which is the
//! only signal that a path is a directory; the walk then lists it and repeats
//! the download for every child.
//!
//! Failures inside a walk are reported per entry and do not stop the
//! siblings. Only fatal errors (the connection is gone) unwind the walk.

use crate::env::LocalTarget;
use crate::error::{ClientError, Result};
use crate::filter::EntryFilter;
use crate::logger::Logger;
use crate::net::Session;
use crate::protocol::{timeouts, verb, Direction};
use crate::protocol_core::{
    contains_error_marker, encode_upload_header, join_remote, split_listing,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

// Payload read buffer
const PAYLOAD_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    /// Entry names never walked into or copied during a directory download.
    pub filter: EntryFilter,
    /// Deepest directory level below the copy root that is still listed.
    /// `None` walks without a limit.
    pub max_depth: Option<usize>,
    /// Draw a progress bar on stderr while receiving payloads.
    pub progress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub files: u64,
    pub bytes: u64,
    pub dirs: u64,
    pub failed: u64,
}

pub struct Transfer<'a, S> {
    session: &'a mut Session<S>,
    opts: &'a TransferOptions,
    logger: &'a dyn Logger,
    out: &'a mut dyn Write,
    summary: TransferSummary,
}

impl<'a, S: Read + Write> Transfer<'a, S> {
    pub fn new(
        session: &'a mut Session<S>,
        opts: &'a TransferOptions,
        logger: &'a dyn Logger,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            session,
            opts,
            logger,
            out,
            summary: TransferSummary::default(),
        }
    }

    /// Copy one remote path to `dst`, walking it if it is a directory.
    pub fn download(mut self, remote_src: &str, dst: &LocalTarget) -> Result<TransferSummary> {
        let start = Instant::now();
        let size = self.request_download(remote_src, dst)?;
        if size > 0 {
            self.receive_file(remote_src, &dst.path, size)?;
            self.note(format!("Downloaded file {} bytes to {}", size, dst.path.display()));
        } else {
            self.note(format!(
                "{} appears to be a directory, copying all files from it...",
                remote_src
            ));
            self.copy_directory(remote_src, dst, 0)?;
            let s = &self.summary;
            let line = format!(
                "Copied {} files ({} bytes) from {} directories, {} failed",
                s.files, s.bytes, s.dirs, s.failed
            );
            self.note(line);
        }
        self.logger
            .done(self.summary.files, self.summary.bytes, start.elapsed().as_secs_f64());
        Ok(self.summary)
    }

    /// Send one local file to `remote_dst` and return the agent's acknowledgment.
    ///
    /// The file is read before anything goes on the wire, so an unreadable
    /// source leaves the connection untouched.
    pub fn upload(mut self, src: &LocalTarget, remote_dst: &str) -> Result<String> {
        let data = fs::read(&src.path).map_err(|source| ClientError::LocalFileUnreadable {
            path: src.path.clone(),
            source,
        })?;
        let header = encode_upload_header(data.len() as u64)?;
        self.session.send_command(
            verb::COPY,
            &[src.token.as_str(), remote_dst, Direction::Upload.as_str()],
        )?;
        self.session.write_all(&header)?;
        self.session.write_all(&data)?;
        let ack = self.session.read_chunk()?;
        if contains_error_marker(&ack) {
            self.logger.error("upload", remote_dst, ack.trim_end());
        } else {
            self.logger
                .copy_done(&src.path.to_string_lossy(), Path::new(remote_dst), data.len() as u64);
        }
        self.note(ack.trim_end());
        Ok(ack)
    }

    fn request_download(&mut self, remote_src: &str, dst: &LocalTarget) -> Result<u64> {
        self.session.send_command(
            verb::COPY,
            &[remote_src, dst.token.as_str(), Direction::Download.as_str()],
        )?;
        self.session.read_size_header(Direction::Download)
    }

    /// List `remote_dir` and download every child into `local_dir`.
    fn copy_directory(
        &mut self,
        remote_dir: &str,
        local_dir: &LocalTarget,
        depth: usize,
    ) -> Result<()> {
        if let Some(max) = self.opts.max_depth {
            if depth > max {
                return Err(ClientError::DepthLimit {
                    path: remote_dir.to_string(),
                    depth: max,
                });
            }
        }
        fs::create_dir_all(&local_dir.path).map_err(|source| ClientError::LocalWriteFailure {
            path: local_dir.path.clone(),
            source,
        })?;
        self.logger.dir_enter(remote_dir, &local_dir.path);

        self.session.send_command(verb::LIST, &[remote_dir])?;
        let listing = self.session.read_text_reply()?;
        // Reported once, by whoever asked for this directory
        if contains_error_marker(&listing) {
            return Err(ClientError::RemoteReported(listing.trim_end().to_string()));
        }
        self.summary.dirs += 1;

        for name in split_listing(&listing) {
            if !self.opts.filter.should_include(name) {
                continue;
            }
            let remote_path = join_remote(remote_dir, name);
            let local_path = local_dir.child(name);
            self.note(format!("Trying to copy {}...", remote_path));
            match self.copy_entry(&remote_path, &local_path, depth) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    self.summary.failed += 1;
                    self.logger.error("download", &remote_path, &e.to_string());
                    self.note(format!("Error copying {}: {}", remote_path, e));
                }
            }
        }
        Ok(())
    }

    fn copy_entry(&mut self, remote_path: &str, local: &LocalTarget, depth: usize) -> Result<()> {
        let size = self.request_download(remote_path, local)?;
        if size == 0 {
            self.note(format!("{} is a directory, recursing...", remote_path));
            return self.copy_directory(remote_path, local, depth + 1);
        }
        self.receive_file(remote_path, &local.path, size)?;
        self.note(format!("Copied file {} to {}", remote_path, local.path.display()));
        Ok(())
    }

    /// Stream exactly `size` payload bytes into a fresh file at `local`.
    ///
    /// If the file (or its parent directory) cannot be written the rest of the
    /// payload is still read off the connection, so the next request starts
    /// on a frame boundary.
    fn receive_file(&mut self, remote: &str, local: &Path, size: u64) -> Result<()> {
        let opened = local
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| File::create(local));
        let (mut sink, mut write_err) = match opened {
            Ok(f) => (Some(f), None),
            Err(e) => (None, Some(e)),
        };

        let bar = self.progress_bar(size, remote);
        let mut buf = vec![0u8; PAYLOAD_CHUNK];
        let mut remaining = size;
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let n = match self.session.read_some(&mut buf[..want]) {
                Ok(0) => Err(ClientError::ShortRead {
                    expected: size as usize,
                    got: (size - remaining) as usize,
                }),
                other => other,
            };
            let n = match n {
                Ok(n) => n,
                Err(e) => {
                    bar.abandon();
                    if sink.take().is_some() {
                        let _ = fs::remove_file(local);
                    }
                    return Err(e);
                }
            };
            let failed = match sink.as_mut() {
                Some(f) => f.write_all(&buf[..n]).err(),
                None => None,
            };
            if let Some(e) = failed {
                write_err = Some(e);
                sink = None;
                let _ = fs::remove_file(local);
            }
            remaining -= n as u64;
            bar.inc(n as u64);
        }
        bar.finish_and_clear();

        if let Some(source) = write_err {
            return Err(ClientError::LocalWriteFailure {
                path: local.to_path_buf(),
                source,
            });
        }
        if let Some(mut f) = sink {
            f.flush().map_err(|source| ClientError::LocalWriteFailure {
                path: local.to_path_buf(),
                source,
            })?;
        }
        self.summary.files += 1;
        self.summary.bytes += size;
        self.logger.copy_done(remote, local, size);
        Ok(())
    }

    fn progress_bar(&self, size: u64, remote: &str) -> ProgressBar {
        if !self.opts.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(size);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                     {bytes}/{total_bytes} ({eta}) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(remote.to_string());
        bar.enable_steady_tick(Duration::from_millis(timeouts::PROGRESS_TICK_MS));
        bar
    }

    fn note(&mut self, msg: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", msg.as_ref());
    }
}
