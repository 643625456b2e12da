//! Interactive command loop
//!
//! One operator line in, at most one protocol exchange out. Usage errors are
//! caught here and never reach the connection.

use crate::env::LocalPaths;
use crate::error::Result;
use crate::logger::Logger;
use crate::net::Session;
use crate::protocol::{verb, Direction};
use crate::transfer::{Transfer, TransferOptions};
use std::io::{BufRead, Read, Write};
use thiserror::Error;

pub const HELP: &str =
    "Type commands: ls [path], cd <path>, cp <src> <dst> <upload|download>, exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(String),
    ChangeDir(String),
    Copy {
        src: String,
        dst: String,
        direction: Direction,
    },
    Exit,
}

/// Operator input that is rejected locally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("Usage: ls [path]")]
    List,
    #[error("Usage: cd <path>")]
    ChangeDir,
    #[error("Usage: cp <src> <dst> <upload|download>")]
    Copy,
    #[error("Direction must be 'upload' or 'download'")]
    Direction,
    #[error("Unknown command")]
    Unknown(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> std::result::Result<Option<Command>, UsageError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = parts.split_first() else {
            return Ok(None);
        };
        let cmd = match head {
            "ls" => match args {
                [] | ["."] => Command::List("/".to_string()),
                [path] => Command::List(path.to_string()),
                _ => return Err(UsageError::List),
            },
            "cd" => match args {
                [path] => Command::ChangeDir(path.to_string()),
                _ => return Err(UsageError::ChangeDir),
            },
            "cp" => match args {
                [src, dst, direction] => Command::Copy {
                    src: src.to_string(),
                    dst: dst.to_string(),
                    direction: direction.parse().map_err(|_| UsageError::Direction)?,
                },
                _ => return Err(UsageError::Copy),
            },
            "exit" if args.is_empty() => Command::Exit,
            other => return Err(UsageError::Unknown(other.to_string())),
        };
        Ok(Some(cmd))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Dispatcher<'a, S> {
    session: &'a mut Session<S>,
    paths: &'a LocalPaths,
    opts: &'a TransferOptions,
    logger: &'a dyn Logger,
}

impl<'a, S: Read + Write> Dispatcher<'a, S> {
    pub fn new(
        session: &'a mut Session<S>,
        paths: &'a LocalPaths,
        opts: &'a TransferOptions,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            session,
            paths,
            opts,
            logger,
        }
    }

    /// Read commands until `exit`, end of input, or a fatal connection error.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
        prompt: &str,
    ) -> Result<()> {
        let mut raw = Vec::new();
        loop {
            if !prompt.is_empty() {
                write!(out, "{}", prompt)?;
                out.flush()?;
            }
            raw.clear();
            if input.read_until(b'\n', &mut raw)? == 0 {
                return Ok(());
            }
            let Ok(line) = std::str::from_utf8(&raw) else {
                writeln!(out, "Error: input is not valid UTF-8")?;
                continue;
            };
            if self.handle_line(line, out)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Handle one operator line. Only fatal errors are returned.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let cmd = match Command::parse(line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Ok(Flow::Continue),
            Err(usage) => {
                writeln!(out, "{}", usage)?;
                return Ok(Flow::Continue);
            }
        };
        self.logger.command(line.trim());
        match self.execute(&cmd, out) {
            Ok(flow) => Ok(flow),
            Err(e) if e.is_fatal() => {
                writeln!(out, "Error: {}", e)?;
                Err(e)
            }
            Err(e) => {
                let context = match &cmd {
                    Command::Copy {
                        direction: Direction::Upload,
                        ..
                    } => "Error uploading file",
                    Command::Copy { .. } => "Error downloading",
                    _ => "Error",
                };
                writeln!(out, "{}: {}", context, e)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute<W: Write>(&mut self, cmd: &Command, out: &mut W) -> Result<Flow> {
        match cmd {
            Command::List(path) => {
                self.session.send_command(verb::LIST, &[path.as_str()])?;
                let reply = self.session.read_text_reply()?;
                print_reply(out, &reply)?;
            }
            Command::ChangeDir(path) => {
                self.session.send_command(verb::CHANGE_DIR, &[path.as_str()])?;
                let reply = self.session.read_text_reply()?;
                print_reply(out, &reply)?;
            }
            Command::Copy {
                src,
                dst,
                direction: Direction::Download,
            } => {
                let local = self.paths.target(dst);
                Transfer::new(self.session, self.opts, self.logger, out).download(src, &local)?;
            }
            Command::Copy {
                src,
                dst,
                direction: Direction::Upload,
            } => {
                let local = self.paths.target(src);
                Transfer::new(self.session, self.opts, self.logger, out).upload(&local, dst)?;
            }
            Command::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }
}

fn print_reply<W: Write>(out: &mut W, reply: &str) -> Result<()> {
    if reply.ends_with('\n') {
        write!(out, "{}", reply)?;
    } else {
        writeln!(out, "{}", reply)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::error::ClientError;
    use crate::logger::NoopLogger;
    use crate::net::mock::ScriptedStream;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn dispatch(
        stream: ScriptedStream,
        paths: &LocalPaths,
        input: impl AsRef<[u8]>,
    ) -> (Result<()>, ScriptedStream, String) {
        let mut session = Session::from_stream(stream);
        let opts = TransferOptions::default();
        let mut out = Vec::new();
        let res = Dispatcher::new(&mut session, paths, &opts, &NoopLogger).run(
            Cursor::new(input.as_ref().to_vec()),
            &mut out,
            "",
        );
        (res, session.into_inner(), String::from_utf8(out).unwrap())
    }

    fn plain_paths(cwd: &std::path::Path) -> LocalPaths {
        LocalPaths::new(Environment { contained: false }, "/workspace", cwd)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("ls"), Ok(Some(Command::List("/".into()))));
        assert_eq!(Command::parse("ls ."), Ok(Some(Command::List("/".into()))));
        assert_eq!(Command::parse("  ls /data "), Ok(Some(Command::List("/data".into()))));
        assert_eq!(
            Command::parse("cd /sdcard"),
            Ok(Some(Command::ChangeDir("/sdcard".into())))
        );
        assert_eq!(
            Command::parse("cp /data/a.txt a.txt download"),
            Ok(Some(Command::Copy {
                src: "/data/a.txt".into(),
                dst: "a.txt".into(),
                direction: Direction::Download,
            }))
        );
        assert_eq!(Command::parse("exit"), Ok(Some(Command::Exit)));
        assert_eq!(Command::parse("   \n"), Ok(None));
    }

    #[test]
    fn test_parse_usage_errors() {
        assert_eq!(Command::parse("cd"), Err(UsageError::ChangeDir));
        assert_eq!(Command::parse("cp onlyonearg"), Err(UsageError::Copy));
        assert_eq!(Command::parse("cp a b c d"), Err(UsageError::Copy));
        assert_eq!(Command::parse("ls a b"), Err(UsageError::List));
        assert_eq!(Command::parse("cp a b sideways"), Err(UsageError::Direction));
        assert_eq!(Command::parse("rm -rf /"), Err(UsageError::Unknown("rm".into())));
    }

    #[test]
    fn test_malformed_cp_sends_nothing() {
        let tmp = TempDir::new().unwrap();
        let paths = plain_paths(tmp.path());
        let (res, stream, out) = dispatch(ScriptedStream::new(), &paths, "cp onlyonearg\n");
        res.unwrap();
        assert!(stream.written.is_empty());
        assert_eq!(out, "Usage: cp <src> <dst> <upload|download>\n");
    }

    #[test]
    fn test_unknown_command_sends_nothing() {
        let tmp = TempDir::new().unwrap();
        let paths = plain_paths(tmp.path());
        let (res, stream, out) = dispatch(ScriptedStream::new(), &paths, "frobnicate\n\n");
        res.unwrap();
        assert!(stream.written.is_empty());
        assert_eq!(out, "Unknown command\n");
    }

    #[test]
    fn test_ls_prints_reply_without_sentinel() {
        let tmp = TempDir::new().unwrap();
        let stream = ScriptedStream::new().text("a.txt\nsub\n");
        let (res, stream, out) = dispatch(stream, &plain_paths(tmp.path()), "ls\n");
        res.unwrap();
        assert_eq!(stream.written_str(), "ls /\n");
        assert_eq!(out, "a.txt\nsub\n");
        assert!(!out.contains('\0'));
    }

    #[test]
    fn test_cd_error_reply_keeps_session() {
        let tmp = TempDir::new().unwrap();
        let stream = ScriptedStream::new()
            .text("Error changing directory\n")
            .text("/sdcard\n");
        let input = "cd /nonexistent\ncd /sdcard\nexit\n";
        let (res, stream, out) = dispatch(stream, &plain_paths(tmp.path()), input);
        res.unwrap();
        assert_eq!(stream.commands(), vec!["cd /nonexistent", "cd /sdcard"]);
        assert_eq!(out, "Error changing directory\n/sdcard\n");
    }

    #[test]
    fn test_exit_stops_before_remaining_input() {
        let tmp = TempDir::new().unwrap();
        let paths = plain_paths(tmp.path());
        let (res, stream, _) = dispatch(ScriptedStream::new(), &paths, "exit\nls\n");
        res.unwrap();
        assert!(stream.written.is_empty());
    }

    #[test]
    fn test_timeout_is_reported_and_loop_continues() {
        let tmp = TempDir::new().unwrap();
        let stream = ScriptedStream::new()
            .fail(std::io::ErrorKind::WouldBlock)
            .text("/\n");
        let (res, stream, out) = dispatch(stream, &plain_paths(tmp.path()), "ls /slow\ncd /\n");
        res.unwrap();
        assert_eq!(stream.commands(), vec!["ls /slow", "cd /"]);
        assert!(out.starts_with("Error: timed out"));
    }

    #[test]
    fn test_connection_loss_ends_session() {
        let tmp = TempDir::new().unwrap();
        let paths = plain_paths(tmp.path());
        let (res, stream, out) = dispatch(ScriptedStream::new(), &paths, "ls\nls /data\n");
        assert!(matches!(res, Err(ClientError::ConnectionClosed)));
        assert_eq!(stream.commands(), vec!["ls /"]);
        assert!(out.contains("connection closed"));
    }

    #[test]
    fn test_download_resolves_relative_destination() {
        let tmp = TempDir::new().unwrap();
        let stream = ScriptedStream::new().file(b"twelve bytes");
        let input = "cp /data/a.txt ./a.txt download\n";
        let (res, stream, _) = dispatch(stream, &plain_paths(tmp.path()), input);
        res.unwrap();
        let dst = tmp.path().join("a.txt");
        assert_eq!(std::fs::read(&dst).unwrap(), b"twelve bytes");
        assert_eq!(stream.commands(), vec!["cp /data/a.txt ./a.txt download"]);
    }

    #[test]
    fn test_working_directory_with_spaces() {
        let tmp = TempDir::new().unwrap();
        let cwd = tmp.path().join("My Docs");
        std::fs::create_dir_all(&cwd).unwrap();
        std::fs::write(cwd.join("up.bin"), b"up").unwrap();
        let stream = ScriptedStream::new()
            .file(b"twelve bytes")
            .dir()
            .text("b.txt\n")
            .file(b"b")
            .reply("OK\n");
        let input = "cp /data/a.txt a.txt download\n\
                     cp /data/dir dir download\n\
                     cp up.bin /sdcard/up.bin upload\n";
        let (res, stream, out) = dispatch(stream, &plain_paths(&cwd), input);
        res.unwrap();
        assert!(!out.contains("whitespace"));
        assert_eq!(std::fs::read(cwd.join("a.txt")).unwrap(), b"twelve bytes");
        assert_eq!(std::fs::read(cwd.join("dir/b.txt")).unwrap(), b"b");
        let cmds = stream.commands();
        assert_eq!(cmds[0], "cp /data/a.txt a.txt download");
        assert_eq!(cmds[3], "cp /data/dir/b.txt dir/b.txt download");
        assert_eq!(cmds[4], "cp up.bin /sdcard/up.bin upload");
    }

    #[test]
    fn test_failed_download_keeps_stream_aligned() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("blocker"), b"").unwrap();
        let stream = ScriptedStream::new()
            .file(b"SECRET-PAYLOAD")
            .text("/sdcard\n");
        let input = "cp /data/a.txt blocker/a.txt download\ncd /sdcard\n";
        let (res, stream, out) = dispatch(stream, &plain_paths(tmp.path()), input);
        res.unwrap();
        assert_eq!(stream.commands()[1], "cd /sdcard");
        assert!(out.starts_with("Error downloading: cannot write local file"));
        assert!(out.ends_with("/sdcard\n"));
        assert!(!out.contains("SECRET-PAYLOAD"));
    }

    #[test]
    fn test_invalid_utf8_input_is_reported() {
        let tmp = TempDir::new().unwrap();
        let stream = ScriptedStream::new().text("a.txt\n");
        let mut input = vec![0xff, 0xfe, b'\n'];
        input.extend_from_slice(b"ls /data\n");
        let (res, stream, out) = dispatch(stream, &plain_paths(tmp.path()), input);
        res.unwrap();
        assert_eq!(stream.commands(), vec!["ls /data"]);
        assert_eq!(out, "Error: input is not valid UTF-8\na.txt\n");
    }

    #[test]
    fn test_upload_missing_file_reports_and_continues() {
        let tmp = TempDir::new().unwrap();
        let stream = ScriptedStream::new().text("/\n");
        let input = "cp nope.bin /sdcard/x upload\ncd /\n";
        let (res, stream, out) = dispatch(stream, &plain_paths(tmp.path()), input);
        res.unwrap();
        assert_eq!(stream.commands(), vec!["cd /"]);
        assert!(out.starts_with("Error uploading file: cannot read local file"));
    }
}
