//! コマンド実行: 1 コマンド分のテキストをビルトインまたは外部コマンドとして実行する。
//!
//! - [`Shell::run_command`]: トークン化 → ビルトイン判定 → 外部コマンドの spawn と待機
//! - [`Shell::replay`]: 履歴 N 番を `Running: ...` と表示して `run_command` で再実行する。
//!   再実行される行は `;` / `&&` / `|` で再分割されない
//!
//! 外部コマンドの待機中は、その PID をフォアグラウンド参照に入れておく。
//! SIGINT はシグナルハンドラ経由でこの PID に中継される。

use std::io::Write;

use tracing::{debug, info, warn};

use crate::builtins;
use crate::error::ShellError;
use crate::redirect;
use crate::shell::Shell;
use crate::spawn::{self, ChildIo};
use crate::tokenizer::tokenize;

/// `!N` の入れ子の上限。
pub const MAX_REPLAY_DEPTH: usize = 16;

/// 1 回の実行結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 終了コード 0、または成功したビルトイン。
    Success,
    /// 非ゼロ終了、シグナル終了、ビルトインのエラー。
    Failure,
    /// `exit` が実行された。インタプリタ全体を終了する。
    Exit,
}

impl Status {
    /// 終了コードから変換する。0 だけが成功。
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Self::Success
        } else {
            Self::Failure
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    pub fn is_exit(self) -> bool {
        self == Self::Exit
    }
}

/// 親プロセスで検出したエラーを stderr に報告する。
pub(crate) fn report(err: &ShellError) {
    eprintln!("minish: {err}");
}

impl Shell {
    /// 1 コマンドを実行する。
    ///
    /// トークンがなければ何もせず成功。ビルトインに該当しなければ子プロセスを 1 つ起動し、
    /// その子だけを待つ。
    pub fn run_command(&mut self, line: &str) -> Status {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return Status::Success;
        }
        if let Some(status) = builtins::try_exec(self, &tokens) {
            return status;
        }
        self.run_external(tokens)
    }

    fn run_external(&mut self, tokens: Vec<String>) -> Status {
        let plan = redirect::plan(tokens);
        self.flush_output();

        let pid = match spawn::spawn(&plan.argv, &ChildIo::inherit(), &plan.redirects) {
            Ok(pid) => pid,
            Err(e) => {
                report(&e);
                return Status::Failure;
            }
        };

        self.foreground.set(&[pid]);
        let waited = spawn::wait_for(pid);
        self.foreground.clear();

        match waited {
            Ok(raw_status) => {
                let code = spawn::exit_code(raw_status);
                debug!(pid, code, "foreground child finished");
                Status::from_code(code)
            }
            Err(e) => {
                warn!(pid, error = %e, "waitpid failed");
                Status::Failure
            }
        }
    }

    /// 履歴 `index` 番（1 始まり）を再実行する。
    ///
    /// 範囲外なら報告して失敗を返し、何も実行しない。
    pub fn replay(&mut self, index: usize) -> Status {
        if self.replay_depth >= MAX_REPLAY_DEPTH {
            report(&ShellError::ReplayTooDeep);
            return Status::Failure;
        }
        let line = match self.history.get(index) {
            Ok(line) => line.to_string(),
            Err(e) => {
                report(&e);
                return Status::Failure;
            }
        };

        let _ = write!(self.out, "Running: {line}");
        if !line.ends_with('\n') {
            let _ = writeln!(self.out);
        }
        info!(index, line = line.trim_end(), "replaying history entry");

        self.replay_depth += 1;
        let status = self.run_command(&line);
        self.replay_depth -= 1;
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::testing::*;
    use std::fs;
    use std::time::{Duration, Instant};

    #[test]
    fn status_from_code() {
        assert_eq!(Status::from_code(0), Status::Success);
        assert_eq!(Status::from_code(1), Status::Failure);
        assert_eq!(Status::from_code(130), Status::Failure);
    }

    #[test]
    fn empty_command_is_success() {
        let (mut shell, _) = test_shell();
        assert_eq!(shell.run_command(""), Status::Success);
        assert_eq!(shell.run_command(" \t\n"), Status::Success);
    }

    #[test]
    fn external_exit_status() {
        let (mut shell, _) = test_shell();
        assert_eq!(shell.run_command("true"), Status::Success);
        assert_eq!(shell.run_command("false"), Status::Failure);
        assert_eq!(shell.run_command("minish-no-such-program"), Status::Failure);
        assert!(shell.foreground.is_empty());
    }

    #[test]
    fn redirection_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let (mut shell, _) = test_shell();

        let status = shell.run_command(&format!("echo hello > {}", out.display()));
        assert_eq!(status, Status::Success);
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");

        let status = shell.run_command(&format!("echo world >> {}", out.display()));
        assert_eq!(status, Status::Success);
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\nworld\n");

        let status = shell.run_command(&format!("echo again > {}", out.display()));
        assert_eq!(status, Status::Success);
        assert_eq!(fs::read_to_string(&out).unwrap(), "again\n");
    }

    #[test]
    fn input_redirection() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "b\na\n").unwrap();
        let (mut shell, _) = test_shell();

        let line = format!("sort < {} > {}", input.display(), out.display());
        assert_eq!(shell.run_command(&line), Status::Success);
        assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\n");
    }

    #[test]
    fn failed_redirection_fails_command() {
        let (mut shell, _) = test_shell();
        assert_eq!(
            shell.run_command("cat < /nonexistent/minish/in.txt"),
            Status::Failure
        );
    }

    #[test]
    fn replay_runs_stored_line_unsplit() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let (mut shell, buf) = test_shell();

        shell.history.record("true\n");
        let stored = format!("echo a;b > {}\n", out.display());
        shell.history.record(&stored);

        assert_eq!(shell.replay(2), Status::Success);
        assert_eq!(buf.contents(), format!("Running: {stored}"));
        // `;` で分割されず、そのまま echo の引数になる
        assert_eq!(fs::read_to_string(&out).unwrap(), "a;b\n");
    }

    #[test]
    fn replay_out_of_range_executes_nothing() {
        let (mut shell, buf) = test_shell();
        shell.history.record("pwd\n");
        shell.history.record("pwd\n");

        assert_eq!(shell.replay(0), Status::Failure);
        assert_eq!(shell.replay(3), Status::Failure);
        assert!(buf.contents().is_empty());
    }

    #[test]
    fn replay_via_bang_token() {
        let (mut shell, buf) = test_shell();
        shell.history.record("history\n");
        assert_eq!(shell.run_command("!1"), Status::Success);
        assert_eq!(buf.contents(), "Running: history\n1: history\n");
    }

    #[test]
    fn self_referencing_replay_is_bounded() {
        let (mut shell, _) = test_shell();
        shell.history.record("!1\n");
        assert_eq!(shell.run_command("!1"), Status::Failure);
        assert_eq!(shell.replay_depth, 0);
    }

    #[test]
    fn replayed_exit_propagates() {
        let (mut shell, _) = test_shell();
        shell.history.record("exit\n");
        assert_eq!(shell.run_command("!1"), Status::Exit);
    }

    #[test]
    fn interrupt_during_command_reaches_child_only() {
        let _guard = SIGNAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (mut shell, _) = test_shell();
        let foreground = shell.foreground;
        crate::signal::install(foreground, "").unwrap();

        let sender = std::thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(5);
            while foreground.is_empty() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            std::thread::sleep(Duration::from_millis(50));
            unsafe {
                libc::kill(libc::getpid(), libc::SIGINT);
            }
        });

        let started = Instant::now();
        assert_eq!(shell.run_command("sleep 5"), Status::Failure);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(shell.foreground.is_empty());
        sender.join().unwrap();

        // 割り込み後もインタプリタは次のコマンドを実行できる
        assert_eq!(shell.run_command("true"), Status::Success);
    }
}
