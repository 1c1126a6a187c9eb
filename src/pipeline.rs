//! パイプライン: `|` で区切られた各セグメントを子プロセスとして同時に走らせる。
//!
//! 処理の流れ:
//! 1. 行を `|` で分割し、空でないセグメントを最大 [`MAX_SEGMENTS`] 個取る（以降は捨てる）
//! 2. N-1 個の [`Channel`] を先にすべて作成
//! 3. 各セグメントを spawn。子は前のチャネルの read 端を stdin、自分のチャネルの write 端を
//!    stdout にし、**全チャネルの両端**を閉じてからリダイレクトを適用して exec する
//! 4. 親は全セグメントの spawn 後にチャネルを drop（= 全 fd を close）し、全子を待つ
//!
//! セグメント内のビルトインは特別扱いしない（外部コマンドとして exec を試みる）。
//! パイプライン全体の結果は最終セグメントの終了ステータス。
//! 待機中は全セグメントの PID をフォアグラウンド参照に入れ、SIGINT を全員に中継する。

use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use libc::pid_t;
use tracing::{debug, warn};

use crate::error::{Result, ShellError};
use crate::executor::{report, Status};
use crate::redirect;
use crate::shell::Shell;
use crate::spawn::{self, ChildIo};
use crate::tokenizer::tokenize;

/// 1 行あたりのセグメント数の上限。
pub const MAX_SEGMENTS: usize = 9;

/// セグメント間の無名パイプ。drop で両端が閉じる。
struct Channel {
    read: OwnedFd,
    write: OwnedFd,
}

impl Channel {
    fn open() -> Result<Self> {
        let mut fds = [-1; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(ShellError::PipeFailed(io::Error::last_os_error()));
        }
        // SAFETY: pipe(2) が返した直後の fd で、ほかに所有者はいない
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        // 無関係な exec に端が漏れないようにする。セグメントの子では dup2 後のコピーに CLOEXEC は付かない
        for fd in fds {
            unsafe {
                libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC);
            }
        }
        Ok(Self { read, write })
    }
}

/// 行を `|` で分割する。空文字列のセグメント（`||` の間など）は詰め、上限を超えた分は捨てる。
pub fn split_segments(line: &str) -> Vec<&str> {
    line.split('|')
        .filter(|s| !s.is_empty())
        .take(MAX_SEGMENTS)
        .collect()
}

/// セグメント `i` の fd 配線。`all_fds` は全チャネルの両端。
fn segment_io(i: usize, channels: &[Channel], all_fds: &[RawFd]) -> ChildIo {
    ChildIo {
        stdin: i.checked_sub(1).map(|prev| channels[prev].read.as_raw_fd()),
        stdout: channels.get(i).map(|c| c.write.as_raw_fd()),
        close: all_fds.to_vec(),
        exec_context: "pipe exec failed",
    }
}

impl Shell {
    /// パイプライン行を実行し、最終セグメントの結果を返す。
    pub fn run_pipeline(&mut self, line: &str) -> Status {
        let segments = split_segments(line);
        let n = segments.len();
        if n == 0 {
            return Status::Success;
        }

        let channels = match (1..n).map(|_| Channel::open()).collect::<Result<Vec<_>>>() {
            Ok(channels) => channels,
            Err(e) => {
                report(&e);
                return Status::Failure;
            }
        };
        let all_fds: Vec<RawFd> = channels
            .iter()
            .flat_map(|c| [c.read.as_raw_fd(), c.write.as_raw_fd()])
            .collect();
        debug!(segments = n, ?all_fds, "pipeline wired");

        self.flush_output();

        let mut children: Vec<(usize, pid_t)> = Vec::with_capacity(n);
        let mut fork_failed = false;

        for (i, segment) in segments.iter().enumerate() {
            let plan = redirect::plan(tokenize(segment));
            let child_io = segment_io(i, &channels, &all_fds);
            match spawn::spawn(&plan.argv, &child_io, &plan.redirects) {
                Ok(pid) => {
                    children.push((i, pid));
                    let pids: Vec<pid_t> = children.iter().map(|&(_, p)| p).collect();
                    self.foreground.set(&pids);
                }
                Err(e @ ShellError::ForkFailed(_)) => {
                    report(&e);
                    fork_failed = true;
                    break;
                }
                // このセグメントだけ起動しない。下流は EOF を読む
                Err(e) => report(&e),
            }
        }

        // 親側の全端を閉じる。これを怠ると下流が EOF を観測できない
        drop(channels);

        let mut last_code: Option<i32> = None;
        for &(i, pid) in &children {
            let code = match spawn::wait_for(pid) {
                Ok(raw_status) => spawn::exit_code(raw_status),
                Err(e) => {
                    warn!(pid, error = %e, "waitpid failed");
                    1
                }
            };
            self.foreground.release(pid);
            debug!(segment = i, pid, code, "pipeline segment finished");
            if i == n - 1 {
                last_code = Some(code);
            }
        }
        self.foreground.clear();

        match last_code {
            Some(code) if !fork_failed => Status::from_code(code),
            _ => Status::Failure,
        }
    }
}
