//! `fork` + `execvp` による外部コマンド起動。
//!
//! executor（単一コマンド）と pipeline（各セグメント）が共通で使う。
//! 子プロセスで行う作業は次の順で固定されている。
//!
//! 1. SIGINT をデフォルトに戻す
//! 2. [`ChildIo`] に従ってパイプ端を stdin/stdout に `dup2`
//! 3. [`ChildIo::close`] に列挙された fd をすべて閉じる
//! 4. リダイレクトを適用（パイプ由来の fd を上書きできる）
//! 5. `execvp`
//!
//! 子の中で失敗しても親には戻らない。診断を stderr に直接 `write` して `_exit` する。
//! 親が見るのは終了ステータスだけ。
//!
//! ## 構成
//!
//! | 型/関数 | 役割 |
//! |-----|------|
//! | [`CStringVec`] | argv 用の NULL 終端ポインタ配列 |
//! | [`ChildIo`] | 子プロセスの fd 配線（差し替え先と閉じる fd のリスト） |
//! | [`spawn`] | fork して子で上記を実行し、親に PID を返す |
//! | [`wait_for`] / [`exit_code`] | 特定 PID の待機と raw status の解釈 |

use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::io::RawFd;

use libc::pid_t;
use tracing::debug;

use crate::error::{Result, ShellError};
use crate::redirect::{self, PreparedRedirect, Redirect};

// ── CStringVec ────────────────────────────────────────────────────

/// argv 用の CString ベクタ。NULL 終端のポインタ配列を構築する。
pub struct CStringVec {
    strings: Vec<CString>,
    ptrs: Vec<*const libc::c_char>,
}

impl CStringVec {
    /// 引数リストから構築する。NUL を含む引数があればエラー。
    pub fn from_args(args: &[String]) -> Result<Self> {
        let strings = args
            .iter()
            .map(|s| CString::new(s.as_str()).map_err(|_| ShellError::NulInArgument(s.clone())))
            .collect::<Result<Vec<_>>>()?;
        let mut ptrs: Vec<*const libc::c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        ptrs.push(std::ptr::null()); // NULL 終端
        Ok(Self {
            strings,
            ptrs,
        })
    }

    /// NULL 終端ポインタ配列を返す。
    fn as_ptr(&self) -> *const *const libc::c_char {
        self.ptrs.as_ptr()
    }

    /// 先頭要素（コマンド名）。空なら `None`。
    fn program(&self) -> Option<&CStr> {
        self.strings.first().map(CString::as_c_str)
    }
}

// ── ChildIo ───────────────────────────────────────────────────────

/// 子プロセスの fd 配線。
#[derive(Debug, Default)]
pub struct ChildIo {
    /// stdin に接続する fd（`None` なら継承）。
    pub stdin: Option<RawFd>,
    /// stdout に接続する fd（`None` なら継承）。
    pub stdout: Option<RawFd>,
    /// `dup2` の後で子が閉じる fd。パイプラインでは全チャネルの両端が入る。
    pub close: Vec<RawFd>,
    /// exec 失敗時の診断の接頭辞。
    pub exec_context: &'static str,
}

impl ChildIo {
    /// 配線なし（stdin/stdout をそのまま継承）。
    pub fn inherit() -> Self {
        Self {
            exec_context: "exec failed",
            ..Self::default()
        }
    }
}

// ── 子プロセス側ヘルパー ──────────────────────────────────────────

pub(crate) fn errno() -> libc::c_int {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn write_stderr(parts: &[&[u8]]) {
    for part in parts {
        unsafe {
            libc::write(
                libc::STDERR_FILENO,
                part.as_ptr() as *const libc::c_void,
                part.len(),
            );
        }
    }
}

fn strerror(err: libc::c_int) -> &'static [u8] {
    unsafe {
        let msg = libc::strerror(err);
        if msg.is_null() {
            b"unknown error"
        } else {
            CStr::from_ptr(msg).to_bytes()
        }
    }
}

/// 子プロセス内の失敗を報告して `_exit(code)` する。
///
/// fork 後の子から呼ぶため、アロケーションせず `write(2)` だけで出力する。
pub(crate) fn child_fail(context: &str, err: libc::c_int, code: libc::c_int) -> ! {
    write_stderr(&[b"minish: ", context.as_bytes(), b": ", strerror(err), b"\n"]);
    unsafe { libc::_exit(code) }
}

/// 子プロセス本体。戻らない。
unsafe fn exec_child(argv: &CStringVec, child_io: &ChildIo, redirects: &[PreparedRedirect]) -> ! {
    libc::signal(libc::SIGINT, libc::SIG_DFL);

    if let Some(fd) = child_io.stdin {
        libc::dup2(fd, libc::STDIN_FILENO);
    }
    if let Some(fd) = child_io.stdout {
        libc::dup2(fd, libc::STDOUT_FILENO);
    }
    for &fd in &child_io.close {
        if fd > libc::STDERR_FILENO {
            libc::close(fd);
        }
    }

    redirect::apply_in_child(redirects);

    let Some(program) = argv.program() else {
        write_stderr(&[b"minish: ", child_io.exec_context.as_bytes(), b": empty command\n"]);
        libc::_exit(1);
    };

    libc::execvp(program.as_ptr(), argv.as_ptr());

    let err = errno();
    let code = match err {
        libc::ENOENT => 127,
        libc::EACCES => 126,
        _ => 1,
    };
    write_stderr(&[
        b"minish: ",
        child_io.exec_context.as_bytes(),
        b": ",
        program.to_bytes(),
        b": ",
        strerror(err),
        b"\n",
    ]);
    libc::_exit(code)
}

// ── spawn / wait ──────────────────────────────────────────────────

/// 子プロセスを fork して `argv` を exec させる。成功時は子 PID を返す。
///
/// `redirects` は子の中で `child_io` の配線の後に適用される。
/// 呼び出し側は fork 前にバッファ済みの stdout を flush しておくこと。
pub fn spawn(argv: &[String], child_io: &ChildIo, redirects: &[Redirect]) -> Result<pid_t> {
    // 子でアロケーションしないよう、C 文字列は fork 前にすべて用意する
    let c_argv = CStringVec::from_args(argv)?;
    let prepared = redirect::prepare(redirects)?;

    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(ShellError::ForkFailed(io::Error::last_os_error()));
    }
    if pid == 0 {
        unsafe { exec_child(&c_argv, child_io, &prepared) }
    }

    debug!(pid, ?argv, stdin = ?child_io.stdin, stdout = ?child_io.stdout, "spawned child");
    Ok(pid)
}

/// 指定した子プロセスの終了を待ち、raw status を返す。EINTR は再試行する。
pub fn wait_for(pid: pid_t) -> io::Result<i32> {
    loop {
        let mut raw_status: i32 = 0;
        let ret = unsafe { libc::waitpid(pid, &mut raw_status, 0) };
        if ret == pid {
            return Ok(raw_status);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// raw status を終了コードに変換する。シグナル終了は 128 + シグナル番号。
pub fn exit_code(raw_status: i32) -> i32 {
    if libc::WIFEXITED(raw_status) {
        libc::WEXITSTATUS(raw_status)
    } else if libc::WIFSIGNALED(raw_status) {
        128 + libc::WTERMSIG(raw_status)
    } else {
        1
    }
}
