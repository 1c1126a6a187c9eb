//! リダイレクタ: `<`, `>`, `>>` の解釈と、子プロセス内での fd 差し替え。
//!
//! 2 段階に分かれる。
//!
//! 1. [`plan`] — 親プロセスで実行する純粋な走査。トークンベクタを左から見て、
//!    直後にトークンを持つ演算子をリダイレクト指定として取り出し、
//!    最初に一致した演算子の位置で argv を打ち切る。
//! 2. [`apply_in_child`] — fork 後の子プロセスで実行。指定順にファイルを開き、
//!    `dup2` で stdin/stdout に差し替えて元の fd を閉じる。
//!    同じストリームへの指定が複数あれば後のものが勝つ。
//!
//! | 演算子 | 開き方 | 差し替え先 |
//! |--------|--------|------------|
//! | `<`  | `O_RDONLY` | stdin |
//! | `>`  | `O_WRONLY \| O_CREAT \| O_TRUNC`, 0644 | stdout |
//! | `>>` | `O_WRONLY \| O_CREAT \| O_APPEND`, 0644 | stdout |

use std::ffi::CString;

use crate::error::{Result, ShellError};
use crate::spawn;

/// リダイレクトの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `<`
    Input,
    /// `>`
    Output,
    /// `>>`
    Append,
}

impl RedirectKind {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(Self::Input),
            ">" => Some(Self::Output),
            ">>" => Some(Self::Append),
            _ => None,
        }
    }

    /// 差し替え対象の fd。
    pub fn target_fd(self) -> libc::c_int {
        match self {
            Self::Input => libc::STDIN_FILENO,
            Self::Output | Self::Append => libc::STDOUT_FILENO,
        }
    }

    fn open_flags(self) -> libc::c_int {
        match self {
            Self::Input => libc::O_RDONLY,
            Self::Output => libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
            Self::Append => libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND,
        }
    }

    fn error_context(self) -> &'static str {
        match self {
            Self::Input => "Input redirection error",
            Self::Output => "Output redirection error",
            Self::Append => "Append redirection error",
        }
    }
}

/// リダイレクト指定 1 件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub target: String,
}

/// [`plan`] の結果。演算子を取り除いた argv と、走査順のリダイレクト指定。
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RedirectPlan {
    pub argv: Vec<String>,
    pub redirects: Vec<Redirect>,
}

/// トークンベクタを走査してリダイレクト指定を取り出す。
///
/// - 直後にトークンがある演算子だけが有効。末尾の `>` などはただの引数として残る。
/// - ターゲットの語も続けて走査する。`cat < > x` は `>` を入力に開き、さらに stdout を `x` に向ける。
/// - argv は最初に有効になった演算子の手前までになる（以降の語は exec に渡さない）。
pub fn plan(mut tokens: Vec<String>) -> RedirectPlan {
    let mut redirects = Vec::new();
    let mut cut: Option<usize> = None;
    let mut i = 0;

    while i < tokens.len() {
        match RedirectKind::from_token(&tokens[i]) {
            Some(kind) if i + 1 < tokens.len() => {
                redirects.push(Redirect {
                    kind,
                    target: tokens[i + 1].clone(),
                });
                cut.get_or_insert(i);
                i += 1;
            }
            _ => i += 1,
        }
    }

    if let Some(at) = cut {
        tokens.truncate(at);
    }
    RedirectPlan {
        argv: tokens,
        redirects,
    }
}

/// fork 前に C 文字列へ変換済みのリダイレクト。子プロセス内でアロケーションしないため。
pub(crate) struct PreparedRedirect {
    kind: RedirectKind,
    path: CString,
}

pub(crate) fn prepare(redirects: &[Redirect]) -> Result<Vec<PreparedRedirect>> {
    redirects
        .iter()
        .map(|r| {
            CString::new(r.target.as_str())
                .map(|path| PreparedRedirect { kind: r.kind, path })
                .map_err(|_| ShellError::NulInArgument(r.target.clone()))
        })
        .collect()
}

/// 子プロセス内でリダイレクトを適用する。開けなければ診断を出して `_exit(1)`。
///
/// # Safety
///
/// fork 直後の子プロセスからのみ呼ぶこと。親で呼ぶとインタプリタ自身の stdin/stdout が差し替わる。
pub(crate) unsafe fn apply_in_child(redirects: &[PreparedRedirect]) {
    for r in redirects {
        let fd = libc::open(r.path.as_ptr(), r.kind.open_flags(), 0o644 as libc::c_uint);
        if fd < 0 {
            spawn::child_fail(r.kind.error_context(), spawn::errno(), 1);
        }
        let target = r.kind.target_fd();
        if fd != target {
            libc::dup2(fd, target);
            libc::close(fd);
        }
    }
}
