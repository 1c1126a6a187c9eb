//! インタプリタ側（親プロセス）で検出されるエラー。
//!
//! 子プロセス内の失敗（リダイレクト先が開けない、exec できない）はここには現れない。
//! 子は診断を stderr に書いて非ゼロで `_exit` し、親は終了ステータスだけを観測する
//! （[`spawn`](crate::spawn) 参照）。

use std::io;

use thiserror::Error;

/// 親プロセスで報告されるエラー。どれもインタプリタを終了させない。
#[derive(Debug, Error)]
pub enum ShellError {
    /// ビルトインに必須の引数がない。
    #[error("{command}: missing path")]
    MissingArgument { command: &'static str },

    /// `cd` の `chdir` 失敗。
    #[error("cd: {path}: {source}")]
    ChangeDirectory {
        path: String,
        #[source]
        source: io::Error,
    },

    /// `getcwd` 失敗（`pwd`）。
    #[error("pwd: {0}")]
    CurrentDir(#[source] io::Error),

    /// `fork` がリソース不足などで失敗した。
    #[error("fork error: {0}")]
    ForkFailed(#[source] io::Error),

    /// パイプの作成に失敗した。
    #[error("pipe error: {0}")]
    PipeFailed(#[source] io::Error),

    /// 範囲外の履歴番号 (`!0`, `!(N+1)` 等)。
    #[error("Invalid history index: {0}")]
    InvalidHistoryIndex(usize),

    /// `!N` の再実行が入れ子になりすぎた（`!1` が `!1` 自身を指す等）。
    #[error("history replay nested too deeply")]
    ReplayTooDeep,

    /// 引数に NUL バイトが含まれ、argv に変換できない。
    #[error("{0}: argument contains a NUL byte")]
    NulInArgument(String),
}

pub type Result<T> = std::result::Result<T, ShellError>;
