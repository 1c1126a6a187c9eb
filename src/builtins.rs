//! ビルトインコマンドの実装。
//!
//! ビルトインは fork/exec を経由せずプロセス内で直接実行される。
//! `try_exec()` が `Some(status)` を返せばビルトインとして処理済み、
//! `None` なら外部コマンドとして executor に委ねる。
//!
//! 判定順: `cd` → `pwd` → `exit` → `history` → `!N`。
//! ビルトインはリダイレクトを適用しない。パイプライン内では判定自体が行われない。

use std::env;
use std::io::Write;

use crate::error::ShellError;
use crate::executor::{report, Status};
use crate::shell::Shell;

/// 認識されたビルトイン。
#[derive(Debug, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Pwd,
    Exit,
    History,
    /// `!N` — 履歴 N 番を再実行
    Replay(usize),
}

/// 先頭トークンからビルトインを判定する。
pub fn lookup(name: &str) -> Option<Builtin> {
    match name {
        "cd" => Some(Builtin::Cd),
        "pwd" => Some(Builtin::Pwd),
        "exit" => Some(Builtin::Exit),
        "history" => Some(Builtin::History),
        _ => parse_replay(name).map(Builtin::Replay),
    }
}

/// `!` の直後が数字なら、先頭の数字列を番号として読む（`!2x` → 2）。
/// 桁あふれは `usize::MAX` とし、範囲外として扱わせる。
fn parse_replay(token: &str) -> Option<usize> {
    let rest = token.strip_prefix('!')?;
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(usize::MAX))
}

/// ビルトインコマンドの実行を試みる。
///
/// 戻り値:
/// - `Some(status)` — ビルトインとして実行済み
/// - `None` — 該当するビルトインなし（外部コマンドとして実行すべき）
pub fn try_exec(shell: &mut Shell, args: &[String]) -> Option<Status> {
    let builtin = lookup(args.first()?)?;
    Some(match builtin {
        Builtin::Cd => builtin_cd(args),
        Builtin::Pwd => builtin_pwd(shell),
        Builtin::Exit => Status::Exit,
        Builtin::History => builtin_history(shell),
        Builtin::Replay(index) => shell.replay(index),
    })
}

/// `cd <dir>` — カレントディレクトリを変更する。2 つ目以降の引数は無視。
fn builtin_cd(args: &[String]) -> Status {
    let Some(target) = args.get(1) else {
        report(&ShellError::MissingArgument { command: "cd" });
        return Status::Failure;
    };
    match env::set_current_dir(target) {
        Ok(()) => Status::Success,
        Err(source) => {
            report(&ShellError::ChangeDirectory {
                path: target.clone(),
                source,
            });
            Status::Failure
        }
    }
}

/// `pwd` — カレントディレクトリを表示する。引数は無視。
fn builtin_pwd(shell: &mut Shell) -> Status {
    match env::current_dir() {
        Ok(dir) => {
            let _ = writeln!(shell.out, "{}", dir.display());
            Status::Success
        }
        Err(e) => {
            report(&ShellError::CurrentDir(e));
            Status::Failure
        }
    }
}

/// `history` — `N: 行` 形式で全エントリを古い順に表示する。
fn builtin_history(shell: &mut Shell) -> Status {
    for (index, line) in shell.history.list() {
        let _ = write!(shell.out, "{index}: {line}");
        if !line.ends_with('\n') {
            let _ = writeln!(shell.out);
        }
    }
    Status::Success
}
