//! 連接: `;` で文に分け、各文を `&&` で部分文に分けて左から実行する。
//!
//! - 部分文が失敗したら、その文の残りの部分文は実行しない
//! - 次の文（`;` の後）は前の文の結果に関係なく実行する
//! - 前後の空白を除いて空になった部分文は飛ばす（連鎖には影響しない）
//! - `exit` が実行されたら行全体をそこで打ち切る

use crate::executor::Status;
use crate::shell::Shell;

/// 部分文の前後を整える。先頭は空白、末尾は空白と改行を落とす。
fn trim_sub(s: &str) -> &str {
    s.trim_start_matches(' ').trim_end_matches(&[' ', '\n'][..])
}

/// 行を文 × 部分文に分割する。空の部分文は含めない。
pub fn split_statements(line: &str) -> Vec<Vec<&str>> {
    line.split(';')
        .map(|stmt| {
            stmt.split("&&")
                .map(trim_sub)
                .filter(|sub| !sub.is_empty())
                .collect()
        })
        .collect()
}

impl Shell {
    /// 連接された行を実行する。最後に実行した部分文の結果を返す（何も実行しなければ成功）。
    pub fn run_sequence(&mut self, line: &str) -> Status {
        let mut last = Status::Success;
        for statement in split_statements(line) {
            for sub in statement {
                let status = self.run_command(sub);
                if status.is_exit() {
                    return Status::Exit;
                }
                last = status;
                if !status.is_success() {
                    break;
                }
            }
        }
        last
    }
}
