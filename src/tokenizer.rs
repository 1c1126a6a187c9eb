//! トークナイザ: 1 コマンド分のテキストを引数ベクタに分割する。
//!
//! 区切りは空白・タブ・改行のみ。連続する区切りは 1 つとみなし、空トークンは作らない。
//! クォート、エスケープ、変数展開、glob は扱わない。
//!
//! 各トークンは独立した `String` として所有される（入力バッファを書き換えない）。
//! 末尾の番兵は `Vec` の終端が担い、exec 直前に [`spawn`](crate::spawn) が
//! NULL 終端ポインタ配列へ変換する。

/// トークンベクタの最大長（番兵を含む）。実トークンは `MAX_TOKENS - 1` 個まで。
pub const MAX_TOKENS: usize = 200;

const DELIMITERS: &[char] = &[' ', '\t', '\n'];

/// `line` をトークンに分割する。
///
/// `MAX_TOKENS - 1` 個を超えた分は捨てる。空白のみの入力は空ベクタ（先頭が番兵）になる。
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(DELIMITERS)
        .filter(|t| !t.is_empty())
        .take(MAX_TOKENS - 1)
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_command() {
        assert_eq!(tokenize("ls -la /tmp\n"), vec!["ls", "-la", "/tmp"]);
    }

    #[test]
    fn extra_whitespace() {
        assert_eq!(tokenize("  echo \t\t hello   world \n"), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t \n").is_empty());
        assert!(tokenize("\n").is_empty());
    }

    #[test]
    fn operators_are_plain_tokens() {
        assert_eq!(tokenize("echo hi >> out.txt"), vec!["echo", "hi", ">>", "out.txt"]);
    }

    #[test]
    fn no_quote_handling() {
        assert_eq!(tokenize("echo 'a b'"), vec!["echo", "'a", "b'"]);
    }

    #[test]
    fn token_limit() {
        let line = "x ".repeat(MAX_TOKENS * 2);
        assert_eq!(tokenize(&line).len(), MAX_TOKENS - 1);
    }
}
