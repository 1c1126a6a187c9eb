//! コマンド履歴の管理。
//!
//! 入力行（末尾改行込み）をそのまま古い順に保持する。メモリ上のみで永続化はしない。
//!
//! - 容量は固定（既定 [`DEFAULT_CAPACITY`]）。超過時は最古のエントリを捨て、残りは順序を保って 1 つ前にずれる
//! - 空白だけの行は記録しない
//! - 番号は 1 始まりで、保持している最古のエントリが 1

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{Result, ShellError};

/// 既定の履歴容量。
pub const DEFAULT_CAPACITY: usize = 146;

/// コマンド履歴。
pub struct History {
    /// 履歴エントリ（古い順）。
    entries: VecDeque<String>,
    /// 保持する最大エントリ数。
    capacity: usize,
}

impl History {
    /// 容量 `capacity` の空の履歴を作る。容量 0 は 1 に切り上げる。
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 行を末尾に追加する。空白のみの行は無視。容量超過時は最古を捨てる。
    pub fn record(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                debug!(evicted = evicted.trim_end(), "history full, dropped oldest entry");
            }
        }
        self.entries.push_back(line.to_string());
    }

    /// `(1 始まりの番号, 行)` を古い順に返す。
    pub fn list(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, line.as_str()))
    }

    /// 1 始まりの番号でエントリを引く。範囲外なら [`ShellError::InvalidHistoryIndex`]。
    pub fn get(&self, index: usize) -> Result<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
            .ok_or(ShellError::InvalidHistoryIndex(index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(h: &History) -> Vec<String> {
        h.list().map(|(_, l)| l.to_string()).collect()
    }

    #[test]
    fn record_skips_blank_lines() {
        let mut h = History::new(4);
        h.record("\n");
        h.record("   \t\n");
        h.record("");
        assert!(h.is_empty());

        h.record("ls\n");
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut h = History::new(4);
        h.record("pwd\n");
        h.record("pwd\n");
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn list_is_one_based_and_restartable() {
        let mut h = History::new(4);
        h.record("a\n");
        h.record("b\n");
        let first: Vec<_> = h.list().collect();
        let second: Vec<_> = h.list().collect();
        assert_eq!(first, vec![(1, "a\n"), (2, "b\n")]);
        assert_eq!(first, second);
    }

    #[test]
    fn overflow_keeps_last_k_in_order() {
        let k = 5;
        let mut h = History::new(k);
        for i in 0..k + 3 {
            h.record(&format!("cmd{i}\n"));
        }
        assert_eq!(h.len(), k);
        let expected: Vec<String> = (3..k + 3).map(|i| format!("cmd{i}\n")).collect();
        assert_eq!(lines(&h), expected);
        assert_eq!(h.get(1).unwrap(), "cmd3\n");
    }

    #[test]
    fn default_capacity() {
        let mut h = History::default();
        for i in 0..DEFAULT_CAPACITY + 1 {
            h.record(&format!("echo {i}\n"));
        }
        assert_eq!(h.len(), DEFAULT_CAPACITY);
        assert_eq!(h.get(1).unwrap(), "echo 1\n");
    }

    #[test]
    fn get_out_of_range() {
        let mut h = History::new(3);
        h.record("a\n");
        h.record("b\n");
        assert!(matches!(h.get(0), Err(ShellError::InvalidHistoryIndex(0))));
        assert!(matches!(h.get(3), Err(ShellError::InvalidHistoryIndex(3))));
        assert_eq!(h.get(2).unwrap(), "b\n");
    }

    #[test]
    fn zero_capacity_rounds_up() {
        let mut h = History::new(0);
        h.record("a\n");
        h.record("b\n");
        assert_eq!(h.capacity(), 1);
        assert_eq!(lines(&h), vec!["b\n"]);
    }
}
