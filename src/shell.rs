//! インタプリタの状態と行単位のディスパッチ。
//!
//! [`Shell`] は履歴、フォアグラウンド参照、ビルトインの出力先、設定を所有し、
//! executor / pipeline / sequence の各処理は `impl Shell` として実装される。
//! フォアグラウンド参照だけはシグナルハンドラと共有するため `&'static` で受け取る。

use std::io::{self, Write};

use crate::executor::Status;
use crate::history::{History, DEFAULT_CAPACITY};
use crate::signal::Foreground;

/// 起動時設定。`main.rs` の CLI 引数から組み立てる。
#[derive(Debug, Clone)]
pub struct Config {
    /// プロンプト文字列。SIGINT 通知の後にも再表示される。
    pub prompt: String,
    /// 履歴の容量。
    pub history_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: "minish> ".to_string(),
            history_size: DEFAULT_CAPACITY,
        }
    }
}

/// シェルの実行状態。REPL ループ全体で共有される。
pub struct Shell {
    pub config: Config,
    pub history: History,
    /// 待機中の子プロセス。[`signal::install`](crate::signal::install) に渡したものと同じ。
    pub foreground: &'static Foreground,
    /// ビルトインと再実行通知の出力先。外部コマンドは fd 1 に直接書く。
    pub out: Box<dyn Write>,
    /// `!N` の入れ子の深さ。
    pub(crate) replay_depth: usize,
}

impl Shell {
    pub fn new(config: Config, foreground: &'static Foreground) -> Self {
        Self {
            history: History::new(config.history_size),
            config,
            foreground,
            out: Box::new(io::stdout()),
            replay_depth: 0,
        }
    }

    /// ビルトイン出力先を差し替える。
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    /// 入力 1 行を履歴に記録してから実行する。REPL から呼ばれる入口。
    pub fn handle_line(&mut self, line: &str) -> Status {
        self.history.record(line);
        self.execute_line(line)
    }

    /// `|` を含む行はパイプラインとして、それ以外は `;` / `&&` の連接として実行する。
    pub fn execute_line(&mut self, line: &str) -> Status {
        if line.contains('|') {
            self.run_pipeline(line)
        } else {
            self.run_sequence(line)
        }
    }

    /// fork 前に、親がバッファしている出力を吐き出す。
    pub(crate) fn flush_output(&mut self) {
        let _ = self.out.flush();
        let _ = io::stdout().flush();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! テスト用のシェル生成と出力キャプチャ。

    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;
    use std::sync::Mutex;

    use super::{Config, Shell};
    use crate::signal::Foreground;

    /// カレントディレクトリを変更する/依存するテストはこれで直列化する。
    pub static CWD_LOCK: Mutex<()> = Mutex::new(());

    /// SIGINT ハンドラを差し替えるテストはこれで直列化する（中継先はプロセスで 1 つ）。
    pub static SIGNAL_LOCK: Mutex<()> = Mutex::new(());

    /// 書き込まれたバイト列を共有する `Write`。
    #[derive(Clone, Default)]
    pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub fn test_shell() -> (Shell, SharedBuf) {
        let fg: &'static Foreground = Box::leak(Box::new(Foreground::new()));
        let buf = SharedBuf::default();
        let shell = Shell::new(Config::default(), fg).with_output(Box::new(buf.clone()));
        (shell, buf)
    }
}
