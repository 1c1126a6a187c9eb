//! minish ライブラリ — テスト・ベンチマーク用にモジュールを公開する。
//!
//! バイナリ本体は `main.rs` の REPL ループ。
//! この `lib.rs` は `benches/bench_main.rs` 等の外部クレートから
//! トークナイザ・分割・履歴・spawn に直接アクセスするために存在する。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |-----------|------|
//! | [`tokenizer`] | 空白・タブ・改行でのトークン分割（最大 199 トークン） |
//! | [`redirect`] | `<`, `>`, `>>` の解釈と子プロセス内での fd 差し替え |
//! | [`history`] | コマンド履歴（固定容量、最古から破棄、1 始まりの番号） |
//! | [`builtins`] | ビルトイン（`cd`, `pwd`, `exit`, `history`, `!N`） |
//! | [`spawn`] | `fork` + `execvp` ラッパー、fd 配線、待機と終了ステータス解釈 |
//! | [`executor`] | 単一コマンドの実行、`!N` の再実行 |
//! | [`pipeline`] | `\|` で連結された最大 9 セグメントの同時実行 |
//! | [`sequence`] | `;` と `&&` による連接実行 |
//! | [`signal`] | SIGINT のフォアグラウンドプロセスへの中継 |
//! | [`shell`] | シェルの状態（履歴、フォアグラウンド参照、出力先、設定）と行ディスパッチ |
//! | [`error`] | 親プロセス側のエラー型 |

pub mod builtins;
pub mod error;
pub mod executor;
pub mod history;
pub mod pipeline;
pub mod redirect;
pub mod sequence;
pub mod shell;
pub mod signal;
pub mod spawn;
pub mod tokenizer;

pub use error::ShellError;
pub use executor::Status;
pub use shell::{Config, Shell};
