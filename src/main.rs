//! minish — `;` / `&&` / `|` / リダイレクトに対応した小さな対話シェル
//!
//! REPLループ: プロンプト表示 → 1 行読み取り → 履歴に記録 → 実行 → ループ
//!
//! `-c LINE` を渡すと 1 行だけ同じ経路で実行して終了する。

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use minish::history::DEFAULT_CAPACITY;
use minish::signal::{self, Foreground};
use minish::{Config, Shell, Status};

/// 1 行の最大長（改行込み）。
const MAX_INPUT: usize = 2000;

/// 連続した読み取りエラーがこの回数に達したら終了する。
const MAX_READ_FAILURES: u32 = 8;

/// SIGINT ハンドラと共有するフォアグラウンド参照。
static FOREGROUND: Foreground = Foreground::new();

#[derive(Parser, Debug)]
#[command(name = "minish", version, about = "A small interactive command interpreter")]
struct Cli {
    /// プロンプト文字列
    #[arg(long, default_value = "minish> ")]
    prompt: String,

    /// 保持する履歴の件数
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    history_size: usize,

    /// 1 行だけ実行して終了する
    #[arg(short = 'c', value_name = "LINE")]
    command: Option<String>,

    /// `RUST_LOG` 未設定時のログフィルタ
    #[arg(long, default_value = "warn")]
    log: String,
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// `MAX_INPUT - 1` バイトを超える行を文字境界で切り詰める。改行は残す。
fn clamp_line(line: &mut String) {
    if line.len() < MAX_INPUT {
        return;
    }
    let mut cut = MAX_INPUT - 2;
    while !line.is_char_boundary(cut) {
        cut -= 1;
    }
    warn!(len = line.len(), kept = cut, "input line too long, truncated");
    line.truncate(cut);
    line.push('\n');
}

/// 改行までをバイト列として読み、UTF-8 として不正なバイトは U+FFFD に置き換える。
///
/// 符号化の誤りは読み取りエラーにしない。戻り値は読んだバイト数（0 なら EOF）。
fn read_line_lossy<R: BufRead>(input: &mut R, line: &mut String) -> io::Result<usize> {
    let mut buf = Vec::new();
    let n = input.read_until(b'\n', &mut buf)?;
    match String::from_utf8(buf) {
        Ok(text) => *line = text,
        Err(e) => {
            warn!(len = n, "input line is not valid UTF-8, decoding lossily");
            *line = String::from_utf8_lossy(e.as_bytes()).into_owned();
        }
    }
    Ok(n)
}

fn repl<R: BufRead>(shell: &mut Shell, input: &mut R) -> anyhow::Result<()> {
    let mut failures = 0;
    let mut line = String::new();

    loop {
        print!("{}", shell.config.prompt);
        let _ = io::stdout().flush();

        match read_line_lossy(input, &mut line) {
            Ok(0) => {
                // EOF (Ctrl+D)
                println!();
                return Ok(());
            }
            Ok(_) => {
                failures = 0;
                clamp_line(&mut line);
                if shell.handle_line(&line).is_exit() {
                    return Ok(());
                }
            }
            Err(e) => {
                eprintln!("minish: Reading input failed: {e}");
                failures += 1;
                if failures >= MAX_READ_FAILURES {
                    bail!("giving up after {failures} consecutive read errors");
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let config = Config {
        prompt: cli.prompt,
        history_size: cli.history_size,
    };
    signal::install(&FOREGROUND, &config.prompt).context("installing SIGINT handler")?;
    let mut shell = Shell::new(config, &FOREGROUND);

    if let Some(mut line) = cli.command {
        if !line.ends_with('\n') {
            line.push('\n');
        }
        clamp_line(&mut line);
        let code = match shell.handle_line(&line) {
            Status::Failure => 1,
            Status::Success | Status::Exit => 0,
        };
        let _ = io::stdout().flush();
        std::process::exit(code);
    }

    let stdin = io::stdin();
    repl(&mut shell, &mut stdin.lock())
}
