//! SIGINT の中継とフォアグラウンドプロセス参照。
//!
//! [`Foreground`] は「いま待機中の子プロセス」の PID を保持するスロット。
//! 単一コマンドなら 1 つ、パイプラインなら全セグメント分（最大 [`MAX_SEGMENTS`]）を入れる。
//! 書き込むのは executor / pipeline の待機直前・直後だけで、読むのはシグナルハンドラだけ。
//!
//! ハンドラはプロセス全体で 1 つなので、[`install`] で渡された `&'static Foreground` を
//! アトミックポインタ経由で参照する。ハンドラ内では `kill` と `write` 以外は呼ばない。

use std::io;
use std::ptr;
use std::sync::atomic::{AtomicI32, AtomicPtr, Ordering};
use std::sync::OnceLock;

use libc::pid_t;
use tracing::info;

use crate::pipeline::MAX_SEGMENTS;

/// 現在フォアグラウンドで待機中の子プロセス群。0 は空きスロット。
pub struct Foreground {
    pids: [AtomicI32; MAX_SEGMENTS],
}

impl Foreground {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY: AtomicI32 = AtomicI32::new(0);
        Self {
            pids: [EMPTY; MAX_SEGMENTS],
        }
    }

    /// フォアグラウンドを `pids` に置き換える。スロット数を超えた分は無視。
    pub fn set(&self, pids: &[pid_t]) {
        for (i, slot) in self.pids.iter().enumerate() {
            slot.store(pids.get(i).copied().unwrap_or(0), Ordering::SeqCst);
        }
    }

    /// 1 プロセス分だけ空きにする（そのプロセスを reap した後に呼ぶ）。
    pub fn release(&self, pid: pid_t) {
        for slot in &self.pids {
            let _ = slot.compare_exchange(pid, 0, Ordering::SeqCst, Ordering::SeqCst);
        }
    }

    pub fn clear(&self) {
        self.set(&[]);
    }

    /// 現在の PID 一覧。
    pub fn pids(&self) -> Vec<pid_t> {
        self.pids
            .iter()
            .map(|s| s.load(Ordering::SeqCst))
            .filter(|&p| p > 0)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.iter().all(|s| s.load(Ordering::SeqCst) <= 0)
    }

    /// 登録済みの全プロセスに `sig` を送る。1 つでも送ったら `true`。
    ///
    /// シグナルハンドラから呼ばれるため、アトミック操作と `kill` だけで構成する。
    pub fn forward(&self, sig: libc::c_int) -> bool {
        let mut sent = false;
        for slot in &self.pids {
            let pid = slot.load(Ordering::SeqCst);
            if pid > 0 {
                unsafe {
                    libc::kill(pid, sig);
                }
                sent = true;
            }
        }
        sent
    }
}

impl Default for Foreground {
    fn default() -> Self {
        Self::new()
    }
}

static RELAY_TARGET: AtomicPtr<Foreground> = AtomicPtr::new(ptr::null_mut());
static NOTICE: OnceLock<Vec<u8>> = OnceLock::new();

/// SIGINT ハンドラを設定する（`SA_RESTART`）。
///
/// フォアグラウンドがあればそこへ SIGINT を中継し、なければ
/// `\nInterrupted.\n` とプロンプトを stdout に書く。
/// 2 回目以降の呼び出しでは中継先だけが差し替わり、通知文は最初のものが使われる。
pub fn install(foreground: &'static Foreground, prompt: &str) -> io::Result<()> {
    let _ = NOTICE.set(format!("\nInterrupted.\n{prompt}").into_bytes());
    RELAY_TARGET.store(
        foreground as *const Foreground as *mut Foreground,
        Ordering::SeqCst,
    );

    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
        libc::sigemptyset(&mut sa.sa_mask);
        sa.sa_flags = libc::SA_RESTART;
        if libc::sigaction(libc::SIGINT, &sa, ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    info!("SIGINT relay installed");
    Ok(())
}

extern "C" fn on_interrupt(sig: libc::c_int) {
    let target = RELAY_TARGET.load(Ordering::SeqCst);
    // SAFETY: install() が 'static 参照だけを格納する
    if let Some(fg) = unsafe { target.as_ref() } {
        if fg.forward(sig) {
            return;
        }
    }
    if let Some(notice) = NOTICE.get() {
        unsafe {
            libc::write(
                libc::STDOUT_FILENO,
                notice.as_ptr() as *const libc::c_void,
                notice.len(),
            );
        }
    }
}
