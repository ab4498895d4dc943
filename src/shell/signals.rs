//! Signal dispositions for the shell and its children, and the
//! foreground-only mode toggled by `SIGTSTP`.
//!
//! | signal  | shell        | foreground child | background child |
//! |---------|--------------|------------------|------------------|
//! | SIGINT  | ignored      | default          | ignored          |
//! | SIGTSTP | toggle mode  | ignored          | ignored          |

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};

use failure::ResultExt;
use log::{debug, error};
use nix::{
    libc,
    sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal},
    unistd,
};

use crate::errors::{ErrorKind, Result};

/// Interrupts a foreground child; the shell and background children ignore it.
pub const INTERRUPT_SIGNAL: Signal = Signal::SIGINT;
/// Flips foreground-only mode.
pub const TOGGLE_SIGNAL: Signal = Signal::SIGTSTP;

pub const ENTER_FOREGROUND_ONLY_MESSAGE: &str =
    "Entering foreground-only mode (& is now ignored)\n";
pub const EXIT_FOREGROUND_ONLY_MESSAGE: &str = "Exiting foreground-only mode\n";

/// Written only by the toggle handler.
static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

/// Returns `true` while background requests are ignored.
pub fn foreground_only() -> bool {
    FOREGROUND_ONLY.load(Ordering::SeqCst)
}

/// Flips `flag` and returns the message announcing its new value.
///
/// Async-signal-safe: one atomic read-modify-write, no allocation.
fn toggle(flag: &AtomicBool) -> &'static str {
    if flag.fetch_xor(true, Ordering::SeqCst) {
        EXIT_FOREGROUND_ONLY_MESSAGE
    } else {
        ENTER_FOREGROUND_ONLY_MESSAGE
    }
}

extern "C" fn handle_toggle(_: libc::c_int) {
    let message = toggle(&FOREGROUND_ONLY);
    // Nothing can be reported from inside the handler.
    let _ = unistd::write(libc::STDOUT_FILENO, message.as_bytes());
}

/// The possible dispositions for a signal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Disposition {
    /// Execute the default action for the signal.
    Default,
    /// Ignore the arrival of the signal.
    Ignore,
    /// Flip foreground-only mode. Only the shell holds this disposition.
    Toggle,
}

impl Disposition {
    fn action(self) -> SigAction {
        match self {
            Disposition::Default => {
                SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty())
            }
            Disposition::Ignore => {
                SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty())
            }
            // Block everything while the handler runs; restart an interrupted
            // prompt read instead of failing it.
            Disposition::Toggle => SigAction::new(
                SigHandler::Handler(handle_toggle),
                SaFlags::SA_RESTART,
                SigSet::all(),
            ),
        }
    }
}

/// Sets the disposition of `signal` for the current process.
pub fn set_disposition(signal: Signal, disposition: Disposition) -> Result<()> {
    debug!("setting {:?} to {:?}", signal, disposition);
    // The handler only touches an atomic and calls write(2).
    let result = unsafe { signal::sigaction(signal, &disposition.action()) };
    result.context(ErrorKind::Nix)?;
    Ok(())
}

/// Installs the shell's own dispositions: interrupts are ignored and the
/// toggle signal flips foreground-only mode.
pub fn install_shell_policy() -> Result<()> {
    set_disposition(INTERRUPT_SIGNAL, Disposition::Ignore)?;
    set_disposition(TOGGLE_SIGNAL, Disposition::Toggle)?;
    Ok(())
}

/// Applies the dispositions a freshly spawned child must hold until exec.
///
/// Called between fork and exec only, so it does not log.
pub fn apply_child_policy(background: bool) -> Result<()> {
    let apply = |signal: Signal, disposition: Disposition| {
        let result = unsafe { signal::sigaction(signal, &disposition.action()) };
        result.map(|_| ()).context(ErrorKind::Nix)
    };

    if !background {
        apply(INTERRUPT_SIGNAL, Disposition::Default)?;
    }
    apply(TOGGLE_SIGNAL, Disposition::Ignore)?;
    // The Rust runtime ignores SIGPIPE and exec would carry that over.
    apply(Signal::SIGPIPE, Disposition::Default)?;
    Ok(())
}

fn toggle_mask(how: SigmaskHow) -> Result<()> {
    let mut set = SigSet::empty();
    set.add(TOGGLE_SIGNAL);
    signal::sigprocmask(how, Some(&set), None).context(ErrorKind::SignalMask)?;
    Ok(())
}

/// Defers delivery of the toggle signal while the shell waits on a
/// foreground child. A toggle arriving meanwhile stays pending and is handled
/// once the block is released.
///
/// Dropping the value without calling [`ToggleBlock::release`] still unblocks
/// the signal, but a failure to do so can only be logged.
#[derive(Debug)]
pub struct ToggleBlock(());

impl ToggleBlock {
    pub fn acquire() -> Result<Self> {
        toggle_mask(SigmaskHow::SIG_BLOCK)?;
        Ok(ToggleBlock(()))
    }

    pub fn release(self) -> Result<()> {
        mem::forget(self);
        toggle_mask(SigmaskHow::SIG_UNBLOCK)
    }
}

impl Drop for ToggleBlock {
    fn drop(&mut self) {
        let temp_result = toggle_mask(SigmaskHow::SIG_UNBLOCK);
        if let Err(ref e) = temp_result {
            error!("cannot unblock {:?}: {}", TOGGLE_SIGNAL, e);
        }
    }
}
