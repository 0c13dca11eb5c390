use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossterm::event::{DisableFocusChange, EnableFocusChange};
use crossterm::execute;

/// Attention changes reported by the host environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum AttentionSignal {
    VisibilityHidden,
    VisibilityVisible,
    FocusLost,
    FocusGained,
}

impl AttentionSignal {
    /// Whether this signal counts as a violation
    pub fn is_loss(&self) -> bool {
        matches!(self, Self::VisibilityHidden | Self::FocusLost)
    }
}

/// Process-wide source of attention signals.
///
/// Subscribing asks the host to start reporting visibility and focus
/// changes; the signals themselves arrive through the host event stream
/// (see `runtime::QuizEvent::Attention`).
pub trait AttentionSource {
    fn subscribe(&mut self) -> io::Result<()>;
    fn unsubscribe(&mut self) -> io::Result<()>;
}

/// Terminal focus reporting via crossterm.
///
/// Terminals have no visibility notion, so only focus signals are produced.
#[derive(Debug, Default)]
pub struct TerminalFocusSource {
    enabled: bool,
}

impl TerminalFocusSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttentionSource for TerminalFocusSource {
    fn subscribe(&mut self) -> io::Result<()> {
        execute!(io::stdout(), EnableFocusChange)?;
        self.enabled = true;
        Ok(())
    }

    fn unsubscribe(&mut self) -> io::Result<()> {
        if self.enabled {
            execute!(io::stdout(), DisableFocusChange)?;
            self.enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalFocusSource {
    fn drop(&mut self) {
        let _ = self.unsubscribe();
    }
}

/// Source for headless drivers and tests: signals are injected by hand and
/// subscription state is observable through cloned handles.
#[derive(Debug, Clone, Default)]
pub struct ManualAttentionSource {
    subscribed: Arc<AtomicBool>,
    subscriptions: Arc<AtomicUsize>,
}

impl ManualAttentionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    /// Total number of `subscribe` calls seen
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

impl AttentionSource for ManualAttentionSource {
    fn subscribe(&mut self) -> io::Result<()> {
        self.subscribed.store(true, Ordering::SeqCst);
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unsubscribe(&mut self) -> io::Result<()> {
        self.subscribed.store(false, Ordering::SeqCst);
        Ok(())
    }
}
