//! One-way latch tracking whether the VM's bootstrap-sensitive class set has
//! finished initializing.
//!
//! Some VMs initialize a privileged bootstrap-class-loader helper lazily;
//! redefining classes before that helper is up can produce internal VM
//! errors. The latch starts closed, is released at most once during the
//! `VMInit` callback, and never reverts. Until it is released the
//! redefinition pipeline must treat every intercepted class as a logged
//! no-op.

use std::sync::atomic::{AtomicBool, Ordering};

/// Release/acquire latch; the only mutable state shared across callbacks
/// besides the pipeline's exchange lock.
#[derive(Debug, Default)]
pub struct BootstrapGate {
    ready: AtomicBool,
}

impl BootstrapGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the bootstrap class set is known to be initialized.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Releases the latch. Idempotent; the release ordering makes the
    /// transition visible to every thread before any dependent read.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }
}
