use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use crate::error::Result;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Number of SIGINTs seen while at least one listener was installed.
static RECEIVED: AtomicU64 = AtomicU64::new(0);

/// Observes SIGINT while alive. The first listener installs the handler, the
/// last one to drop puts the previous disposition back, so Ctrl-C terminates
/// the process again once no pool is listening.
pub(crate) struct InterruptListener {
    generation: u64,
}

impl InterruptListener {
    pub fn install() -> Result<InterruptListener> {
        registration::acquire()?;
        Ok(InterruptListener {
            generation: RECEIVED.load(Ordering::SeqCst),
        })
    }

    pub fn received(&self) -> bool {
        RECEIVED.load(Ordering::SeqCst) != self.generation
    }
}

impl Drop for InterruptListener {
    fn drop(&mut self) {
        registration::release();
    }
}

#[cfg(unix)]
mod registration {
    use std::sync::atomic::Ordering;
    use nix::libc::c_int;
    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
    use parking_lot::Mutex;
    use tracing::{debug, warn};
    use crate::error::{Error, Result};
    use crate::interrupt::RECEIVED;

    struct Registration {
        listeners: usize,
        previous: Option<SigAction>,
    }

    static REGISTRATION: Mutex<Registration> = parking_lot::const_mutex(Registration {
        listeners: 0,
        previous: None,
    });

    extern "C" fn on_interrupt(_: c_int) {
        RECEIVED.fetch_add(1, Ordering::SeqCst);
    }

    pub fn acquire() -> Result<()> {
        let mut registration = REGISTRATION.lock();
        if registration.listeners == 0 {
            let action = SigAction::new(SigHandler::Handler(on_interrupt), SaFlags::SA_RESTART, SigSet::empty());
            // SAFETY: the handler only increments an atomic counter.
            let previous = unsafe { signal::sigaction(Signal::SIGINT, &action) }
                .map_err(|e| Error::InterruptHandler(e.into()))?;
            registration.previous = Some(previous);
            debug!("installed interrupt handler");
        }
        registration.listeners += 1;
        Ok(())
    }

    pub fn release() {
        let mut registration = REGISTRATION.lock();
        registration.listeners = registration.listeners.saturating_sub(1);
        if registration.listeners > 0 {
            return;
        }
        if let Some(previous) = registration.previous.take() {
            // SAFETY: restores the disposition that was active before `acquire`.
            match unsafe { signal::sigaction(Signal::SIGINT, &previous) } {
                Ok(_) => debug!("restored previous interrupt handler"),
                Err(e) => warn!(error = %e, "could not restore previous interrupt handler"),
            }
        }
    }
}

#[cfg(not(unix))]
mod registration {
    use tracing::warn;
    use crate::error::Result;

    pub fn acquire() -> Result<()> {
        warn!("interrupt handling is not supported on this platform");
        Ok(())
    }

    pub fn release() {}
}

/// Turns a received interrupt into a cancellation of one pool run.
#[derive(Clone)]
pub(crate) struct InterruptWatch {
    listener: Arc<InterruptListener>,
    interrupted: Arc<AtomicBool>,
}

impl InterruptWatch {
    pub fn install() -> Result<InterruptWatch> {
        Ok(InterruptWatch {
            listener: Arc::new(InterruptListener::install()?),
            interrupted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Cancels `cancel_token` if an interrupt has arrived. Returns whether one has.
    pub fn check(&self, cancel_token: &CancellationToken) -> bool {
        if self.interrupted.load(Ordering::SeqCst) {
            return true;
        }
        if !self.listener.received() {
            return false;
        }
        if !self.interrupted.swap(true, Ordering::SeqCst) {
            warn!("interrupt received, cancelling outstanding tasks");
        }
        cancel_token.cancel();
        true
    }

    /// Polls for an interrupt until one arrives or the run is cancelled otherwise.
    pub async fn watch(self, cancel_token: CancellationToken) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return,
                _ = interval.tick() => {}
            }
            if self.check(&cancel_token) {
                return;
            }
        }
    }
}
