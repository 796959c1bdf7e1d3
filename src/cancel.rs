//! Ctrl+C handling: finish the current pattern, then stop.

use std::sync::atomic::{AtomicBool, Ordering};

static CANCELLED: AtomicBool = AtomicBool::new(false);

pub fn is_cancelled() -> bool {
    CANCELLED.load(Ordering::SeqCst)
}

/// Register the Ctrl+C handler. A second Ctrl+C exits immediately.
pub fn register_handler() {
    let result = ctrlc::set_handler(move || {
        if CANCELLED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("\nStopping after the current pattern (Ctrl+C again to abort)");
    });
    if let Err(e) = result {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }
}
