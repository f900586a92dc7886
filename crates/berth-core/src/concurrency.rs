use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Route Ctrl-C into `token`. A second signal exits immediately.
pub fn install_signal_handler(token: CancellationToken) {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        token.cancel();
        eprintln!("\ncancelling, press Ctrl-C again to exit now...");
    });
}
