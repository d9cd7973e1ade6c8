#![cfg(not(target_arch = "wasm32"))]
#![allow(dead_code)]

use std::sync::Once;
use tracing::Level;

static LOG_INITIALIZED: Once = Once::new();

/// Routes all events, down to `TRACE`, into the captured test output.
pub fn init() {
	LOG_INITIALIZED.call_once(|| tracing_subscriber::fmt().with_max_level(Level::TRACE).with_test_writer().init());
}
