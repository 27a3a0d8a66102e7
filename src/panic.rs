//! Panic payload formatting for notice handlers.
//!
//! Notice handlers are user code run on the engine task. A panicking handler
//! is caught and logged so the connection survives it.

use std::{any::Any, fmt};

/// Formats a panic payload when logged or displayed.
///
/// The payload is downcast to `String` or `&'static str` if possible and
/// falls back to `Debug` formatting otherwise.
#[derive(Debug)]
pub(crate) struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

pub(crate) fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(panic) }

#[cfg(test)]
mod tests {
    use std::panic::catch_unwind;

    use super::*;

    #[test]
    fn string_payloads_render_verbatim() {
        let payload = catch_unwind(|| panic!("handler failed for {}", 7)).expect_err("panics");
        assert_eq!(format_panic(payload).to_string(), "handler failed for 7");
        assert_eq!(format_panic(Box::new("boom")).to_string(), "boom");
    }

    #[test]
    fn opaque_payloads_fall_back_to_debug() {
        assert!(format_panic(Box::new(5_u32)).to_string().contains("Any"));
    }
}
