//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints lifecycle events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [closing] proxy=proxy-3
//! [closed] proxy=proxy-3
//! [aborting] proxy=proxy-4 reason="channel faulted"
//! [aborted] proxy=proxy-4
//! [disposed] proxy=proxy-4
//! ```

use async_trait::async_trait;

use crate::events::ChannelEvent;
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

impl LogWriter {
    fn line(e: &ChannelEvent) -> String {
        match &e.reason {
            Some(reason) => format!("[{}] proxy={} reason={:?}", e.kind.as_label(), e.proxy, reason),
            None => format!("[{}] proxy={}", e.kind.as_label(), e.proxy),
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &ChannelEvent) {
        println!("{}", Self::line(e));
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ProxyId;
    use crate::events::ChannelEventKind;

    #[test]
    fn reason_is_quoted() {
        let proxy = ProxyId::next();
        let ev = ChannelEvent::new(ChannelEventKind::Aborting, proxy).with_reason("channel faulted");
        assert_eq!(
            LogWriter::line(&ev),
            format!("[aborting] proxy={proxy} reason=\"channel faulted\"")
        );
    }
}
