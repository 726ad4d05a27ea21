pub use hf_trace::{TraceError, TraceHook};

use hf_trace::PayloadBuilder;

/// Builds a payload and forwards it to the hook, if any. Trace failures never
/// disturb dispatch; they are only logged.
pub(crate) fn emit<F>(hook: Option<&TraceHook>, record: u8, with_timestamp: bool, build: F)
where
    F: FnOnce(&mut PayloadBuilder),
{
    if let Some(hook) = hook {
        let mut payload = PayloadBuilder::with_capacity(16);
        build(&mut payload);
        emit_payload(hook, record, payload.as_slice(), with_timestamp);
    }
}

/// Forwards a ready payload. Failures are only logged.
pub(crate) fn emit_payload(hook: &TraceHook, record: u8, payload: &[u8], with_timestamp: bool) {
    if let Err(err) = hook(record, payload, with_timestamp) {
        log::debug!("trace record {record} dropped: {err}");
    }
}
