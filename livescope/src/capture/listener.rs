//! The ingestion-facing contract.
//!
//! A capture transport delivers each observed event through exactly one of
//! the typed methods below, or hands a [`CaptureEvent`] to [`CaptureListener::handle`],
//! which routes every variant to its method.

use livescope_common::{AddressInfo, CallStack, CallstackEvent, CaptureEvent, TimerRecord};

use crate::domain::IngestError;

/// Sink for capture events.
///
/// Methods take `&self`: a sink is shared between the producer threads that
/// feed it and the consumers that query it. Only timers can be rejected; the
/// other kinds are stored without semantic validation.
pub trait CaptureListener: Send + Sync {
    /// A completed function call.
    ///
    /// # Errors
    ///
    /// Implementations reject malformed records and report fatal storage
    /// failures; see [`IngestError`].
    fn on_timer(&self, timer: TimerRecord) -> Result<(), IngestError>;

    /// An interned string, e.g. symbol text referenced by key.
    fn on_key_and_string(&self, key: u64, string: String);

    /// A resolved call stack keyed by its content hash.
    fn on_callstack(&self, callstack: CallStack);

    /// A sample referencing a call stack by key. The key may be unknown.
    fn on_callstack_event(&self, event: CallstackEvent);

    fn on_thread_name(&self, thread_id: i32, name: String);

    fn on_address_info(&self, address_info: AddressInfo);

    /// Route one event to the matching method.
    ///
    /// # Errors
    ///
    /// Propagates the error of [`CaptureListener::on_timer`].
    fn handle(&self, event: CaptureEvent) -> Result<(), IngestError> {
        match event {
            CaptureEvent::Timer(timer) => return self.on_timer(timer),
            CaptureEvent::KeyAndString { key, string } => self.on_key_and_string(key, string),
            CaptureEvent::Callstack(callstack) => self.on_callstack(callstack),
            CaptureEvent::CallstackEvent(event) => self.on_callstack_event(event),
            CaptureEvent::ThreadName { thread_id, name } => self.on_thread_name(thread_id, name),
            CaptureEvent::AddressInfo(info) => self.on_address_info(info),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }

    impl CaptureListener for Recorder {
        fn on_timer(&self, _: TimerRecord) -> Result<(), IngestError> {
            self.seen.lock().push("timer");
            Ok(())
        }
        fn on_key_and_string(&self, _: u64, _: String) {
            self.seen.lock().push("string");
        }
        fn on_callstack(&self, _: CallStack) {
            self.seen.lock().push("callstack");
        }
        fn on_callstack_event(&self, _: CallstackEvent) {
            self.seen.lock().push("callstack_event");
        }
        fn on_thread_name(&self, _: i32, _: String) {
            self.seen.lock().push("thread_name");
        }
        fn on_address_info(&self, _: AddressInfo) {
            self.seen.lock().push("address_info");
        }
    }

    #[test]
    fn test_handle_routes_every_variant() {
        let recorder = Recorder::default();
        let events = vec![
            CaptureEvent::Timer(TimerRecord::new(1, 1, 0, 1)),
            CaptureEvent::KeyAndString { key: 1, string: "main".into() },
            CaptureEvent::Callstack(CallStack::new(vec![1, 2])),
            CaptureEvent::CallstackEvent(CallstackEvent {
                time_ns: 5,
                callstack_hash: 9,
                thread_id: 1,
            }),
            CaptureEvent::ThreadName { thread_id: 1, name: "worker".into() },
            CaptureEvent::AddressInfo(AddressInfo {
                absolute_address: 1,
                function_name: "main".into(),
                offset_in_function: 0,
                module_path: "/bin/app".into(),
            }),
        ];
        for event in events {
            recorder.handle(event).unwrap();
        }

        assert_eq!(
            *recorder.seen.lock(),
            vec!["timer", "string", "callstack", "callstack_event", "thread_name", "address_info"]
        );
    }
}
