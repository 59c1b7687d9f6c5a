use biometrics::{Collector, Counter, Moments};

pub(crate) static BACKEND_REQUESTS: Counter = Counter::new("chatstream.backend.requests");
pub(crate) static BACKEND_REQUEST_ERRORS: Counter =
    Counter::new("chatstream.backend.request_errors");
pub(crate) static BACKEND_REQUEST_DURATION: Moments =
    Moments::new("chatstream.backend.request_duration_seconds");

pub(crate) static STREAM_OPENED: Counter = Counter::new("chatstream.stream.opened");
pub(crate) static STREAM_EVENTS: Counter = Counter::new("chatstream.stream.events");
pub(crate) static STREAM_MALFORMED: Counter = Counter::new("chatstream.stream.malformed");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("chatstream.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("chatstream.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("chatstream.stream.duration_seconds");

pub(crate) static CHAT_SENDS: Counter = Counter::new("chatstream.chat.sends");
pub(crate) static CHAT_SEND_FAILURES: Counter = Counter::new("chatstream.chat.send_failures");
pub(crate) static CHAT_CANCELLED: Counter = Counter::new("chatstream.chat.cancelled");
pub(crate) static HISTORY_LOADS: Counter = Counter::new("chatstream.history.loads");
pub(crate) static HISTORY_FAILURES: Counter = Counter::new("chatstream.history.failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&BACKEND_REQUESTS);
    collector.register_counter(&BACKEND_REQUEST_ERRORS);
    collector.register_moments(&BACKEND_REQUEST_DURATION);

    collector.register_counter(&STREAM_OPENED);
    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_MALFORMED);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&CHAT_SENDS);
    collector.register_counter(&CHAT_SEND_FAILURES);
    collector.register_counter(&CHAT_CANCELLED);
    collector.register_counter(&HISTORY_LOADS);
    collector.register_counter(&HISTORY_FAILURES);
}
