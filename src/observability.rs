use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("gemini_chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("gemini_chat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("gemini_chat.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("gemini_chat.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("gemini_chat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("gemini_chat.stream.bytes");

pub(crate) static SESSIONS_CREATED: Counter = Counter::new("gemini_chat.session.created");
pub(crate) static SESSION_ERRORS: Counter = Counter::new("gemini_chat.session.errors");

pub(crate) static SUBMISSIONS: Counter = Counter::new("gemini_chat.chat.submissions");
pub(crate) static SUBMISSIONS_REJECTED: Counter =
    Counter::new("gemini_chat.chat.submissions_rejected");
pub(crate) static SUBMISSIONS_FAILED: Counter =
    Counter::new("gemini_chat.chat.submissions_failed");
pub(crate) static REPLY_FRAGMENTS: Counter = Counter::new("gemini_chat.chat.reply_fragments");
pub(crate) static REPLY_DURATION: Moments =
    Moments::new("gemini_chat.chat.reply_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&SESSIONS_CREATED);
    collector.register_counter(&SESSION_ERRORS);

    collector.register_counter(&SUBMISSIONS);
    collector.register_counter(&SUBMISSIONS_REJECTED);
    collector.register_counter(&SUBMISSIONS_FAILED);
    collector.register_counter(&REPLY_FRAGMENTS);
    collector.register_moments(&REPLY_DURATION);
}
