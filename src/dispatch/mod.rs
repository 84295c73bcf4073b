//! Event dispatch
//!
//! Routes owner messages to the voice and touches to the poke reaction.

mod message;
mod touch;

pub use message::{Dispatch, MAX_CONCURRENT_SPEECH, MessageDispatcher};
pub use touch::{
    BOUNCE_FILTER, DEBOUNCE_WINDOW, EdgeFilter, SysfsTouchSensor, TouchDebouncer, TouchDispatcher,
    TouchOutcome, TouchSensor, spawn_touch_watcher,
};
