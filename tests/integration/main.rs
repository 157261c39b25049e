//! End-to-end tests over the public API: an in-memory draw source feeding
//! the service, the replay and the dashboard router.

mod memory_source;
mod pipeline;
