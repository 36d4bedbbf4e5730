pub mod backoff;
pub mod sync;
