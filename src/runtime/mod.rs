pub mod codec;
pub mod context;
pub mod flow;
pub mod redis_storage;
pub mod retry;
pub mod storage;
pub mod task;
pub mod triggers;
pub(crate) mod validate;
