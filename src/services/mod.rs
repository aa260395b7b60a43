pub mod cache;
pub mod notify;
pub mod status;
pub mod storage;
