pub mod dispatcher;
pub mod exposition;
pub mod job_store_client;
pub mod metrics_client;
pub mod queue;
pub mod retention;
pub mod storage;
