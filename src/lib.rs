pub mod domain;
pub mod executor;
pub mod pool;
pub mod store;
pub mod workload;
