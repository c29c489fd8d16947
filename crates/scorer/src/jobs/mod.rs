mod fetcher_impls;
mod ingestion_jobs;
mod pipeline_jobs;

pub use ingestion_jobs::*;
pub use pipeline_jobs::*;
