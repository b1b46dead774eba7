pub mod exec_sql;
pub mod ingest;
pub mod pipeline;
pub mod schema;
