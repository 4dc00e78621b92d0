pub mod listing;
pub mod renamer;
pub mod s3_store;
pub mod store;
