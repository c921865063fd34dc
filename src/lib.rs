pub mod error;
pub mod leadtime;
pub mod notebook;
pub mod output;
pub mod runtime;
pub mod summary;
