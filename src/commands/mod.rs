pub mod process;
pub mod retry;

pub use process::process_dataset;
pub use retry::retry_failed;
