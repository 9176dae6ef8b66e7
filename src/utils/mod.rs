pub mod fs;

pub use fs::{file_exists, read_file_to_string, write_file_atomic};
