mod walk;

pub use walk::{list_directory, scan_module_dir};
