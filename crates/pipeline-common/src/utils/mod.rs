mod files;

pub use files::sanitize_filename;
