/// JSON documents: encoding cascade, parse diagnostics, whole-file writes
pub mod load_from_file;
