pub mod byonic;

// Re-exports
pub use byonic::{LibraryEntry, LibraryError, LibraryErrorKind, parse_library};
