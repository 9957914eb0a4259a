/// Filesystem listing and sniffing helpers.
pub mod fs;
