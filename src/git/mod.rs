pub mod remote_tags;
pub mod source;

pub use remote_tags::parse_ls_remote;
pub use source::ParsedSource;
