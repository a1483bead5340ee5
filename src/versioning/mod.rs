pub mod resolver;
pub mod selector;

pub use resolver::VersionResolver;
pub use selector::Selector;
