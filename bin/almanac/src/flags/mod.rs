//! Flag groups shared by the almanac subcommands.

mod globals;
pub use globals::GlobalArgs;

mod filter;
pub use filter::FilterArgs;

mod cache;
pub use cache::CacheArgs;
