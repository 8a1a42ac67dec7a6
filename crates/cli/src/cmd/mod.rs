mod args;
mod hash;
mod info;
mod order;
mod resolve;
mod setup;

pub use args::{HashArgs, ResolveArgs, SetupArgs};
pub use hash::cmd_hash;
pub use info::cmd_info;
pub use order::cmd_order;
pub use resolve::cmd_resolve;
pub use setup::cmd_setup;
