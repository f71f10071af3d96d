mod account;
mod credits;
mod entry;
mod ledger;
mod role;

pub use account::*;
pub use credits::*;
pub use entry::*;
pub use ledger::*;
pub use role::*;
