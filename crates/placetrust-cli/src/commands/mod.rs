//! Command implementations.

pub mod history;
pub mod nearby;
pub mod profile;
pub mod score;
pub mod show;
pub mod watch;

pub use self::history::execute_history;
pub use self::nearby::execute_nearby;
pub use self::profile::execute_profile;
pub use self::score::execute_score;
pub use self::show::execute_show;
pub use self::watch::execute_watch;
