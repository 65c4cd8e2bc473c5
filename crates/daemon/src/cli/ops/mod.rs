pub mod daemon;
pub mod share;
pub mod token;
pub mod version;
pub mod volumes;

pub use daemon::Daemon;
pub use share::Share;
pub use token::Token;
pub use version::Version;
pub use volumes::Volumes;
