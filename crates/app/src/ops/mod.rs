pub mod fetch;
pub mod health;
pub mod identity;
pub mod init;
pub mod serve;
pub mod store;
pub mod version;

pub use fetch::Fetch;
pub use health::Health;
pub use identity::Identity;
pub use init::Init;
pub use serve::Serve;
pub use store::Store;
pub use version::Version;
