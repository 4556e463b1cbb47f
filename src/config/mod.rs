mod repo;
mod store;

pub use repo::{Identity, RepoConfig};
pub use store::{ConfigStore, EnvStore, keys};
