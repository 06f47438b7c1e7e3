mod browser;
mod client;
mod provider;
mod types;

pub use provider::GitLabProvider;
