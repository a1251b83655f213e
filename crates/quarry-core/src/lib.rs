//! Quarry Core - resolution and installation of registry projects.
//!
//! A project is looked up in the local registry cache first. On a miss it is
//! downloaded from an HTTP package registry, its integrity is verified, the
//! tarball is unpacked into the cache, dependencies are installed and the
//! project is loaded.
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry_core::{ProjectLookup, QuarryConfig};
//!
//! #[tokio::main]
//! async fn main() -> quarry_core::Result<()> {
//!     let config = QuarryConfig::new("http://localhost:4873", "./projects");
//!     let lookup = ProjectLookup::<serde_json::Value>::with_defaults(config)?;
//!
//!     let projects = lookup.resolve_all(["ddd-asserter", "hexagonal-asserter"]).await;
//!     println!("Resolved {} projects", projects.len());
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod installer;
pub mod integrity;
pub mod loader;
pub mod local;
pub mod lock;
pub mod lookup;
pub mod naming;
pub mod registry;
pub mod runner;

// Re-export commonly used types
pub use archive::{extract_entries, extract_entries_async, write_entries, ArchiveEntry};
pub use config::{NetworkConfig, QuarryConfig, RegistryConfig};
pub use error::{QuarryError, Result};
pub use installer::ProjectInstaller;
pub use integrity::{
    compute_file_digest, verify_integrity, verify_integrity_async, HashAlgorithm,
    IntegrityDescriptor,
};
pub use loader::{FactoryModuleLoader, JsonModuleLoader, ModuleLoader};
pub use local::LocalResolver;
pub use lock::ProjectLock;
pub use lookup::{lookup_for_projects, ProjectDescriptor, ProjectLookup};
pub use naming::{remove_version_and_extension, tarball_file_name};
pub use registry::{RegistryClient, RegistryMetadata};
pub use runner::{install_dependencies, CommandRunner, ProcessRunner};
