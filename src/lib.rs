//! apphash tracks the released version of a mobile game across regional
//! storefronts, downloads the package when a new version appears, and
//! extracts build-identifying metadata from the asset bundle inside it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐    ┌──────────┐    ┌─────────┐    ┌────────┐
//! │ Scheduler │───▶│ Resolver │───▶│ Fetcher │───▶│ Bundle │
//! │ (updater) │    │(per shop)│    │ (pkg)   │    │(decode)│
//! └───────────┘    └──────────┘    └─────────┘    └────────┘
//!       │                                              │
//!       ▼                                              ▼
//! ┌───────────┐                                  ┌───────────┐
//! │  Server   │◀────────── read-only ────────────│   Cache   │
//! │ (query)   │                                  │(per region)│
//! └───────────┘                                  └───────────┘
//! ```
//!
//! # Modules
//!
//! - [`region`]: closed region set and static storefront configuration
//! - [`version`]: dotted-numeric version comparison
//! - [`resolver`]: latest-version resolution per storefront
//! - [`fetch`]: streaming package download to scratch storage
//! - [`package`]: container walking over (possibly nested) packages
//! - [`bundle`]: minimal asset-bundle reading and record decoding
//! - [`cache`]: in-memory region → record map
//! - [`updater`]: per-region orchestration and the refresh scheduler
//! - [`server`]: read-only query API with admin refresh
//! - [`error`]: error taxonomy of the update pipeline

pub mod bundle;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod package;
pub mod region;
pub mod resolver;
pub mod server;
pub mod updater;
pub mod version;
