//! # mailvault-directory
//!
//! Discovers the accounts of a directory group by running an external
//! directory query tool and parsing its tabular listing.

pub mod client;
pub mod error;
pub mod parse;

pub use client::{CommandDirectoryClient, DirectoryClient, GROUP_PLACEHOLDER};
pub use error::{DiscoveryError, Result};
pub use parse::{parse_listing, ListingFormat, ParsedListing};
