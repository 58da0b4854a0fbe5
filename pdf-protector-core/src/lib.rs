//! # pdf-protector
//!
//! Native PDF password protection with the Standard Security Handler.
//!
//! ## Features
//!
//! - **Protection**: RC4 (40 to 128-bit), AES-128 and AES-256 (revision 6)
//! - **Detection**: structural check for an `Encrypt` trailer entry, no password needed
//! - **Password checks**: classify a candidate as owner, user or neither
//! - **Unprotection**: decrypt with either password and rewrite the file
//! - **Robust parsing**: incremental updates, cross-reference streams, object streams
//!   and an optional lenient mode for damaged files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_protector::{protect, is_protected, check_password, ProtectOptions, Role};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = std::fs::read("report.pdf")?;
//!
//! let options = ProtectOptions::new()
//!     .with_owner_password("owner-secret")
//!     .with_key_length(256);
//! let protected = protect(&input, "reader", &options)?;
//!
//! assert!(is_protected(&protected)?);
//! assert_eq!(check_password(&protected, "reader")?, Role::User);
//! std::fs::write("report-protected.pdf", protected)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Damaged input
//!
//! ```rust,no_run
//! use pdf_protector::{ParseOptions, Protector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = std::fs::read("damaged.pdf")?;
//! let protector = Protector::new(ParseOptions::lenient().with_max_document_size(64 << 20));
//! if let Some(info) = protector.inspect(&input)? {
//!     println!("{} (V {}, R {})", info.algorithm, info.version, info.revision);
//! }
//! # Ok(())
//! # }
//! ```

pub mod detector;
pub mod document;
pub mod encryption;
pub mod error;
pub mod objects;
pub mod parser;
pub mod protector;
pub mod writer;

pub use detector::ProtectionInfo;
pub use document::Document;
pub use encryption::{
    EncryptionAlgorithm, EncryptionDictionary, PermissionFlags, Permissions, Role,
    StandardSecurityHandler,
};
pub use error::{PdfError, Result};
pub use parser::{ParseOptions, PdfReader};
pub use protector::{
    check_password, inspect, is_protected, protect, unprotect, ProtectOptions, Protector,
};

/// Current version of pdf-protector
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
