//! # vmtmpl
//!
//! This library resolves, fetches, validates and composes YAML templates
//! that describe virtual machine instances. It is designed to be used by the
//! `vmtmpl` command-line tool but can also be embedded in other applications
//! that need to turn a template reference into a self-contained document.
//!
//! ## Quick Example
//!
//! ```
//! use vmtmpl::catalog::MemoryCatalog;
//! use vmtmpl::embed::{Composer, Mode};
//! use vmtmpl::fetch::Fetcher;
//! use vmtmpl::template::Template;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let catalog = MemoryCatalog::new()
//!     .with("docker", "base: template://_images/ubuntu\ncpus: 4\n")
//!     .with("_images/ubuntu", "images:\n- location: https://example.com/ubuntu.img\n");
//! let fetcher = Fetcher::new(catalog);
//! let cancel = CancellationToken::new();
//!
//! let mut tmpl = Template::read(&fetcher, &cancel, "", "template://docker", "").await.unwrap();
//! Composer::new(&fetcher, &cancel)
//!     .compose(&mut tmpl, Mode::Embed)
//!     .await
//!     .unwrap();
//!
//! let config = tmpl.config().unwrap();
//! assert!(config.base.is_empty());
//! assert_eq!(config.cpus, Some(4));
//! assert_eq!(config.images.len(), 1);
//! # });
//! ```
//!
//! ## Core Concepts
//!
//! - **Locators (`locator`)**: strings naming where a template lives
//!   (`template://NAME`, `http(s)://`, `file://`, a path, or `-` for STDIN),
//!   how relative ones resolve, and which fetch strategy each implies.
//! - **Fetching (`fetch`, `catalog`)**: size-capped, cancellable retrieval
//!   of raw bytes from every locator kind.
//! - **Decoding (`config`, `decode`)**: the template schema, with fields that
//!   accept a scalar or a structured form, and the three-pass validating
//!   decoder.
//! - **Composition (`embed`, `merge`, `fill`)**: recursive, cycle-safe,
//!   digest-checked merging of base templates, plus default filling.
//! - **Output (`marshal`)**: YAML for a configuration or a raw document,
//!   optionally as a `---`/`...` delimited stream.

pub mod catalog;
pub mod config;
pub mod decode;
pub mod defaults;
pub mod digest;
pub mod embed;
pub mod error;
pub mod fetch;
pub mod fill;
pub mod locator;
pub mod marshal;
pub mod merge;
pub mod name;
pub mod template;
pub mod validate;

#[cfg(test)]
mod locator_proptest;
