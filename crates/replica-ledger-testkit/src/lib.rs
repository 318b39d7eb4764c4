//! # Replica Ledger Testkit
//!
//! Testing utilities for the replica ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Header hashes and request wire bytes that every build must reproduce
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A replica with deterministic clients, ready-made extenders
//!
//! ## Golden Vectors
//!
//! ```rust
//! use replica_ledger_testkit::vectors::verify_all_vectors;
//!
//! for report in verify_all_vectors() {
//!     assert!(report.matches, "{}: {}", report.name, report.actual);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use replica_ledger_testkit::generators::{request_from_params, RequestParams};
//!
//! proptest! {
//!     #[test]
//!     fn request_size_is_exact(params: RequestParams) {
//!         let request = request_from_params(&params).unwrap();
//!         prop_assert!(request.size() >= 31);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use replica_ledger_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new(2);
//! let request = fixture.signed_request(0, 1, b"put k v").unwrap();
//! request.validate(&fixture.validation_context(true)).unwrap();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{executed_header, memory_extender, TestFixture};
pub use generators::{header_from_params, request_from_params, HeaderParams, RequestParams};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector, VectorReport};
