//! Integration test crate for the swap synchronization layer.
//!
//! This crate has no library code. It only contains integration tests
//! that drive daemon notifications through the store, the reactions and
//! the view-facing RPC surface together.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p swapsync-integration-tests
//! ```
