//! Entry point for the crate's black-box integration tests: everything
//! under `common/` is shared test support (harness, mocks), everything
//! under `unit/` is a suite of `#[test]` functions exercising the public
//! API the way a host embedding would.

mod common;
mod unit;
