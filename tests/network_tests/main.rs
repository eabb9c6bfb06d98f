//! Network test suite
