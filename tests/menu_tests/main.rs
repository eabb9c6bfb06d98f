//! Menu layer test suite

mod support;
