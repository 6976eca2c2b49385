//! the test_utils folder here will share utils or test components between unit
//! tests
mod fake_cluster;

pub use fake_cluster::*;
