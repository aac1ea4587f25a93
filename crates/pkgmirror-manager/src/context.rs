/*! The shared [Context] a [crate::manager::Manager] is constructed with: a
connection pool and a worker pool, matching the component design's
description of a Driver "constructed per operation with a reference to the
Context (connection pool + async section factory)". */

use pkgmirror_transport::{AsyncSection, ConnectionPool};

pub struct Context {
    pub connections: ConnectionPool,
    pub section: AsyncSection,
    /// Passed to every [pkgmirror_transport::ExecutionScope] opened during
    /// PARSE and COPY; `0` means fail-fast.
    pub ignore_errors_budget: usize,
}

impl Context {
    pub fn new(connections: ConnectionPool, section: AsyncSection, ignore_errors_budget: usize) -> Self {
        Self {
            connections,
            section,
            ignore_errors_budget,
        }
    }
}
