//! Named background threads.
//!
//! The poller, the controller and the binary's snapshot observer each run on
//! their own OS thread, named so they can be told apart in panic messages
//! and logs.

use std::thread::JoinHandle;

use log::debug;

use crate::error::Error;

/// Stack size for the long-lived loops.
pub const LOOP_STACK_KB: usize = 64;

/// Stack size for light helper threads (snapshot observers).
pub const HELPER_STACK_KB: usize = 16;

/// Spawn a named thread with an explicit stack size.
pub fn spawn_named(
    name: &'static str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, Error> {
    debug!("Spawning '{}' (stack={}KB)", name, stack_kb);

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| Error::Init(name))
}
