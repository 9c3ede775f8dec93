// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod performers;
pub mod test_log;

/// Routes `log` output of the crate under test into the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
