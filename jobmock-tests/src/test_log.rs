// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggedPerform {
    /// `None` when performed inline
    pub job_id: Option<u64>,

    pub was_async: bool,

    pub args: Vec<Value>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct TestLog {
    pub performs: Vec<LoggedPerform>,
}

impl TestLog {
    pub fn runs(&self) -> usize {
        self.performs.len()
    }

    pub fn last_args(&self) -> Option<&Vec<Value>> {
        self.performs.last().map(|p| &p.args)
    }
}
