// Copyright 2023 The Regents of the University of California
// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
pub mod error;
pub mod ir;
pub mod sim;
pub mod symbolic;

pub use error::{report_error, ExecError, ExecErrorKind};
