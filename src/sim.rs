// Copyright 2023 The Regents of the University of California
// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
mod exec;
mod interpreter;
mod list;
mod state;
mod update;
mod value;

pub use interpreter::{ExecOptions, Interpreter, Simulator};
pub use list::{ListIter, ListRef, ListStore, StepOwner};
pub use state::{ArgumentsKey, FunctionStore};
pub use update::{Update, UpdateSet};
pub use value::{values_equal, Renderer, Value};
