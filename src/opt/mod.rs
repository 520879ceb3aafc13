// Copyright (c) 2017-2021 Fabian Schuiki

//! This module implements the infrastructure to run optimization passes over
//! modules and functions.

mod pass;
pub mod prelude;

pub use self::pass::*;
