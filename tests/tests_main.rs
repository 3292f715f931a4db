#![allow(clippy::unwrap_used, clippy::expect_used)]

#[path = "helpers/mod.rs"]
mod helpers;

#[path = "expression/mod.rs"]
mod expression;

#[path = "ide/mod.rs"]
mod ide;

#[path = "project/mod.rs"]
mod project;

#[path = "schema/mod.rs"]
mod schema;
