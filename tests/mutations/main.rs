//! Mutation integration tests: insert, update, upsert and delete through the
//! builder, stamping, scoping and batch atomicity.

mod support;
mod insert;
