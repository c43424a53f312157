//! End-to-end scenarios: plans applied to real working copies, then resolved.

mod harness;
mod scenarios;
