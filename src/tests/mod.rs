//! Scenario tests exercising the assembled service graph end to end.

mod auth_flow;
mod common;
mod rbac_scenarios;
