use std::time::Duration;

use loadrig_core::{
    Assertion, FailurePolicy, Scope, Step, ThresholdSet, Workflow, WorkflowDefaults,
};

use super::{OP_LOGIN, OP_REGISTER, credentials_payload, device_name, iteration_username};

pub(super) fn workflow() -> Workflow {
    Workflow::new("auth")
        .description("register a fresh user, then log in with the same credentials")
        .step(register())
        .step(login())
        .iteration_think_time(Duration::from_secs(1))
        .defaults(WorkflowDefaults {
            vus: 50,
            duration: Duration::from_secs(300),
            thresholds: vec![
                ThresholdSet::new("registration_latency", ["p(95)<200"]),
                ThresholdSet::new("login_latency", ["p(95)<200"]),
                ThresholdSet::new("registration_success", ["rate>0.95"]),
                ThresholdSet::new("login_success", ["rate>0.95"]),
            ],
        })
}

fn register() -> Step {
    Step::new("register", OP_REGISTER, |ctx| {
        Ok(credentials_payload(iteration_username(ctx), device_name(ctx)))
    })
    .assert(Assertion::status_ok("registration successful"))
    .assert(Assertion::present("got user_id", "user_id"))
    .assert(Assertion::present("got device_id", "device_id"))
    .assert(Assertion::present("got access_token", "access_token"))
    .extract("user_id", "user_id", Scope::Iteration)
    .extract("device_id", "device_id", Scope::Iteration)
    .latency_trend("registration_latency")
    .success_rate("registration_success")
    .request_counter("total_requests")
    .on_failure(FailurePolicy::AbortIteration)
    .think_time(Duration::from_millis(500))
}

fn login() -> Step {
    Step::new("login", OP_LOGIN, |ctx| {
        Ok(credentials_payload(iteration_username(ctx), device_name(ctx)))
    })
    .assert(Assertion::status_ok("login successful"))
    .assert(Assertion::equals_context("user_id matches", "user_id", "user_id"))
    .assert(Assertion::equals_context(
        "device_id matches",
        "device_id",
        "device_id",
    ))
    .assert(Assertion::present("got access_token", "access_token"))
    .assert(Assertion::present("got refresh_token", "refresh_token"))
    .latency_trend("login_latency")
    .success_rate("login_success")
    .request_counter("total_requests")
}
