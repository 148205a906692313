use std::time::Duration;

use loadrig_core::{
    Assertion, FailurePolicy, Scope, Step, ThresholdSet, Value, Workflow, WorkflowDefaults,
};

use super::{
    CONTENT_TYPE, OP_GET_MESSAGES, OP_LOGIN, OP_REGISTER, OP_SEND_MESSAGE, credentials_payload,
    device_name, iteration_username, register_fixture_user,
};

const READ_LIMIT: u64 = 10;

pub(super) fn workflow() -> Workflow {
    Workflow::new("combined")
        .description("register, log in, message a shared receiver and read messages back")
        .setup_step(register_fixture_user("receiver"))
        .step(register())
        .step(login())
        .step(send_message())
        .step(get_messages())
        .iteration_think_time(Duration::from_secs(1))
        .defaults(WorkflowDefaults {
            vus: 50,
            duration: Duration::from_secs(300),
            thresholds: vec![
                ThresholdSet::new("registration_latency", ["p(95)<200"]),
                ThresholdSet::new("login_latency", ["p(95)<200"]),
                ThresholdSet::new("send_message_latency", ["p(95)<200"]),
                ThresholdSet::new("get_messages_latency", ["p(95)<200"]),
                ThresholdSet::new("registration_success", ["rate>0.95"]),
                ThresholdSet::new("login_success", ["rate>0.95"]),
                ThresholdSet::new("send_message_success", ["rate>0.95"]),
                ThresholdSet::new("get_messages_success", ["rate>0.95"]),
                ThresholdSet::new("total_errors", ["count<50"]),
            ],
        })
}

fn register() -> Step {
    Step::new("register", OP_REGISTER, |ctx| {
        Ok(credentials_payload(iteration_username(ctx), device_name(ctx)))
    })
    .assert(Assertion::status_ok("registration successful"))
    .assert(Assertion::present("got user_id", "user_id"))
    .assert(Assertion::present("got access_token", "access_token"))
    .extract("user_id", "user_id", Scope::Iteration)
    .extract("access_token", "access_token", Scope::Iteration)
    .latency_trend("registration_latency")
    .success_rate("registration_success")
    .request_counter("total_requests")
    .error_counter("total_errors")
    .on_failure(FailurePolicy::AbortIteration)
    .think_time(Duration::from_millis(200))
}

fn login() -> Step {
    Step::new("login", OP_LOGIN, |ctx| {
        Ok(credentials_payload(iteration_username(ctx), device_name(ctx)))
    })
    .assert(Assertion::status_ok("login successful"))
    .assert(Assertion::equals_context("user_id matches", "user_id", "user_id"))
    .latency_trend("login_latency")
    .success_rate("login_success")
    .request_counter("total_requests")
    .error_counter("total_errors")
    .think_time(Duration::from_millis(300))
}

fn send_message() -> Step {
    Step::new("send_message", OP_SEND_MESSAGE, |ctx| {
        Ok(Value::object([
            (
                "recipient_user_id",
                ctx.require("receiver_user_id")?.clone(),
            ),
            (
                "encrypted_content",
                Value::from(format!(
                    "Load test message from VU {} iteration {}",
                    ctx.vu_id(),
                    ctx.iteration()
                )),
            ),
            ("content_type", Value::from(CONTENT_TYPE)),
        ]))
    })
    .credentials("access_token")
    .assert(Assertion::status_ok("send message successful"))
    .assert(Assertion::present("got message_id", "message_id"))
    .latency_trend("send_message_latency")
    .success_rate("send_message_success")
    .request_counter("total_requests")
    .error_counter("total_errors")
    .think_time(Duration::from_millis(300))
}

fn get_messages() -> Step {
    Step::new("get_messages", OP_GET_MESSAGES, |ctx| {
        Ok(Value::object([
            ("other_user_id", ctx.require("receiver_user_id")?.clone()),
            ("limit", Value::from(READ_LIMIT)),
        ]))
    })
    .credentials("access_token")
    .assert(Assertion::status_ok("get messages successful"))
    .assert(Assertion::is_array("got messages array", "messages"))
    .latency_trend("get_messages_latency")
    .success_rate("get_messages_success")
    .request_counter("total_requests")
    .error_counter("total_errors")
}
