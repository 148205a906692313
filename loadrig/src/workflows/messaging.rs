use std::time::{Duration, SystemTime, UNIX_EPOCH};

use loadrig_core::{
    Assertion, FailurePolicy, Scope, Step, ThresholdSet, Value, Workflow, WorkflowDefaults,
};

use super::{CONTENT_TYPE, OP_GET_MESSAGES, OP_SEND_MESSAGE, register_fixture_user};

// Wide enough that concurrent senders do not push this iteration's message out of the page.
const READ_LIMIT: u64 = 50;

pub(super) fn workflow() -> Workflow {
    Workflow::new("messaging")
        .description("one sender messages one receiver, who reads the conversation back")
        .setup_step(register_fixture_user("sender"))
        .setup_step(register_fixture_user("receiver"))
        .step(send_message())
        .step(get_messages())
        .iteration_think_time(Duration::from_secs(1))
        .defaults(WorkflowDefaults {
            vus: 50,
            duration: Duration::from_secs(300),
            thresholds: vec![
                ThresholdSet::new("send_message_latency", ["p(95)<200"]),
                ThresholdSet::new("get_messages_latency", ["p(95)<200"]),
                ThresholdSet::new("send_message_success", ["rate>0.95"]),
                ThresholdSet::new("get_messages_success", ["rate>0.95"]),
            ],
        })
}

fn send_message() -> Step {
    Step::new("send_message", OP_SEND_MESSAGE, |ctx| {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Ok(Value::object([
            (
                "recipient_user_id",
                ctx.require("receiver_user_id")?.clone(),
            ),
            (
                "encrypted_content",
                Value::from(format!(
                    "Load test message {}_{} at {millis}",
                    ctx.vu_id(),
                    ctx.iteration()
                )),
            ),
            ("content_type", Value::from(CONTENT_TYPE)),
        ]))
    })
    .credentials("sender_token")
    .assert(Assertion::status_ok("send message successful"))
    .assert(Assertion::present("got message_id", "message_id"))
    .assert(Assertion::exists("got timestamp", "timestamp"))
    .extract("message_id", "message_id", Scope::Iteration)
    .latency_trend("send_message_latency")
    .success_rate("send_message_success")
    .request_counter("total_requests")
    .on_failure(FailurePolicy::AbortIteration)
    .think_time(Duration::from_millis(500))
}

fn get_messages() -> Step {
    Step::new("get_messages", OP_GET_MESSAGES, |ctx| {
        Ok(Value::object([
            ("other_user_id", ctx.require("sender_user_id")?.clone()),
            ("limit", Value::from(READ_LIMIT)),
        ]))
    })
    .credentials("receiver_token")
    .assert(Assertion::status_ok("get messages successful"))
    .assert(Assertion::is_array("got messages array", "messages"))
    .assert(Assertion::array_contains(
        "message exists",
        "messages",
        "message_id",
        "message_id",
    ))
    .latency_trend("get_messages_latency")
    .success_rate("get_messages_success")
    .request_counter("total_requests")
}
