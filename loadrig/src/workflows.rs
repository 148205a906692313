//! Built-in workflows against the auth and messaging services.

use loadrig_core::{Assertion, Scope, Step, Value, VuContext, Workflow};

mod auth;
mod combined;
mod messaging;

pub(crate) const OP_REGISTER: &str = "Register";
pub(crate) const OP_LOGIN: &str = "Login";
pub(crate) const OP_SEND_MESSAGE: &str = "SendMessage";
pub(crate) const OP_GET_MESSAGES: &str = "GetMessages";

const PASSWORD: &str = "LoadTest123!";
const CONTENT_TYPE: &str = "text/plain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowKind {
    /// Register a fresh user, then log in.
    Auth,
    /// One sender messages one receiver, who reads the conversation back.
    Messaging,
    /// Register, log in, message a shared receiver and read messages back.
    Combined,
}

impl WorkflowKind {
    pub(crate) const ALL: [Self; 3] = [Self::Auth, Self::Messaging, Self::Combined];

    pub(crate) fn build(self) -> Workflow {
        match self {
            Self::Auth => auth::workflow(),
            Self::Messaging => messaging::workflow(),
            Self::Combined => combined::workflow(),
        }
    }
}

/// Unique per iteration so repeated registrations never collide.
fn iteration_username(ctx: &VuContext) -> String {
    format!("loadtest_{}", ctx.identity())
}

fn device_name(ctx: &VuContext) -> String {
    format!("loadrig-device-{}", ctx.vu_id())
}

fn credentials_payload(username: String, device_name: String) -> Value {
    Value::object([
        ("username", Value::from(username)),
        ("password", Value::from(PASSWORD)),
        ("device_name", Value::from(device_name)),
    ])
}

/// Setup step registering a fixture user; its id and token land under `{role}_user_id` and
/// `{role}_token`.
fn register_fixture_user(role: &'static str) -> Step {
    Step::new(format!("register_{role}"), OP_REGISTER, move |ctx| {
        Ok(credentials_payload(
            format!("{role}_{}", ctx.identity()),
            format!("loadrig-{role}"),
        ))
    })
    .assert(Assertion::status_ok("registration successful"))
    .assert(Assertion::present("got user_id", "user_id"))
    .assert(Assertion::present("got access_token", "access_token"))
    .extract("user_id", format!("{role}_user_id"), Scope::Vu)
    .extract("access_token", format!("{role}_token"), Scope::Vu)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use loadrig_core::{MetricValue, RpcClient, RunConfig, SharedFixture, VuContext, run};
    use loadrig_testserver::TestServer;

    use super::*;

    #[test]
    fn every_workflow_declares_steps_and_defaults() {
        for kind in WorkflowKind::ALL {
            let workflow = kind.build();
            assert_eq!(workflow.name(), kind.to_string());
            assert!(!workflow.steps().is_empty());
            assert_eq!(workflow.think_time(), Duration::from_secs(1));

            let defaults = workflow.workflow_defaults();
            assert_eq!(defaults.vus, 50);
            assert_eq!(defaults.duration, Duration::from_secs(300));
            assert!(!defaults.thresholds.is_empty());
        }
    }

    #[test]
    fn usernames_follow_iteration_identity() {
        let mut ctx = VuContext::new(3, SharedFixture::default());
        ctx.begin_iteration(7);
        let first = iteration_username(&ctx);
        assert!(first.starts_with("loadtest_3_7_"));

        ctx.begin_iteration(8);
        assert_ne!(iteration_username(&ctx), first);
        assert_eq!(device_name(&ctx), "loadrig-device-3");
    }

    async fn run_once(kind: WorkflowKind) -> loadrig_core::RunReport {
        let server = TestServer::start()
            .await
            .unwrap_or_else(|e| panic!("start test server: {e}"));
        let client = RpcClient::new(server.base_url())
            .unwrap_or_else(|e| panic!("rpc client: {e}"));

        let workflow = kind.build();
        let config = RunConfig::new(1, Duration::from_millis(100))
            .with_thresholds(workflow.workflow_defaults().thresholds.clone());
        let report = run(&config, &workflow, Arc::new(client))
            .await
            .unwrap_or_else(|e| panic!("{kind} run failed: {e}"));

        server.shutdown().await;
        report
    }

    fn rate(report: &loadrig_core::RunReport, name: &str) -> Option<f64> {
        match report.metrics.get(name).map(|m| &m.value) {
            Some(MetricValue::Rate { rate, .. }) => *rate,
            _ => None,
        }
    }

    #[tokio::test]
    async fn auth_workflow_passes_against_stand_in_service() {
        let report = run_once(WorkflowKind::Auth).await;

        assert_eq!(report.iterations, 1);
        assert_eq!(rate(&report, "registration_success"), Some(1.0));
        assert_eq!(rate(&report, "login_success"), Some(1.0));
        assert_eq!(report.metrics.counter_sum("total_requests"), 2.0);
        assert_eq!(report.checks_failed(), 0);
        assert!(report.passed(), "{:?}", report.thresholds);
    }

    #[tokio::test]
    async fn messaging_workflow_reads_back_the_sent_message() {
        let report = run_once(WorkflowKind::Messaging).await;

        assert_eq!(report.iterations, 1);
        assert_eq!(rate(&report, "send_message_success"), Some(1.0));
        assert_eq!(rate(&report, "get_messages_success"), Some(1.0));
        assert!(
            report
                .checks
                .iter()
                .any(|c| c.name == "message exists" && c.failed == 0)
        );
        assert!(report.passed(), "{:?}", report.thresholds);
    }

    #[tokio::test]
    async fn combined_workflow_records_no_errors() {
        let report = run_once(WorkflowKind::Combined).await;

        assert_eq!(report.iterations, 1);
        assert_eq!(report.metrics.counter_sum("total_requests"), 4.0);
        assert_eq!(report.metrics.counter_sum("total_errors"), 0.0);
        assert!(report.passed(), "{:?}", report.thresholds);
    }
}
