use anyhow::Result;
use enginesim::types::{decode_record, HealthRecord, TestOutcome};
use enginesim::{dyn_async, evaluate, FieldKind, Payload, Rule, Suite, Test, TestSpec};
use serde_json::{json, Value};

pub fn suite() -> Suite {
    let mut suite = Suite::new(
        "health",
        "Liveness and capability probes against the Knowledge Engine.",
    );

    suite.add(TestSpec {
        name: "service_reachable".to_string(),
        description: "The health endpoint answers with a 2xx status.".to_string(),
        critical: false,
        run: service_reachable,
    });

    suite.add(TestSpec {
        name: "engine_capabilities".to_string(),
        description: "The engine endpoint reports a status and feature list.".to_string(),
        critical: false,
        run: engine_capabilities,
    });

    suite
}

dyn_async! {
    async fn service_reachable<'a>(test: &'a mut Test) -> Result<TestOutcome> {
        let response = test.engine.health().await?;
        if !response.is_success() {
            return Ok(TestOutcome::fail(format!(
                "health endpoint returned HTTP {}",
                response.status
            )));
        }
        let record: HealthRecord = decode_record(&response.body);
        let status = record.status.unwrap_or_else(|| "unreported".to_string());
        Ok(TestOutcome::pass(format!(
            "HTTP {}, backend status {status:?}",
            response.status
        )))
    }
}

dyn_async! {
    async fn engine_capabilities<'a>(test: &'a mut Test) -> Result<TestOutcome> {
        let response = test.engine.engine_info().await?;
        // Capability probe on an older deployment.
        if matches!(response.status, 404 | 501) {
            return Ok(TestOutcome::pass(format!(
                "engine endpoint not implemented (HTTP {})",
                response.status
            )));
        }
        if !response.is_success() {
            return Ok(TestOutcome::fail(format!(
                "engine endpoint returned HTTP {}",
                response.status
            )));
        }

        let record: HealthRecord = decode_record(&response.body);
        let payload = Payload::json(response.json().cloned().unwrap_or(Value::Null));
        let outcome = evaluate(
            &payload,
            &[
                Rule::required_field("status", FieldKind::String),
                Rule::optional_field("features", FieldKind::Array),
            ],
        );
        Ok(outcome.with_data(json!({"features": record.features})))
    }
}
