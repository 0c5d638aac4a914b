use anyhow::Result;
use enginesim::types::TestOutcome;
use enginesim::{dyn_async, evaluate, FieldKind, Payload, Rule, Suite, Test, TestSpec};
use serde_json::{json, Value};

use crate::suites::constants::{PROBE_ASSET_NAME, PROBE_PNG, UNKNOWN_ASSET_ID};

pub fn suite() -> Suite {
    let mut suite = Suite::new(
        "assets",
        "Asset management: listing shape, upload/list/delete round-trip, and \
         delete idempotence.",
    );

    suite.add(TestSpec {
        name: "asset_listing_shape".to_string(),
        description: "The asset listing returns an assets array.".to_string(),
        critical: false,
        run: asset_listing_shape,
    });

    suite.add(TestSpec {
        name: "upload_asset_roundtrip".to_string(),
        description: "An uploaded asset appears in the listing and is removed \
                      again afterwards."
            .to_string(),
        critical: false,
        run: upload_asset_roundtrip,
    });

    suite.add(TestSpec {
        name: "delete_missing_asset_returns_404".to_string(),
        description: "Deleting an asset id that was never created answers 404, \
                      treated as success."
            .to_string(),
        critical: false,
        run: delete_missing_asset_returns_404,
    });

    suite
}

dyn_async! {
    async fn asset_listing_shape<'a>(test: &'a mut Test) -> Result<TestOutcome> {
        let (response, _listing) = test.engine.list_assets().await?;
        if !response.is_success() {
            return Ok(TestOutcome::fail(format!(
                "asset listing returned HTTP {}",
                response.status
            )));
        }
        let payload = Payload::json(response.json().cloned().unwrap_or(Value::Null));
        Ok(evaluate(
            &payload,
            &[
                Rule::required_field("assets", FieldKind::Array),
                Rule::optional_field("total", FieldKind::Number),
            ],
        ))
    }
}

dyn_async! {
    async fn upload_asset_roundtrip<'a>(test: &'a mut Test) -> Result<TestOutcome> {
        let (response, record) = test
            .engine
            .upload_asset(PROBE_ASSET_NAME, PROBE_PNG.to_vec())
            .await?;
        if matches!(response.status, 404 | 501) {
            return Ok(TestOutcome::pass(format!(
                "asset upload not implemented (HTTP {})",
                response.status
            )));
        }
        if !response.is_success() {
            return Ok(TestOutcome::fail(format!(
                "asset upload rejected with HTTP {}",
                response.status
            )));
        }

        // The upload response does not always echo the id; fall back to
        // finding the asset by name in a fresh listing.
        let (response, listing) = test.engine.list_assets().await?;
        if !response.is_success() {
            return Ok(TestOutcome::fail(format!(
                "asset listing after upload returned HTTP {}",
                response.status
            )));
        }
        let id = record.id_str().or_else(|| {
            listing
                .assets
                .iter()
                .find(|asset| asset.name.as_deref() == Some(PROBE_ASSET_NAME))
                .and_then(|asset| asset.id_str())
        });
        let Some(id) = id else {
            return Ok(TestOutcome::fail(
                "uploaded asset has no id and was not found in the listing",
            ));
        };
        let listed = listing
            .assets
            .iter()
            .any(|asset| asset.id_str().as_deref() == Some(id.as_str()));
        if !listed {
            return Ok(TestOutcome::fail(format!(
                "uploaded asset {id} missing from the listing"
            )));
        }

        // Cleanup; a 404 here means the backend already dropped it.
        let response = test.engine.delete_asset(&id).await?;
        if !response.is_success() && response.status != 404 {
            return Ok(TestOutcome::fail(format!(
                "cleanup delete of asset {id} returned HTTP {}",
                response.status
            )));
        }
        Ok(TestOutcome::pass(format!(
            "asset {id} uploaded, listed, and removed"
        ))
        .with_data(json!({"asset_id": id})))
    }
}

dyn_async! {
    async fn delete_missing_asset_returns_404<'a>(test: &'a mut Test) -> Result<TestOutcome> {
        let response = test.engine.delete_asset(UNKNOWN_ASSET_ID).await?;
        match response.status {
            404 => Ok(TestOutcome::pass("already-absent asset answered 404")),
            200..=299 => Ok(TestOutcome::pass(format!(
                "backend tolerated the delete with HTTP {}",
                response.status
            ))),
            status => Ok(TestOutcome::fail(format!(
                "unexpected HTTP {status} deleting a missing asset"
            ))),
        }
    }
}
