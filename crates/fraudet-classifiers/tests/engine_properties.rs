//! Property tests for the batching-equivalence guarantee

use fraudet_classifiers::{InferenceEngine, LinearModel};
use proptest::prelude::*;

fn build_engine() -> (tempfile::TempDir, InferenceEngine) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vectorizer.json");
    std::fs::write(
        &path,
        r#"{
            "vocabulary": {
                "verify": 0, "account": 1, "urgent": 2, "suspended": 3,
                "lunch": 4, "thanks": 5, "meeting": 6
            },
            "coefficients": [2.1, 1.3, 1.8, 2.4, -2.0, -1.5, -1.1],
            "intercept": -0.4
        }"#,
    )
    .unwrap();

    let engine = InferenceEngine::new(
        Box::new(LinearModel::load(&path).unwrap()),
        fraudet_core::LabelSet::default(),
        0.5,
    );
    (dir, engine)
}

proptest! {
    /// classify_batch(texts)[i] must equal classify(texts[i]) for every
    /// index, for arbitrary word sequences.
    #[test]
    fn batch_equals_per_item_classify(
        texts in proptest::collection::vec("[a-z]{1,12}( [a-z]{1,12}){0,6}", 1..8)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let (_dir, engine) = build_engine();

        rt.block_on(async {
            let batch = engine.classify_batch(&texts).await.unwrap();
            prop_assert_eq!(batch.len(), texts.len());
            for (i, text) in texts.iter().enumerate() {
                let single = engine.classify(text).await.unwrap();
                prop_assert_eq!(&batch[i], &single);
            }
            Ok(())
        })?;
    }

    /// Single-item batches match the scalar call exactly.
    #[test]
    fn singleton_batch_equals_classify(text in "[a-z]{1,12}( [a-z]{1,12}){0,6}") {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let (_dir, engine) = build_engine();

        rt.block_on(async {
            let batch = engine.classify_batch(std::slice::from_ref(&text)).await.unwrap();
            let single = engine.classify(&text).await.unwrap();
            prop_assert_eq!(&batch[0], &single);
            Ok(())
        })?;
    }
}
