//! Engine construction from a materialized bundle

use crate::charseq::CharSequenceModel;
use crate::engine::{InferenceEngine, ScoreModel};
use crate::linear::LinearModel;
use crate::manifest::{BundleManifest, ModelFamily};
use crate::transformer::TransformerModel;
use fraudet_core::Result;
use fraudet_store::MaterializedBundle;
use tracing::info;

/// Build an inference engine from a fully materialized bundle.
///
/// The manifest selects the model family once, here; nothing downstream
/// ever branches on it again.
pub fn load_engine(bundle: &MaterializedBundle) -> Result<InferenceEngine> {
    let manifest = BundleManifest::from_bundle_dir(bundle.path())?;

    let model: Box<dyn ScoreModel> = match manifest.family {
        ModelFamily::Transformer => Box::new(TransformerModel::load(
            bundle.path(),
            manifest.max_length,
        )?),
        ModelFamily::Linear => Box::new(LinearModel::load(&bundle.file_path("vectorizer.json"))?),
        ModelFamily::CharSequence => Box::new(CharSequenceModel::load(
            bundle.path(),
            manifest.max_length,
        )?),
    };

    info!(
        bundle = %bundle.bundle_id(),
        family = model.family(),
        positive_label = %manifest.labels.positive,
        threshold = manifest.threshold,
        "Inference engine ready"
    );

    Ok(InferenceEngine::new(
        model,
        manifest.labels,
        manifest.threshold,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraudet_store::{BundleFetcher, LocalBundleStore};
    use std::sync::Arc;

    async fn fetch_linear_bundle(dir: &std::path::Path) -> MaterializedBundle {
        let root = dir.join("remote");
        let bundle_dir = root.join("fraud_model");
        std::fs::create_dir_all(&bundle_dir).unwrap();
        std::fs::write(
            bundle_dir.join("bundle.json"),
            r#"{"family": "linear", "labels": {"negative": "not fraud", "positive": "fraud"}}"#,
        )
        .unwrap();
        std::fs::write(
            bundle_dir.join("vectorizer.json"),
            r#"{
                "vocabulary": {"verify": 0, "lunch": 1},
                "coefficients": [4.0, -4.0],
                "intercept": 0.0
            }"#,
        )
        .unwrap();

        let fetcher = BundleFetcher::new(Arc::new(LocalBundleStore::new(root)));
        fetcher.fetch("fraud_model/").await.unwrap()
    }

    #[tokio::test]
    async fn test_load_linear_engine_from_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = fetch_linear_bundle(dir.path()).await;

        let engine = load_engine(&bundle).unwrap();
        assert_eq!(engine.family(), "linear");

        let result = engine.classify("please verify today").await.unwrap();
        assert_eq!(result.label, "fraud");
        let result = engine.classify("lunch tomorrow").await.unwrap();
        assert_eq!(result.label, "not fraud");
    }

    #[tokio::test]
    async fn test_manifestless_bundle_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("remote");
        std::fs::create_dir_all(root.join("m")).unwrap();
        std::fs::write(root.join("m/weights.bin"), b"not a manifest").unwrap();

        let fetcher = BundleFetcher::new(Arc::new(LocalBundleStore::new(root)));
        let bundle = fetcher.fetch("m/").await.unwrap();

        let err = load_engine(&bundle).unwrap_err();
        assert_eq!(err.kind(), "model_load");
    }
}
