use std::fs;

use anyhow::Result;
use influence_core::ingest::extractor::FormatReport;
use influence_core::{EngineConfig, InfluenceEngine, InfluenceError};

const CSV: &str = "\
source_entity,target_entity,relationship_type,weight,source_followers,target_followers,source_engagement,target_engagement
alice,bob,follows,1.0,5000,120,0.4,0.1
bob,carol,mentions,2.0,999,300,0.9,0.2
carol,alice,likes,,,,,
";

#[tokio::test]
async fn csv_file_import_and_export() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.csv");
    fs::write(&path, CSV)?;

    let engine = InfluenceEngine::default();
    let report = engine.import_file(&path).await?;
    assert_eq!(report.nodes_added, 3);
    assert_eq!(report.edges_added, 3);
    assert_eq!(report.records_processed, 3);

    // Existing endpoints keep their first attributes.
    let data = engine.graph_data();
    let bob = data.nodes.iter().find(|n| n.id == "bob").unwrap();
    assert_eq!(bob.follower_count, 120);

    let out = dir.path().join("export.csv");
    engine.export_csv(&out)?;
    let copy = InfluenceEngine::default();
    copy.import_file(&out).await?;
    assert_eq!(copy.edge_count(), 3);
    assert_eq!(
        serde_json::to_value(copy.graph_data().links)?,
        serde_json::to_value(engine.graph_data().links)?
    );
    Ok(())
}

#[tokio::test]
async fn json_file_import_and_validation() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.json");
    fs::write(
        &path,
        r#"{
            "nodes": [{"id": "alice", "follower_count": 250000, "engagement_score": 0.7}],
            "edges": [{"source": "bob", "target": "alice", "relationship_type": "follows"}]
        }"#,
    )?;

    let engine = InfluenceEngine::default();
    match engine.validate_file(&path).await? {
        FormatReport::Json(report) => {
            assert!(report.is_valid);
            assert_eq!(report.node_count, 1);
            assert_eq!(report.edge_count, 1);
        }
        other => panic!("unexpected report {other:?}"),
    }

    let report = engine.import_file(&path).await?;
    assert_eq!(report.nodes_added, 2);
    assert_eq!(report.edges_added, 1);

    let chain = engine.influence_chain("alice", Some(2))?;
    assert_eq!(chain.influences[0].user, "bob");

    let json_out = dir.path().join("export.json");
    engine.export_json(&json_out)?;
    let exported: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_out)?)?;
    assert_eq!(exported["metadata"]["node_count"], 2);
    assert_eq!(exported["edges"][0]["source"], "bob");
    Ok(())
}

#[tokio::test]
async fn import_failures() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = InfluenceEngine::default();

    let txt = dir.path().join("graph.txt");
    fs::write(&txt, "alice,bob")?;
    assert!(matches!(
        engine.import_file(&txt).await,
        Err(InfluenceError::UnsupportedFormat(_))
    ));

    let missing = dir.path().join("missing.csv");
    assert!(matches!(
        engine.import_file(&missing).await,
        Err(InfluenceError::Import(_))
    ));

    let bad = dir.path().join("bad.csv");
    fs::write(&bad, "from,to\nalice,bob\n")?;
    assert!(engine.import_file(&bad).await.is_err());
    assert_eq!(engine.node_count(), 0);
    Ok(())
}

#[tokio::test]
async fn non_finite_weights_reject_the_whole_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("weights.csv");
    fs::write(
        &path,
        "source_entity,target_entity,relationship_type,weight\n\
         a,b,mentions,NaN\n\
         b,c,mentions,1\n\
         c,a,mentions,inf\n",
    )?;

    let engine = InfluenceEngine::default();
    assert!(matches!(
        engine.import_file(&path).await,
        Err(InfluenceError::InvalidWeight { .. })
    ));
    assert_eq!(engine.node_count(), 0);

    fs::write(
        &path,
        "source_entity,target_entity,relationship_type,weight\n\
         a,b,mentions,2\n\
         b,c,mentions,1\n\
         c,a,mentions,1\n",
    )?;
    engine.import_file(&path).await?;
    assert_eq!(engine.analytics().pagerank.len(), 3);
    Ok(())
}

#[test]
fn schema_file_is_loaded_from_config() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let schema = dir.path().join("schema.json");
    fs::write(
        &schema,
        r#"{"relationships": {"follows": {"domain": "User", "range": "User"}}}"#,
    )?;

    let config = EngineConfig {
        schema_path: Some(schema),
        ..EngineConfig::default()
    };
    let engine = InfluenceEngine::from_config(config)?;
    assert!(engine
        .add_relationship(influence_core::Relationship::new("a", "b", "follows"))
        .is_ok());
    assert!(matches!(
        engine.add_relationship(influence_core::Relationship::new("a", "b", "likes")),
        Err(InfluenceError::InvalidRelationship { .. })
    ));
    Ok(())
}
