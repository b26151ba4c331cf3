mod tests {
    use common::config::LatencyConfig;
    use common::types::{ConnectionForm, FileEntry};
    use orchestrator::{
        InstantClock, SaveOutcome, SelectOutcome, StudioFlow, TestOutcome, ToggleOutcome,
    };
    use std::sync::Arc;
    use test_utils::{connection_record, MockRegistry};

    fn flow_with(registry: Arc<MockRegistry>) -> StudioFlow {
        StudioFlow::new(
            registry,
            Arc::new(InstantClock::new()),
            LatencyConfig::default(),
        )
    }

    #[tokio::test]
    async fn full_draft_walkthrough() {
        let registry = Arc::new(MockRegistry::new());
        registry.push_list(Ok(vec![connection_record("c-old", "oracle")]));
        let flow = flow_with(registry.clone());
        let orch = flow.orchestrator();

        // Component mount: pull the mirror.
        orch.refresh_connections().await.expect("refresh");
        assert_eq!(orch.store().list().len(), 1);
        assert!(!flow.try_next());

        // Configure a new cloud connector end to end.
        let outcome = orch.select_source("snowflake").expect("select");
        assert_eq!(outcome, SelectOutcome::DialogOpened);
        assert_eq!(
            orch.test_connection().await.expect("test"),
            TestOutcome::Passed
        );
        orch.set_form(ConnectionForm {
            host: "acct.snowflakecomputing.com".into(),
            port: "443".into(),
            username: "loader".into(),
            password: "secret".into(),
            database: "marts".into(),
            ..Default::default()
        })
        .expect("form");
        let saved = match orch.save_connection().await.expect("save") {
            SaveOutcome::Saved(record) => record,
            other => panic!("expected Saved, got {other:?}"),
        };

        // Claim a pre-existing connection alongside it.
        let old = common::types::ConnectionId::from("c-old");
        assert_eq!(
            orch.toggle_connection(&old).await.expect("claim"),
            ToggleOutcome::Claimed
        );

        // Stage a file too; the upload source joins the draft once.
        orch.add_files(vec![FileEntry::in_memory("extras.csv", vec![1, 2, 3])]);
        assert_eq!(
            orch.draft_selection(),
            vec!["snowflake".to_owned(), "upload".to_owned()]
        );

        // Readiness holds through the batch even though the synthetic
        // upload kind never passes a connection test.
        assert!(flow.try_next());
        assert_eq!(flow.active_step(), 1);

        // Reset: draft gone, persisted connections and claims intact.
        flow.reset();
        assert_eq!(flow.active_step(), 0);
        assert!(orch.draft_selection().is_empty());
        assert!(orch.batch_files().is_empty());
        let kept = orch.store().get(&saved.connector_id).expect("saved kept");
        assert!(kept.status.in_use());
        let old_entry = orch.store().get(&old).expect("old kept");
        assert!(old_entry.status.in_use());
    }
}
