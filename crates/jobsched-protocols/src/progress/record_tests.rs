    use super::*;
    use chrono::Duration;

    fn t(offset_secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(offset_secs)
    }

    #[test]
    fn test_empty_progress() {
        let progress = Progress::new();
        assert!(progress.is_empty());
        assert!(progress.completed_at().is_none());
        assert!(progress.status().is_none());
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_full_hierarchy_in_append_order() {
        let mut progress = Progress::new();
        progress.start_process("Rebuild", Some("job-1".into()), Some("admin".into()), t(0));
        assert!(progress.start_stage("Tables", Some(2), FailurePolicy::SkipItem, t(1)));
        assert!(progress.start_item("table a", FailurePolicy::Parent, t(2)));
        progress.complete_item(Some("10 rows"), t(3));
        assert!(progress.start_item("table b", FailurePolicy::Parent, t(4)));
        progress.fail_item("locked", t(5));
        progress.complete_stage(Some("1 of 2"), t(6));
        progress.complete_process(Some("done"), t(7));

        let process = &progress.sequence[0];
        assert_eq!(process.node.status, NodeStatus::Success);
        assert_eq!(process.job_id.as_deref(), Some("job-1"));
        assert_eq!(process.stages.len(), 1);

        let stage = &process.stages[0];
        assert_eq!(stage.total_items, Some(2));
        assert_eq!(stage.items[0].node.summary.as_deref(), Some("10 rows"));
        assert_eq!(stage.items[1].node.status, NodeStatus::Error);
        assert_eq!(stage.items[1].node.error.as_deref(), Some("locked"));

        assert_eq!(progress.completed_at(), Some(t(7)));
        assert_eq!(progress.started_at(), Some(t(0)));
    }

    #[test]
    fn test_stage_requires_running_process() {
        let mut progress = Progress::new();
        assert!(!progress.start_stage("orphan", None, FailurePolicy::Fail, t(0)));
        assert!(!progress.start_item("orphan", FailurePolicy::Fail, t(0)));
        assert!(progress.is_empty());
    }

    #[test]
    fn test_fail_process_closes_open_children() {
        let mut progress = Progress::new();
        progress.start_process("Sync", None, None, t(0));
        progress.start_stage("push", None, FailurePolicy::Fail, t(1));
        progress.start_item("batch 1", FailurePolicy::Parent, t(2));
        progress.fail_process("remote unreachable", t(3));

        let process = &progress.sequence[0];
        assert_eq!(process.node.status, NodeStatus::Error);
        assert_eq!(process.stages[0].node.status, NodeStatus::Error);
        assert_eq!(process.stages[0].items[0].node.status, NodeStatus::Error);
        assert_eq!(process.stages[0].items[0].node.completed_at, Some(t(3)));
    }

    #[test]
    fn test_cancel_process() {
        let mut progress = Progress::new();
        progress.start_process("Probe", None, None, t(0));
        progress.start_stage("wait", None, FailurePolicy::Fail, t(1));
        progress.cancel_process(t(2));

        assert_eq!(progress.status(), Some(NodeStatus::Cancelled));
        assert_eq!(progress.sequence[0].stages[0].node.status, NodeStatus::Cancelled);
        assert_eq!(progress.completed_at(), Some(t(2)));
    }

    #[test]
    fn test_closed_nodes_are_not_reopened() {
        let mut progress = Progress::new();
        progress.start_process("Once", None, None, t(0));
        progress.complete_process(None, t(1));
        progress.fail_process("late failure", t(2));

        assert_eq!(progress.status(), Some(NodeStatus::Success));
        assert_eq!(progress.completed_at(), Some(t(1)));
        assert!(progress.sequence[0].node.error.is_none());
    }

    #[test]
    fn test_new_process_completes_previous() {
        let mut progress = Progress::new();
        progress.start_process("first", None, None, t(0));
        progress.start_process("second", None, None, t(5));

        assert_eq!(progress.sequence.len(), 2);
        assert_eq!(progress.sequence[0].node.status, NodeStatus::Success);
        assert_eq!(progress.sequence[0].node.completed_at, Some(t(5)));
        assert!(progress.completed_at().is_none());
    }

    #[test]
    fn test_serde_round_trip_keeps_completion_time() {
        let mut progress = Progress::new();
        progress.start_process("Housekeeping", None, None, t(0));
        progress.complete_process(Some("ok"), t(9));

        let json = serde_json::to_string(&progress).unwrap();
        let parsed: Progress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, progress);
        assert_eq!(parsed.completed_at(), Some(t(9)));
    }
