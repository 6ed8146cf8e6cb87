    use super::*;

    fn cron_config(expression: Option<&str>) -> JobConfiguration {
        let mut config = JobConfiguration::new(
            "cfg-1",
            "Analytics",
            JobType::AnalyticsTable,
            SchedulingType::Cron,
        );
        config.cron_expression = expression.map(str::to_string);
        config
    }

    #[test]
    fn test_new_configuration_defaults() {
        let config = JobConfiguration::new("abc", "Sync", JobType::DataSync, SchedulingType::FixedDelay);
        assert!(config.enabled);
        assert!(config.has_identity());
        assert_eq!(config.job_status, JobStatus::NotStarted);
        assert_eq!(config.last_executed_status, JobStatus::NotStarted);
        assert!(config.last_executed.is_none());
        assert!(!config.is_used_in_queue());
    }

    #[test]
    fn test_undefined_cron_expressions() {
        assert!(cron_config(None).defined_cron_expression().is_none());
        assert!(cron_config(Some("")).defined_cron_expression().is_none());
        assert!(cron_config(Some("   ")).defined_cron_expression().is_none());
        assert!(cron_config(Some("* * * * * ?")).defined_cron_expression().is_none());
    }

    #[test]
    fn test_defined_cron_expression_is_trimmed() {
        let config = cron_config(Some(" 0 0 3 * * * "));
        assert_eq!(config.defined_cron_expression(), Some("0 0 3 * * *"));
    }

    #[test]
    fn test_defined_delay() {
        let config = JobConfiguration::new("d", "Delay", JobType::DataSync, SchedulingType::FixedDelay);
        assert_eq!(config.defined_delay(), None);
        assert_eq!(config.clone().with_delay(0).defined_delay(), None);
        assert_eq!(config.clone().with_delay(-5).defined_delay(), None);
        assert_eq!(config.with_delay(60).defined_delay(), Some(60));
    }

    #[test]
    fn test_queue_follower() {
        let base = JobConfiguration::new("q", "Queued", JobType::ResourceTable, SchedulingType::Cron);
        assert!(!base.is_queue_follower());

        let head = base.clone().with_queue("nightly", 0);
        assert!(head.is_used_in_queue());
        assert!(!head.is_queue_follower());

        let follower = base.with_queue("nightly", 2);
        assert!(follower.is_queue_follower());
    }

    #[test]
    fn test_identity() {
        let config = JobConfiguration::new("  ", "Nameless", JobType::Probe, SchedulingType::OnceAsap);
        assert!(!config.has_identity());
    }

    #[test]
    fn test_parameters_match_type() {
        let config = JobConfiguration::new("p", "Sync", JobType::DataSync, SchedulingType::OnceAsap);
        assert!(config.parameters_match_type());

        let matching = config.clone().with_parameters(JobParameters::DataSync { page_size: 50 });
        assert!(matching.parameters_match_type());

        let mismatched = config.with_parameters(JobParameters::DataIntegrity { checks: vec![] });
        assert!(!mismatched.parameters_match_type());
    }

    #[test]
    fn test_update_definition_keeps_run_state() {
        let now = Utc::now();
        let mut stored = JobConfiguration::new("u", "Old", JobType::DataSync, SchedulingType::Cron)
            .with_last_executed(now);
        stored.last_executed_status = JobStatus::Completed;

        let edited = JobConfiguration::new("u", "New", JobType::DataSync, SchedulingType::FixedDelay)
            .with_delay(30);
        stored.update_definition(&edited);

        assert_eq!(stored.name, "New");
        assert_eq!(stored.scheduling_type, SchedulingType::FixedDelay);
        assert_eq!(stored.delay, Some(30));
        assert_eq!(stored.last_executed, Some(now));
        assert_eq!(stored.last_executed_status, JobStatus::Completed);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "uid": "x1",
            "name": "Integrity",
            "job_type": "data-integrity",
            "scheduling_type": "CRON",
            "cron_expression": "0 0 2 * * *",
            "parameters": { "kind": "data-integrity", "checks": ["orphans"] }
        }"#;
        let config: JobConfiguration = serde_json::from_str(json).unwrap();
        assert!(config.enabled);
        assert_eq!(config.job_type, JobType::DataIntegrity);
        assert_eq!(config.job_status, JobStatus::NotStarted);
        assert_eq!(
            config.parameters,
            Some(JobParameters::DataIntegrity {
                checks: vec!["orphans".to_string()]
            })
        );
    }
