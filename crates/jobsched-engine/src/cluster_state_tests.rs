    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use jobsched_core::MemoryClusterCache;
    use jobsched_protocols::CacheError;

    /// Reads miss every entry, as if they expired just before the read.
    struct StaleReads(Arc<MemoryClusterCache>);

    #[async_trait]
    impl ClusterCache for StaleReads {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Ok(None)
        }

        async fn put(&self, key: &str, value: String) -> Result<(), CacheError> {
            self.0.put(key, value).await
        }

        async fn put_if_absent(&self, key: &str, value: String) -> Result<bool, CacheError> {
            self.0.put_if_absent(key, value).await
        }

        async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
            self.0.invalidate(key).await
        }

        async fn keys(&self) -> Result<Vec<String>, CacheError> {
            self.0.keys().await
        }
    }

    fn at(offset_secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(offset_secs)
    }

    fn completed(started: i64, finished: i64) -> Progress {
        let mut progress = Progress::new();
        progress.start_process("run", None, None, at(started));
        progress.complete_process(None, at(finished));
        progress
    }

    fn nodes() -> (ClusterJobState, ClusterJobState) {
        let cache: Arc<dyn ClusterCache> = Arc::new(MemoryClusterCache::new());
        (
            ClusterJobState::new(cache.clone(), "node-a"),
            ClusterJobState::new(cache, "node-b"),
        )
    }

    #[tokio::test]
    async fn test_acquire_is_exclusive() {
        let (a, b) = nodes();
        assert!(a.try_acquire(JobType::DataSync, &Progress::new()).await.unwrap());
        assert!(!b.try_acquire(JobType::DataSync, &Progress::new()).await.unwrap());
        assert!(b.try_acquire(JobType::Probe, &Progress::new()).await.unwrap());

        assert!(b.is_running(JobType::DataSync).await.unwrap());
        assert_eq!(a.running_types().await.unwrap(), vec![JobType::DataSync, JobType::Probe]);

        let record = b.running_record(JobType::DataSync).await.unwrap().unwrap();
        assert_eq!(record.node_id, "node-a");
    }

    #[tokio::test]
    async fn test_release_only_by_owner() {
        let (a, b) = nodes();
        a.try_acquire(JobType::DataSync, &Progress::new()).await.unwrap();

        b.release(JobType::DataSync).await.unwrap();
        assert!(a.is_running(JobType::DataSync).await.unwrap());

        a.release(JobType::DataSync).await.unwrap();
        assert!(!a.is_running(JobType::DataSync).await.unwrap());
        assert!(b.try_acquire(JobType::DataSync, &Progress::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_respects_owner() {
        let (a, b) = nodes();
        a.try_acquire(JobType::Housekeeping, &Progress::new()).await.unwrap();

        let mut live = Progress::new();
        live.start_process("cleanup", None, None, at(0));
        assert!(a.refresh(JobType::Housekeeping, &live).await.unwrap());
        assert!(!b.refresh(JobType::Housekeeping, &Progress::new()).await.unwrap());

        let record = b.running_record(JobType::Housekeeping).await.unwrap().unwrap();
        assert_eq!(record.progress, live);
    }

    #[tokio::test]
    async fn test_refresh_retakes_expired_token() {
        let (a, b) = nodes();
        assert!(a.refresh(JobType::DataSync, &Progress::new()).await.unwrap());

        let record = b.running_record(JobType::DataSync).await.unwrap().unwrap();
        assert_eq!(record.node_id, "node-a");
        assert!(!b.try_acquire(JobType::DataSync, &Progress::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_does_not_overwrite_token_taken_after_expiry() {
        let cache = Arc::new(MemoryClusterCache::new());
        let a = ClusterJobState::new(Arc::new(StaleReads(cache.clone())), "node-a");
        let b = ClusterJobState::new(cache.clone(), "node-b");
        assert!(b.try_acquire(JobType::DataSync, &Progress::new()).await.unwrap());

        assert!(!a.refresh(JobType::DataSync, &Progress::new()).await.unwrap());

        let record = b.running_record(JobType::DataSync).await.unwrap().unwrap();
        assert_eq!(record.node_id, "node-b");
    }

    #[tokio::test]
    async fn test_publish_completed_if_newer() {
        let (a, b) = nodes();
        assert!(a.publish_completed_if_newer(JobType::Probe, &completed(0, 10)).await.unwrap());
        assert!(!b.publish_completed_if_newer(JobType::Probe, &completed(0, 5)).await.unwrap());
        assert!(!b.publish_completed_if_newer(JobType::Probe, &completed(2, 10)).await.unwrap());
        assert!(b.publish_completed_if_newer(JobType::Probe, &completed(0, 20)).await.unwrap());

        let record = a.completed_record(JobType::Probe).await.unwrap().unwrap();
        assert_eq!(record.node_id, "node-b");
        assert_eq!(record.progress.completed_at(), Some(at(20)));
        assert_eq!(a.completed_types().await.unwrap(), vec![JobType::Probe]);
    }

    #[tokio::test]
    async fn test_unfinished_record_is_not_published() {
        let (a, _) = nodes();
        let mut running = Progress::new();
        running.start_process("run", None, None, at(0));
        assert!(!a.publish_completed_if_newer(JobType::Probe, &running).await.unwrap());
        assert!(a.completed_types().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_flag() {
        let (a, b) = nodes();
        assert!(!b.is_cancel_requested(JobType::DataSync).await.unwrap());
        a.request_cancel(JobType::DataSync).await.unwrap();
        assert!(b.is_cancel_requested(JobType::DataSync).await.unwrap());
        b.clear_cancel(JobType::DataSync).await.unwrap();
        assert!(!a.is_cancel_requested(JobType::DataSync).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_keys_are_ignored() {
        let cache = Arc::new(MemoryClusterCache::new());
        cache.put("jobsched:running:coffee", "{}".into()).await.unwrap();
        cache.put("other:running:probe", "{}".into()).await.unwrap();
        let state = ClusterJobState::new(cache, "node-a");
        assert!(state.running_types().await.unwrap().is_empty());
    }

    #[test]
    fn test_later_completed() {
        let early = completed(0, 5);
        let late = completed(0, 9);

        assert_eq!(later_completed(Some(early.clone()), Some(late.clone())), Some(late.clone()));
        assert_eq!(later_completed(Some(late.clone()), Some(early.clone())), Some(late.clone()));
        assert_eq!(later_completed(None, Some(early.clone())), Some(early.clone()));
        assert_eq!(later_completed(Some(early.clone()), None), Some(early.clone()));
        assert_eq!(later_completed(None, None), None);

        let tie_local = completed(1, 9);
        assert_eq!(later_completed(Some(tie_local.clone()), Some(late)), Some(tie_local));
    }
