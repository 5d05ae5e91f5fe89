use std::sync::Arc;
use std::time::Duration;

use gloss_types::CacheEntry;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::{DefinitionCache, cache_key};
use crate::source::{DefinitionSource, LookupError};
use crate::throttle::LookupThrottle;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of resolving one word for one run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    Defined(String),
    /// Looked up (now or earlier in the session) and nothing was found.
    Absent,
    /// The bounded wait expired. Nothing was cached; a later run may retry.
    TimedOut,
}

impl Resolution {
    pub fn definition(&self) -> Option<&str> {
        match self {
            Resolution::Defined(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl From<CacheEntry> for Resolution {
    fn from(entry: CacheEntry) -> Self {
        match entry {
            CacheEntry::Defined(text) => Resolution::Defined(text),
            CacheEntry::Absent => Resolution::Absent,
        }
    }
}

#[derive(Debug)]
struct LookupTimedOut;

/// Memoizing front for a [`DefinitionSource`].
///
/// At most one lookup per word is outstanding: callers that arrive while a
/// lookup is in flight wait for it instead of issuing their own. Failures are
/// logged and cached as absent; only timeouts leave the word unresolved.
pub struct Resolver {
    source: Arc<dyn DefinitionSource>,
    cache: Arc<DefinitionCache>,
    throttle: Option<LookupThrottle>,
    timeout: Duration,
}

impl Resolver {
    pub fn new(source: Arc<dyn DefinitionSource>, cache: Arc<DefinitionCache>) -> Self {
        Self {
            source,
            cache,
            throttle: None,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Bounded wait per resolution, including time spent throttled.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_throttle(mut self, throttle: LookupThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn cache(&self) -> &Arc<DefinitionCache> {
        &self.cache
    }

    pub async fn resolve(&self, word: &str) -> Resolution {
        let key = cache_key(word);
        if key.is_empty() {
            return Resolution::Absent;
        }

        let slot = self.cache.slot(&key);
        if let Some(entry) = slot.get() {
            debug!(word = %key, "definition cache hit");
            return entry.clone().into();
        }

        match timeout(self.timeout, slot.get_or_try_init(|| self.fetch(&key))).await {
            Ok(Ok(entry)) => entry.clone().into(),
            Ok(Err(LookupTimedOut)) | Err(_) => {
                warn!(
                    word = %key,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "definition lookup timed out"
                );
                Resolution::TimedOut
            }
        }
    }

    async fn fetch(&self, key: &str) -> Result<CacheEntry, LookupTimedOut> {
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }
        debug!(word = %key, "looking up definition");
        match self.source.lookup(key).await {
            Ok(Some(definition)) => Ok(CacheEntry::Defined(definition)),
            Ok(None) => Ok(CacheEntry::Absent),
            Err(LookupError::Timeout) => Err(LookupTimedOut),
            Err(err) => {
                warn!(word = %key, error = %err, "definition lookup failed");
                Ok(CacheEntry::Absent)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::task::JoinSet;

    use super::*;

    /// Counts calls; answers from a fixed table after an optional delay.
    pub(crate) struct FakeSource {
        pub(crate) calls: AtomicUsize,
        pub(crate) delay: Duration,
        pub(crate) answers: HashMap<&'static str, Result<Option<&'static str>, &'static str>>,
    }

    impl FakeSource {
        pub(crate) fn new(
            answers: &[(&'static str, Result<Option<&'static str>, &'static str>)],
        ) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                answers: answers.iter().cloned().collect(),
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DefinitionSource for FakeSource {
        async fn lookup(&self, word: &str) -> Result<Option<String>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.answers.get(word) {
                Some(Ok(found)) => Ok(found.map(str::to_owned)),
                Some(Err("timeout")) => Err(LookupError::Timeout),
                Some(Err(_)) => Err(LookupError::Shape(
                    serde_json::from_str::<Vec<u8>>("{").unwrap_err(),
                )),
                None => Ok(None),
            }
        }
    }

    fn resolver(source: &Arc<FakeSource>) -> Resolver {
        let source: Arc<dyn DefinitionSource> = source.clone();
        Resolver::new(source, Arc::new(DefinitionCache::new()))
    }

    #[tokio::test]
    async fn caches_definitions_and_absence() {
        let source = Arc::new(FakeSource::new(&[("ran", Ok(Some("Moved quickly.")))]));
        let resolver = resolver(&source);

        assert_eq!(
            resolver.resolve("ran").await,
            Resolution::Defined("Moved quickly.".into())
        );
        assert_eq!(resolver.resolve("zzxq").await, Resolution::Absent);
        assert_eq!(
            resolver.resolve("RAN").await,
            Resolution::Defined("Moved quickly.".into())
        );
        assert_eq!(resolver.resolve("zzxq").await, Resolution::Absent);
        assert_eq!(source.calls(), 2);
        assert_eq!(resolver.cache().get("zzxq"), Some(CacheEntry::Absent));
    }

    #[tokio::test]
    async fn empty_words_are_never_looked_up() {
        let source = Arc::new(FakeSource::new(&[]));
        let resolver = resolver(&source);
        assert_eq!(resolver.resolve("").await, Resolution::Absent);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn failures_degrade_to_cached_absence() {
        let source = Arc::new(FakeSource::new(&[("broken", Err("shape"))]));
        let resolver = resolver(&source);
        assert_eq!(resolver.resolve("broken").await, Resolution::Absent);
        assert_eq!(resolver.resolve("broken").await, Resolution::Absent);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolutions_share_one_lookup() {
        let source = Arc::new(
            FakeSource::new(&[("ran", Ok(Some("Moved quickly.")))])
                .with_delay(Duration::from_millis(50)),
        );
        let resolver = Arc::new(resolver(&source));

        let mut tasks = JoinSet::new();
        for _ in 0..16 {
            let resolver = Arc::clone(&resolver);
            tasks.spawn(async move { resolver.resolve("ran").await });
        }
        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap(), Resolution::Defined("Moved quickly.".into()));
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookups_time_out_without_caching() {
        let source = Arc::new(
            FakeSource::new(&[("slow", Ok(Some("Eventually.")))])
                .with_delay(Duration::from_secs(30)),
        );
        let resolver = resolver(&source).with_timeout(Duration::from_secs(1));

        assert_eq!(resolver.resolve("slow").await, Resolution::TimedOut);
        assert_eq!(resolver.cache().get("slow"), None);
        assert_eq!(resolver.resolve("slow").await, Resolution::TimedOut);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn source_timeouts_are_not_cached() {
        let source = Arc::new(FakeSource::new(&[("flaky", Err("timeout"))]));
        let resolver = resolver(&source);
        assert_eq!(resolver.resolve("flaky").await, Resolution::TimedOut);
        assert_eq!(resolver.cache().get("flaky"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_hits_bypass_the_throttle() {
        let source = Arc::new(FakeSource::new(&[("ran", Ok(Some("Moved quickly.")))]));
        let resolver = resolver(&source).with_throttle(LookupThrottle::new(1, 1));
        let start = tokio::time::Instant::now();
        for _ in 0..5 {
            resolver.resolve("ran").await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(source.calls(), 1);
    }
}
