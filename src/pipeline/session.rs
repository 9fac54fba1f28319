//! Document detection session.
//!
//! A session owns the per-document state of the pipeline: the annotation
//! cache, the timing table and the set of pages currently being detected.
//! All of it is mutated by a single owner task; handles talk to the owner by
//! message passing and read the cache and timings through shared snapshots,
//! so lookups never wait for the owner.
//!
//! Requests for a page that is already being detected join the running job
//! and receive the same result. Requests for a cached page are answered from
//! the cache. When a job finishes the owner, in this order, records its
//! timing, caches the result, invokes every waiter and forgets the job, so a
//! request issued from inside a callback is served from the cache.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::cache::AnnotationCache;
use super::detection::PageDetector;
use super::timing::TimingTable;
use crate::core::errors::{BoardScanError, BoardScanResult};
use crate::core::traits::PageSource;
use crate::domain::{Annotation, PageId};

/// Callback receiving the annotations of one page.
type Waiter = Box<dyn FnOnce(Arc<[Annotation]>) + Send>;

struct Request {
    page: PageId,
    waiter: Waiter,
}

struct Finished {
    page: PageId,
    annotations: Vec<Annotation>,
}

struct InFlight {
    started: Instant,
    waiters: Vec<Waiter>,
}

#[derive(Default)]
struct Shared {
    cache: RwLock<AnnotationCache>,
    timings: RwLock<TimingTable>,
}

/// Handle to the detection session of one open document.
///
/// Cloning the handle is cheap; every clone talks to the same owner task.
/// The owner exits once every handle is dropped and the running jobs have
/// been delivered.
#[derive(Clone)]
pub struct DetectionSession {
    source: Arc<dyn PageSource>,
    requests: mpsc::UnboundedSender<Request>,
    shared: Arc<Shared>,
}

impl DetectionSession {
    /// Starts the owner task on the current tokio runtime.
    pub fn spawn(source: Arc<dyn PageSource>, detector: PageDetector) -> Self {
        let (requests, requests_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        let owner = Owner {
            source: source.clone(),
            detector: Arc::new(detector),
            shared: shared.clone(),
            in_flight: HashMap::new(),
        };
        tokio::spawn(owner.run(requests_rx));
        Self {
            source,
            requests,
            shared,
        }
    }

    pub fn source(&self) -> &Arc<dyn PageSource> {
        &self.source
    }

    /// Cached annotations of `page`.
    ///
    /// `None` means the page was never requested or is still being detected.
    pub fn cached_annotations(&self, page: PageId) -> Option<Arc<[Annotation]>> {
        self.shared.cache.read().get(&page)
    }

    /// Asks for the annotations of `page` and calls `on_complete` with them.
    ///
    /// Returns immediately. The callback runs on the owner task and must not
    /// block.
    pub fn request_annotations<F>(&self, page: PageId, on_complete: F) -> BoardScanResult<()>
    where
        F: FnOnce(Arc<[Annotation]>) + Send + 'static,
    {
        self.check_page(page)?;
        self.requests
            .send(Request {
                page,
                waiter: Box::new(on_complete),
            })
            .map_err(|_| BoardScanError::SessionClosed)
    }

    /// Annotations of `page`, detecting them first if needed.
    pub async fn annotations(&self, page: PageId) -> BoardScanResult<Arc<[Annotation]>> {
        if let Some(cached) = self.cached_annotations(page) {
            return Ok(cached);
        }
        let (tx, rx) = oneshot::channel();
        self.request_annotations(page, move |annotations| {
            let _ = tx.send(annotations);
        })?;
        rx.await.map_err(|_| BoardScanError::SessionClosed)
    }

    /// Detects `pages` concurrently and returns their annotations in the
    /// given order.
    pub async fn detect_pages(
        &self,
        pages: &[PageId],
    ) -> BoardScanResult<Vec<(PageId, Arc<[Annotation]>)>> {
        let mut pending = Vec::with_capacity(pages.len());
        for &page in pages {
            let (tx, rx) = oneshot::channel();
            self.request_annotations(page, move |annotations| {
                let _ = tx.send(annotations);
            })?;
            pending.push((page, rx));
        }

        let mut results = Vec::with_capacity(pending.len());
        for (page, rx) in pending {
            let annotations = rx.await.map_err(|_| BoardScanError::SessionClosed)?;
            results.push((page, annotations));
        }
        Ok(results)
    }

    /// Detects every page of the document.
    pub async fn detect_all(&self) -> BoardScanResult<Vec<(PageId, Arc<[Annotation]>)>> {
        let pages = self.source.pages();
        self.detect_pages(&pages).await
    }

    /// Snapshot of the timing table.
    pub fn timings(&self) -> TimingTable {
        self.shared.timings.read().clone()
    }

    fn check_page(&self, page: PageId) -> BoardScanResult<()> {
        if page.document() != self.source.document() || page.index() >= self.source.page_count() {
            return Err(BoardScanError::invalid_input(format!(
                "{} is not a page of {}",
                page,
                self.source.document()
            )));
        }
        Ok(())
    }
}

struct Owner {
    source: Arc<dyn PageSource>,
    detector: Arc<PageDetector>,
    shared: Arc<Shared>,
    in_flight: HashMap<PageId, InFlight>,
}

impl Owner {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request>) {
        let (finished_tx, mut finished) = mpsc::unbounded_channel();
        let mut accepting = true;

        loop {
            tokio::select! {
                Some(done) = finished.recv() => self.complete(done),
                request = requests.recv(), if accepting => match request {
                    Some(request) => self.accept(request, &finished_tx),
                    None => accepting = false,
                },
                else => break,
            }
            if !accepting && self.in_flight.is_empty() {
                break;
            }
        }
        debug!("Detection session for {} stopped", self.source.document());
    }

    fn accept(&mut self, request: Request, finished: &mpsc::UnboundedSender<Finished>) {
        let Request { page, waiter } = request;

        let cached = self.shared.cache.read().get(&page);
        if let Some(annotations) = cached {
            deliver(page, waiter, annotations);
            return;
        }
        if let Some(job) = self.in_flight.get_mut(&page) {
            debug!("{} already in flight, joining", page);
            job.waiters.push(waiter);
            return;
        }

        self.in_flight.insert(
            page,
            InFlight {
                started: Instant::now(),
                waiters: vec![waiter],
            },
        );

        let source = self.source.clone();
        let detector = self.detector.clone();
        let finished = finished.clone();
        tokio::spawn(async move {
            let job = tokio::task::spawn_blocking(move || detector.detect_page(source.as_ref(), page));
            let annotations = match job.await {
                Ok(annotations) => annotations,
                Err(e) => {
                    warn!("Detection job for {} failed: {}", page, e);
                    Vec::new()
                }
            };
            let _ = finished.send(Finished { page, annotations });
        });
    }

    fn complete(&mut self, done: Finished) {
        let Finished { page, annotations } = done;
        let annotations: Arc<[Annotation]> = Arc::from(annotations);

        let (elapsed_ms, waiters) = match self.in_flight.get_mut(&page) {
            Some(job) => (
                job.started.elapsed().as_secs_f64() * 1000.0,
                std::mem::take(&mut job.waiters),
            ),
            None => (0.0, Vec::new()),
        };

        self.shared.timings.write().record(page.index(), elapsed_ms);
        let annotations = self.shared.cache.write().insert_once(page, annotations);
        info!(
            "{}: {} annotations in {:.1} ms",
            page,
            annotations.len(),
            elapsed_ms
        );

        for waiter in waiters {
            deliver(page, waiter, annotations.clone());
        }
        self.in_flight.remove(&page);
    }
}

/// Invokes one waiter. A panicking callback is logged and does not take the
/// owner task down with it.
fn deliver(page: PageId, waiter: Waiter, annotations: Arc<[Annotation]>) {
    if catch_unwind(AssertUnwindSafe(move || waiter(annotations))).is_err() {
        warn!("Annotation callback for {} panicked", page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core::config::PipelineConfig;
    use crate::domain::{AnnotationKind, Size};
    use crate::pipeline::testing::{
        ScriptedDetector, SolidPageSource, WidthKeyedClassifier, three_candidates,
    };

    struct Fixture {
        session: DetectionSession,
        source: Arc<SolidPageSource>,
        detector: Arc<ScriptedDetector>,
        classifier: Arc<WidthKeyedClassifier>,
    }

    fn fixture(pages: usize, detector: ScriptedDetector) -> Fixture {
        let source = Arc::new(SolidPageSource::new(pages, Size::new(200.0, 300.0)));
        let detector = Arc::new(detector);
        let classifier = Arc::new(WidthKeyedClassifier::default());
        let page_detector =
            PageDetector::new(detector.clone(), classifier.clone(), PipelineConfig::default());
        let session = DetectionSession::spawn(source.clone(), page_detector);
        Fixture {
            session,
            source,
            detector,
            classifier,
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_job() {
        let f = fixture(
            1,
            ScriptedDetector::returning(three_candidates()).with_delay(Duration::from_millis(50)),
        );
        let page = f.source.first_page();

        let (first, second) = tokio::join!(f.session.annotations(page), f.session.annotations(page));
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(f.detector.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn test_every_waiter_is_called() {
        let f = fixture(
            1,
            ScriptedDetector::returning(three_candidates()).with_delay(Duration::from_millis(50)),
        );
        let page = f.source.first_page();

        let (tx, mut rx) = mpsc::unbounded_channel();
        for caller in 0..3 {
            let tx = tx.clone();
            f.session
                .request_annotations(page, move |annotations| {
                    let _ = tx.send((caller, annotations.len()));
                })
                .unwrap();
        }
        drop(tx);

        let mut delivered = Vec::new();
        while let Some(entry) = rx.recv().await {
            delivered.push(entry);
        }
        delivered.sort();
        assert_eq!(delivered, vec![(0, 3), (1, 3), (2, 3)]);
        assert_eq!(f.detector.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_page_is_never_detected_again() {
        let f = fixture(1, ScriptedDetector::returning(three_candidates()));
        let page = f.source.first_page();
        assert!(f.session.cached_annotations(page).is_none());

        let first = f.session.annotations(page).await.unwrap();
        let cached = f.session.cached_annotations(page).unwrap();
        assert!(Arc::ptr_eq(&first, &cached));

        f.session.annotations(page).await.unwrap();
        let (tx, rx) = oneshot::channel();
        f.session
            .request_annotations(page, move |annotations| {
                let _ = tx.send(annotations);
            })
            .unwrap();
        let third = rx.await.unwrap();

        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(f.detector.calls(), 1);
        assert_eq!(f.classifier.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_result_is_cached_and_timed() {
        let f = fixture(2, ScriptedDetector::returning(Vec::new()));
        let page = f.source.page(1).unwrap();

        let annotations = f.session.annotations(page).await.unwrap();
        assert!(annotations.is_empty());
        assert_eq!(f.session.cached_annotations(page).map(|a| a.len()), Some(0));
        assert!(f.session.timings().get(1).is_some());
        assert!(f.session.timings().get(0).is_none());
        assert_eq!(f.classifier.calls(), 0);

        f.session.annotations(page).await.unwrap();
        assert_eq!(f.detector.calls(), 1);
    }

    #[tokio::test]
    async fn test_classifier_failure_degrades_to_unknown() {
        let f = fixture(1, ScriptedDetector::returning(three_candidates()));
        let annotations = f.session.annotations(f.source.first_page()).await.unwrap();
        let kinds: Vec<_> = annotations.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AnnotationKind::Chessboard,
                AnnotationKind::Goboard,
                AnnotationKind::Unknown
            ]
        );
    }

    #[tokio::test]
    async fn test_cache_is_populated_before_callback() {
        let f = fixture(1, ScriptedDetector::returning(three_candidates()));
        let page = f.source.first_page();

        let (tx, rx) = oneshot::channel();
        let session = f.session.clone();
        f.session
            .request_annotations(page, move |_| {
                let cached = session.cached_annotations(page).map(|a| a.len());
                let timed = session.timings().get(page.index()).is_some();
                let _ = tx.send((cached, timed));
            })
            .unwrap();

        assert_eq!(rx.await.unwrap(), (Some(3), true));
    }

    #[tokio::test]
    async fn test_reentrant_request_is_served_from_cache() {
        let f = fixture(1, ScriptedDetector::returning(three_candidates()));
        let page = f.source.first_page();

        let (tx, rx) = oneshot::channel();
        let session = f.session.clone();
        f.session
            .request_annotations(page, move |_| {
                let _ = session.request_annotations(page, move |again| {
                    let _ = tx.send(again.len());
                });
            })
            .unwrap();

        assert_eq!(rx.await.unwrap(), 3);
        assert_eq!(f.detector.calls(), 1);
    }

    #[tokio::test]
    async fn test_panicking_job_delivers_empty_list() {
        let f = fixture(1, ScriptedDetector::panicking());
        let page = f.source.first_page();

        let annotations = f.session.annotations(page).await.unwrap();
        assert!(annotations.is_empty());
        assert!(f.session.cached_annotations(page).is_some());
    }

    #[tokio::test]
    async fn test_panicking_callback_keeps_session_alive() {
        let f = fixture(2, ScriptedDetector::returning(three_candidates()));
        let first = f.source.first_page();
        let second = f.source.page(1).unwrap();

        let (tx, rx) = oneshot::channel();
        f.session
            .request_annotations(first, |_| panic!("callback failure"))
            .unwrap();
        f.session
            .request_annotations(first, move |annotations| {
                let _ = tx.send(annotations.len());
            })
            .unwrap();
        assert_eq!(rx.await.unwrap(), 3);

        f.session
            .request_annotations(first, |_| panic!("callback failure on cached page"))
            .unwrap();
        let other = f.session.annotations(second).await.unwrap();
        assert_eq!(other.len(), 3);
        assert_eq!(f.detector.calls(), 2);
    }

    #[tokio::test]
    async fn test_detect_all_covers_every_page() {
        let f = fixture(4, ScriptedDetector::returning(three_candidates()));
        let results = f.session.detect_all().await.unwrap();

        let indices: Vec<_> = results.iter().map(|(page, _)| page.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(f.detector.calls(), 4);
        assert_eq!(f.session.timings().len(), 4);
    }

    #[tokio::test]
    async fn test_foreign_page_is_rejected() {
        let f = fixture(1, ScriptedDetector::default());
        let other = SolidPageSource::new(1, Size::new(10.0, 10.0));

        let err = f.session.annotations(other.first_page()).await.unwrap_err();
        assert!(matches!(err, BoardScanError::InvalidInput { .. }));

        let out_of_range = PageId::new(f.source.document(), 5);
        let err = f.session.request_annotations(out_of_range, |_| {}).unwrap_err();
        assert!(matches!(err, BoardScanError::InvalidInput { .. }));
    }
}
