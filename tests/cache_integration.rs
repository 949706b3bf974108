//! Integration tests for the parallel function cache.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parcache::cache::{
    AbortOutcome, FunctionCache, ParallelExecutorCache, ParallelFunctionCache, OUT_OF_DOMAIN_VALUE,
};
use parcache::function::{
    from_fn, CancellationToken, CountingFunction, EvaluationError, Function, Rosenbrock,
};
use parcache::{ParCacheError, Point};

fn sum_function() -> Arc<dyn Function> {
    Arc::new(from_fn(|p: &Point| p.as_slice().iter().sum()))
}

fn p(coords: &[f64]) -> Point {
    Point::new(coords.to_vec())
}

/// Sum of coordinates that only returns once the gate is opened.
struct GatedSum {
    open: Arc<AtomicBool>,
}

impl Function for GatedSum {
    fn evaluate(&self, point: &Point, cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        loop {
            cancel.check()?;
            if self.open.load(Ordering::Acquire) {
                return Ok(point.as_slice().iter().sum());
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

/// Fails for points whose first coordinate exceeds one half, panics at the origin.
struct Picky;

impl Function for Picky {
    fn evaluate(&self, point: &Point, _cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        if point.get(0) == 0.0 {
            panic!("origin is not supported");
        }
        if point.get(0) > 0.5 {
            return Err(EvaluationError::failed("too large"));
        }
        Ok(point.get(0))
    }
}

fn wait_until_ready(cache: &ParallelExecutorCache, point: &Point) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cache.is_ready(point) {
        assert!(Instant::now() < deadline, "evaluation of {} never finished", point);
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Records how many evaluations run at the same time.
#[derive(Default)]
struct ConcurrencyTracker {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Function for ConcurrencyTracker {
    fn evaluate(&self, point: &Point, _cancel: &CancellationToken) -> Result<f64, EvaluationError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(point.get(0))
    }
}

/// Deterministic generator for reproducible point clouds.
struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

mod domain_tests {
    use super::*;

    #[test]
    fn test_out_of_domain_points_are_ignored() {
        let counting = Arc::new(CountingFunction::new(from_fn(|p: &Point| p.get(0))));
        let mut cache = ParallelExecutorCache::with_threads(2)
            .unwrap()
            .with_function(counting.clone());

        for point in [p(&[1.5, 0.1]), p(&[-0.1, 0.5]), p(&[f64::NAN, 0.5])] {
            cache.compute(&point).unwrap();
            assert!(!cache.is_pending(&point));
            assert_eq!(cache.get_value(&point).unwrap(), OUT_OF_DOMAIN_VALUE);
            assert_eq!(cache.abort(&point).unwrap(), AbortOutcome::NotComputed);
            cache.wait_for(&point).unwrap();
        }

        assert_eq!(counting.count(), 0);
        assert_eq!(cache.stats().submitted, 0);
    }

    #[test]
    fn test_boundary_points_are_in_domain() {
        let mut cache = ParallelExecutorCache::with_threads(2)
            .unwrap()
            .with_function(sum_function());

        let corner = p(&[1.0, 0.0]);
        cache.compute(&corner).unwrap();
        cache.wait_for(&corner).unwrap();
        assert_eq!(cache.get_value(&corner).unwrap(), 1.0);
    }
}

mod resolution_tests {
    use super::*;

    #[test]
    fn test_value_matches_direct_evaluation() {
        let function: Arc<dyn Function> = Arc::new(Rosenbrock);
        let mut cache = ParallelExecutorCache::with_threads(2)
            .unwrap()
            .with_function(function.clone());

        let point = p(&[0.3, 0.6]);
        cache.compute(&point).unwrap();
        cache.wait_for(&point).unwrap();

        let direct = function
            .evaluate(&point, &CancellationToken::new())
            .unwrap();
        assert_eq!(cache.get_value(&point).unwrap(), direct);
    }

    #[test]
    fn test_dimension_two_scenario() {
        let mut cache = ParallelExecutorCache::with_threads(2)
            .unwrap()
            .with_function(sum_function());

        let a = p(&[0.2, 0.3]);
        let b = p(&[0.9, 0.9]);
        let c = p(&[1.5, 0.1]);

        cache.compute_all(&[a.clone(), b.clone(), c.clone()]).unwrap();
        cache.wait_for_all(&[a.clone(), b.clone()]).unwrap();

        assert!((cache.get_value(&a).unwrap() - 0.5).abs() < 1e-12);
        assert!((cache.get_value(&b).unwrap() - 1.8).abs() < 1e-12);
        assert_eq!(cache.get_value(&c).unwrap(), OUT_OF_DOMAIN_VALUE);
        assert_eq!(cache.abort(&c).unwrap(), AbortOutcome::NotComputed);
    }

    #[test]
    fn test_get_value_before_wait_is_protocol_violation() {
        let open = Arc::new(AtomicBool::new(false));
        let mut cache = ParallelExecutorCache::with_threads(1)
            .unwrap()
            .with_function(Arc::new(GatedSum { open: open.clone() }));

        let point = p(&[0.1, 0.1]);
        assert!(cache.get_value(&point).unwrap_err().is_protocol_violation());

        cache.compute(&point).unwrap();
        assert!(cache.get_value(&point).unwrap_err().is_protocol_violation());

        open.store(true, Ordering::Release);
        cache.wait_for(&point).unwrap();
        assert!((cache.get_value(&point).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_wait_for_untracked_point_is_protocol_violation() {
        let mut cache = ParallelExecutorCache::with_threads(1)
            .unwrap()
            .with_function(sum_function());

        let err = cache.wait_for(&p(&[0.4, 0.4])).unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_compute_without_function_is_protocol_violation() {
        let mut cache = ParallelExecutorCache::with_threads(1).unwrap();
        let err = cache.compute(&p(&[0.4, 0.4])).unwrap_err();
        assert!(err.is_protocol_violation());
    }
}

mod dedup_tests {
    use super::*;

    #[test]
    fn test_compute_twice_evaluates_once() {
        let counting = Arc::new(CountingFunction::new(from_fn(|p: &Point| p.get(1))));
        let mut cache = ParallelExecutorCache::with_threads(4)
            .unwrap()
            .with_function(counting.clone());

        let point = p(&[0.25, 0.75]);
        cache.compute(&point).unwrap();
        cache.compute(&point).unwrap();
        cache.wait_for(&point).unwrap();
        cache.compute(&point).unwrap();

        assert_eq!(cache.get_value(&point).unwrap(), 0.75);
        assert_eq!(counting.count(), 1);

        let stats = cache.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.deduplicated, 2);
    }

    #[test]
    fn test_negative_zero_is_same_key() {
        let counting = Arc::new(CountingFunction::new(from_fn(|p: &Point| p.get(1))));
        let mut cache = ParallelExecutorCache::with_threads(1)
            .unwrap()
            .with_function(counting.clone());

        cache.compute(&p(&[0.0, 0.5])).unwrap();
        cache.compute(&p(&[-0.0, 0.5])).unwrap();
        cache.wait_for(&p(&[-0.0, 0.5])).unwrap();

        assert_eq!(counting.count(), 1);
    }
}

mod abort_tests {
    use super::*;

    #[test]
    fn test_cancel_before_completion() {
        let open = Arc::new(AtomicBool::new(false));
        let mut cache = ParallelExecutorCache::with_threads(1)
            .unwrap()
            .with_function(Arc::new(GatedSum { open: open.clone() }));

        let point = p(&[0.3, 0.3]);
        cache.compute(&point).unwrap();
        assert_eq!(cache.abort(&point).unwrap(), AbortOutcome::NotComputed);
        assert!(!cache.is_pending(&point));
        assert!(cache.get_value(&point).unwrap_err().is_protocol_violation());

        // A later compute starts over.
        cache.compute(&point).unwrap();
        assert!(cache.is_pending(&point));
        open.store(true, Ordering::Release);
        cache.wait_for(&point).unwrap();
        assert!((cache.get_value(&point).unwrap() - 0.6).abs() < 1e-12);

        let stats = cache.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.cancelled, 1);
    }

    #[test]
    fn test_harvest_after_completion() {
        let mut cache = ParallelExecutorCache::with_threads(2)
            .unwrap()
            .with_function(sum_function());

        let point = p(&[0.1, 0.2]);
        cache.compute(&point).unwrap();
        wait_until_ready(&cache, &point);

        assert_eq!(cache.abort(&point).unwrap(), AbortOutcome::ComputedAnyway);
        assert!((cache.get_value(&point).unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(cache.stats().harvested, 1);
    }

    #[test]
    fn test_abort_resolved_point_keeps_value() {
        let mut cache = ParallelExecutorCache::with_threads(1)
            .unwrap()
            .with_function(sum_function());

        let point = p(&[0.4, 0.1]);
        cache.compute(&point).unwrap();
        cache.wait_for(&point).unwrap();

        assert_eq!(cache.abort(&point).unwrap(), AbortOutcome::ComputedAnyway);
        assert!((cache.get_value(&point).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_abort_untracked_point_is_protocol_violation() {
        let mut cache = ParallelExecutorCache::with_threads(1)
            .unwrap()
            .with_function(sum_function());

        assert!(cache.abort(&p(&[0.4, 0.1])).unwrap_err().is_protocol_violation());
    }

    #[test]
    fn test_abort_many_continues_past_untracked_point() {
        let open = Arc::new(AtomicBool::new(false));
        let mut cache = ParallelExecutorCache::with_threads(2)
            .unwrap()
            .with_function(Arc::new(GatedSum { open }));

        let pending = [p(&[0.1, 0.1]), p(&[0.2, 0.2])];
        cache.compute_all(&pending).unwrap();

        let batch = [pending[0].clone(), p(&[0.9, 0.9]), pending[1].clone()];
        let err = cache.abort_many(&batch).unwrap_err();

        assert!(err.is_protocol_violation());
        assert_eq!(cache.pending_len(), 0);
        assert_eq!(cache.stats().cancelled, 2);
    }

    #[test]
    fn test_abort_all_mixed() {
        let open = Arc::new(AtomicBool::new(false));
        let mut cache = ParallelExecutorCache::with_threads(2)
            .unwrap()
            .with_function(Arc::new(GatedSum { open: open.clone() }));

        let points = [p(&[0.1, 0.1]), p(&[0.2, 0.2]), p(&[0.3, 0.3])];
        cache.compute_all(&points).unwrap();
        cache.abort_all();

        assert_eq!(cache.pending_len(), 0);
        for point in &points {
            assert!(cache.get_value(point).unwrap_err().is_protocol_violation());
        }
    }
}

mod invalidation_tests {
    use super::*;

    #[test]
    fn test_set_function_discards_everything() {
        let open = Arc::new(AtomicBool::new(true));
        let mut cache = ParallelExecutorCache::with_threads(2)
            .unwrap()
            .with_function(Arc::new(GatedSum { open: open.clone() }));

        let resolved = p(&[0.2, 0.2]);
        cache.compute(&resolved).unwrap();
        cache.wait_for(&resolved).unwrap();

        open.store(false, Ordering::Release);
        let pending = p(&[0.6, 0.6]);
        cache.compute(&pending).unwrap();
        assert_eq!(cache.pending_len(), 1);
        assert_eq!(cache.resolved_len(), 1);

        cache.set_function(sum_function());

        assert_eq!(cache.pending_len(), 0);
        assert_eq!(cache.resolved_len(), 0);
        assert!(cache.get_value(&resolved).unwrap_err().is_protocol_violation());
        assert!(cache.get_value(&pending).unwrap_err().is_protocol_violation());

        // The new function is used from now on.
        cache.compute(&resolved).unwrap();
        cache.wait_for(&resolved).unwrap();
        assert!((cache.get_value(&resolved).unwrap() - 0.4).abs() < 1e-12);
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_domain_failure_is_reported() {
        let mut cache = ParallelExecutorCache::with_threads(1)
            .unwrap()
            .with_function(Arc::new(Picky));

        let point = p(&[0.9]);
        cache.compute(&point).unwrap();
        let err = cache.wait_for(&point).unwrap_err();
        assert!(matches!(err, ParCacheError::EvaluationFailed { .. }));

        // Failures are not cached.
        assert!(!cache.is_pending(&point));
        assert!(cache.get_value(&point).unwrap_err().is_protocol_violation());
    }

    #[test]
    fn test_panic_is_internal_fault() {
        let mut cache = ParallelExecutorCache::with_threads(1)
            .unwrap()
            .with_function(Arc::new(Picky));

        let point = p(&[0.0]);
        cache.compute(&point).unwrap();
        let err = cache.wait_for(&point).unwrap_err();
        match err {
            ParCacheError::InternalFault { message, .. } => {
                assert!(message.contains("origin is not supported"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // The pool survives the panic.
        let good = p(&[0.25]);
        cache.compute(&good).unwrap();
        cache.wait_for(&good).unwrap();
        assert_eq!(cache.get_value(&good).unwrap(), 0.25);
    }
}

mod concurrency_tests {
    use super::*;

    #[test]
    fn test_hundred_random_points_match_direct_evaluation() {
        let function: Arc<dyn Function> = Arc::new(Rosenbrock);
        let mut cache = ParallelExecutorCache::with_threads(4)
            .unwrap()
            .with_function(function.clone());

        let mut rng = Lcg(42);
        let points: Vec<Point> = (0..100)
            .map(|_| p(&[rng.next_unit(), rng.next_unit(), rng.next_unit()]))
            .collect();

        cache.compute_all(&points).unwrap();
        cache.wait_for_all(&points).unwrap();

        let token = CancellationToken::new();
        for point in &points {
            let expected = function.evaluate(point, &token).unwrap();
            assert_eq!(cache.get_value(point).unwrap(), expected);
        }
        assert_eq!(cache.stats().resolved, 100);
        assert_eq!(cache.pending_len(), 0);
    }

    #[test]
    fn test_pool_bounds_concurrent_evaluations() {
        let tracker = Arc::new(ConcurrencyTracker::default());
        let mut cache = ParallelExecutorCache::with_threads(2)
            .unwrap()
            .with_function(tracker.clone());

        let points: Vec<Point> = (1..=16).map(|i| p(&[i as f64 / 20.0])).collect();
        cache.compute_all(&points).unwrap();
        cache.wait_for_all(&points).unwrap();

        let peak = tracker.peak.load(Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(peak <= 2, "{} evaluations ran at once on 2 workers", peak);
        assert_eq!(cache.resolved_len(), 16);
    }

    #[test]
    fn test_external_runtime_handle() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let mut cache =
            ParallelExecutorCache::with_handle(runtime.handle().clone()).with_function(sum_function());
        assert!(!cache.pool().is_owned());

        let points = [p(&[0.1, 0.2]), p(&[0.3, 0.4])];
        cache.compute_all(&points).unwrap();
        cache.wait_for_all(&points).unwrap();

        assert!((cache.get_value(&points[0]).unwrap() - 0.3).abs() < 1e-12);
        assert!((cache.get_value(&points[1]).unwrap() - 0.7).abs() < 1e-12);

        drop(cache);
        drop(runtime);
    }
}
