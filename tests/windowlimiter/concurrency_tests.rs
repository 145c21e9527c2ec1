// tests/windowlimiter/concurrency_tests.rs

#[cfg(test)]
mod tests {
    use crate::fixtures::manual_limiter;
    use crate::fixtures::manual_clock::ManualClock;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn release_and_sweep_race_returns_exactly_one_permit() {
        let clock = ManualClock::new(0.0);
        let limiter = Arc::new(manual_limiter(1, clock.clone()));

        for round in 0..500 {
            let id = limiter.acquire().await.unwrap();
            assert_eq!(limiter.available_permits(), 0);
            clock.advance(2.0);

            let barrier = Arc::new(Barrier::new(2));
            let releaser = {
                let limiter = Arc::clone(&limiter);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    usize::from(limiter.release(id))
                })
            };
            let sweeper = {
                let limiter = Arc::clone(&limiter);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    limiter.sweep_now()
                })
            };

            let returned = releaser.await.unwrap() + sweeper.await.unwrap();
            assert_eq!(returned, 1, "round {round} returned {returned} permits");
            assert_eq!(limiter.available_permits(), 1);
            assert_eq!(limiter.outstanding(), 0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn in_flight_work_never_exceeds_capacity() {
        let limiter = Arc::new(manual_limiter(3, ManualClock::new(0.0)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::new();
        for _ in 0..40 {
            let limiter = Arc::clone(&limiter);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            workers.push(tokio::spawn(async move {
                limiter
                    .run(async {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        for worker in workers {
            worker.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(limiter.available_permits(), 3);
        assert_eq!(limiter.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocked_caller_is_woken_by_expiry() {
        let clock = ManualClock::new(0.0);
        let limiter = Arc::new(manual_limiter(1, clock.clone()));
        let _forgotten = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        clock.advance(1.5);
        assert_eq!(limiter.sweep_now(), 1);

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("expiry should unblock the waiter")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn ledger_and_pool_agree_after_mixed_traffic() {
        let clock = ManualClock::new(0.0);
        let limiter = Arc::new(manual_limiter(8, clock.clone()));

        let mut tasks = Vec::new();
        for i in 0..64 {
            let limiter = Arc::clone(&limiter);
            tasks.push(tokio::spawn(async move {
                let id = limiter.acquire().await.unwrap();
                // every other caller forgets to release
                if i % 2 == 0 {
                    limiter.release(id);
                }
            }));
        }

        let done = Arc::new(AtomicBool::new(false));
        let sweeps = {
            let limiter = Arc::clone(&limiter);
            let clock = clock.clone();
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut reclaimed = 0;
                while !done.load(Ordering::SeqCst) {
                    clock.advance(0.5);
                    reclaimed += limiter.sweep_now();
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                reclaimed
            })
        };

        for task in tasks {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("no caller should starve")
                .unwrap();
        }
        done.store(true, Ordering::SeqCst);
        sweeps.await.unwrap();

        clock.advance(10.0);
        limiter.sweep_now();
        assert_eq!(limiter.outstanding(), 0);
        assert_eq!(limiter.available_permits(), 8);
    }
}
