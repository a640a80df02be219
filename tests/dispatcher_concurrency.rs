use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use voice_scout::{AnnounceOutcome, Announcer, SharedThrottle, SpeechEngine, SpeechError};

#[derive(Default)]
struct Counters {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    spoken: AtomicUsize,
}

struct Slow(Arc<Counters>);

impl SpeechEngine for Slow {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn speak(&mut self, _text: &str) -> Result<(), SpeechError> {
        let now = self.0.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(2));
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.spoken.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn racing_announcers_never_overlap_utterances() {
    let counters = Arc::new(Counters::default());
    let throttle = SharedThrottle::new(Duration::ZERO);
    let announcer = Arc::new(
        Announcer::new(throttle.clone(), Box::new(Slow(counters.clone()))).unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let announcer = announcer.clone();
            std::thread::spawn(move || {
                let mut dispatched = 0usize;
                for i in 0..50 {
                    let text = format!("pessoa {} {}", worker, i);
                    if let AnnounceOutcome::Dispatched { .. } =
                        announcer.announce(text, Instant::now())
                    {
                        dispatched += 1;
                    }
                    std::thread::yield_now();
                }
                dispatched
            })
        })
        .collect();
    let dispatched: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert!(throttle.wait_until_idle(Duration::from_secs(10)));
    match Arc::try_unwrap(announcer) {
        Ok(announcer) => announcer.shutdown(),
        Err(_) => panic!("announcer still shared"),
    }

    assert!(dispatched >= 1);
    assert_eq!(counters.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(counters.spoken.load(Ordering::SeqCst), dispatched);
    assert!(!throttle.is_speaking());
}
