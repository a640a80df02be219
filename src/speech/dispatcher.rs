use anyhow::{Context, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::JoinHandle;

use super::SpeechEngine;
use crate::throttle::SharedThrottle;

/// Result of handing a message to the speech worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dispatched,
    /// A message is already waiting for the worker.
    SlotBusy,
    /// The worker thread has exited.
    WorkerGone,
}

/// Owns the speech worker thread.
///
/// The worker is the only code that ever calls the engine, so at most one
/// utterance is in flight. Messages arrive through a channel with a single
/// slot, and `dispatch` never blocks: an occupied slot refuses the message.
///
/// The worker marks the throttle idle after every utterance, whether the
/// engine returned, failed or panicked. Dropping the dispatcher lets the
/// current utterance finish and then joins the worker.
pub struct SpeechDispatcher {
    tx: Option<SyncSender<String>>,
    worker: Option<JoinHandle<()>>,
}

impl SpeechDispatcher {
    pub fn spawn(engine: Box<dyn SpeechEngine>, throttle: SharedThrottle) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<String>(1);
        let worker = std::thread::Builder::new()
            .name("speech".to_string())
            .spawn(move || run_worker(engine, rx, throttle))
            .context("failed to spawn speech worker")?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// A dispatcher whose worker has already exited.
    #[cfg(test)]
    pub(crate) fn stopped() -> Self {
        let (tx, rx) = mpsc::sync_channel::<String>(1);
        drop(rx);
        Self {
            tx: Some(tx),
            worker: None,
        }
    }

    /// Hand an accepted message to the worker without waiting.
    pub fn dispatch(&self, text: String) -> DispatchOutcome {
        let Some(tx) = self.tx.as_ref() else {
            return DispatchOutcome::WorkerGone;
        };
        match tx.try_send(text) {
            Ok(()) => DispatchOutcome::Dispatched,
            Err(TrySendError::Full(_)) => DispatchOutcome::SlotBusy,
            Err(TrySendError::Disconnected(_)) => DispatchOutcome::WorkerGone,
        }
    }

    /// Close the channel and wait for the in-flight utterance to finish.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("speech worker terminated abnormally");
            }
        }
    }
}

impl Drop for SpeechDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(mut engine: Box<dyn SpeechEngine>, rx: Receiver<String>, throttle: SharedThrottle) {
    for text in rx {
        log::debug!("speech: start \"{}\"", text);
        match panic::catch_unwind(AssertUnwindSafe(|| engine.speak(&text))) {
            Ok(Ok(())) => log::debug!("speech: done \"{}\"", text),
            Ok(Err(err)) => log::error!("speech engine {} failed: {}", engine.name(), err),
            Err(_) => log::error!("speech engine {} panicked", engine.name()),
        }
        throttle.release();
    }
    log::debug!("speech worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::SpeechError;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    struct Scripted {
        spoken: Arc<Mutex<Vec<String>>>,
        fail: bool,
        panic: bool,
    }

    impl SpeechEngine for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
            self.spoken.lock().unwrap().push(text.to_string());
            if self.panic {
                panic!("engine crashed");
            }
            if self.fail {
                return Err(SpeechError::Engine("audio device lost".into()));
            }
            Ok(())
        }
    }

    type Spoken = Arc<Mutex<Vec<String>>>;

    fn dispatcher(fail: bool, panic: bool) -> (SpeechDispatcher, SharedThrottle, Spoken) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let throttle = SharedThrottle::new(Duration::ZERO);
        let engine = Scripted {
            spoken: spoken.clone(),
            fail,
            panic,
        };
        let dispatcher = SpeechDispatcher::spawn(Box::new(engine), throttle.clone()).unwrap();
        (dispatcher, throttle, spoken)
    }

    #[test]
    fn worker_speaks_and_returns_to_idle() {
        let (dispatcher, throttle, spoken) = dispatcher(false, false);
        assert!(throttle.try_acquire(Instant::now()).is_accepted());
        assert_eq!(
            dispatcher.dispatch("carro proximo direita".into()),
            DispatchOutcome::Dispatched
        );
        assert!(throttle.wait_until_idle(Duration::from_secs(5)));
        assert_eq!(*spoken.lock().unwrap(), vec!["carro proximo direita"]);
    }

    #[test]
    fn engine_failure_still_returns_to_idle() {
        let (dispatcher, throttle, spoken) = dispatcher(true, false);
        assert!(throttle.try_acquire(Instant::now()).is_accepted());
        dispatcher.dispatch("banco proximo frente".into());
        assert!(throttle.wait_until_idle(Duration::from_secs(5)));
        assert_eq!(spoken.lock().unwrap().len(), 1);
    }

    #[test]
    fn engine_panic_still_returns_to_idle_and_worker_survives() {
        let (dispatcher, throttle, spoken) = dispatcher(false, true);
        for _ in 0..2 {
            assert!(throttle.try_acquire(Instant::now()).is_accepted());
            assert_eq!(dispatcher.dispatch("pessoa".into()), DispatchOutcome::Dispatched);
            assert!(throttle.wait_until_idle(Duration::from_secs(5)));
        }
        assert_eq!(spoken.lock().unwrap().len(), 2);
    }

    struct Gated {
        started: mpsc::Sender<()>,
        gate: mpsc::Receiver<()>,
    }

    impl SpeechEngine for Gated {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn speak(&mut self, _text: &str) -> Result<(), SpeechError> {
            let _ = self.started.send(());
            let _ = self.gate.recv();
            Ok(())
        }
    }

    #[test]
    fn occupied_slot_refuses_dispatch() {
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let engine = Gated {
            started: started_tx,
            gate: gate_rx,
        };
        let dispatcher =
            SpeechDispatcher::spawn(Box::new(engine), SharedThrottle::new(Duration::ZERO)).unwrap();

        assert_eq!(dispatcher.dispatch("a".into()), DispatchOutcome::Dispatched);
        started_rx.recv().unwrap();
        assert_eq!(dispatcher.dispatch("b".into()), DispatchOutcome::Dispatched);
        assert_eq!(dispatcher.dispatch("c".into()), DispatchOutcome::SlotBusy);

        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();
        dispatcher.shutdown();
    }

    #[test]
    fn stopped_worker_refuses_dispatch() {
        let dispatcher = SpeechDispatcher::stopped();
        assert_eq!(dispatcher.dispatch("cão".into()), DispatchOutcome::WorkerGone);
    }

    #[test]
    fn shutdown_drains_in_flight_message() {
        let (dispatcher, throttle, spoken) = dispatcher(false, false);
        assert!(throttle.try_acquire(Instant::now()).is_accepted());
        dispatcher.dispatch("moto proximo esquerda".into());
        dispatcher.shutdown();
        assert_eq!(spoken.lock().unwrap().len(), 1);
        assert!(!throttle.is_speaking());
    }
}
