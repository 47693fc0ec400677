//! Single-slot background queue for lookup requests and thumbnail fetches.
//! One worker thread runs jobs in the order they were queued, never two at
//! once, so a slow job delays everything behind it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::error::{IoContext, Result};

type Job = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// A named worker thread fed through a channel. Dropping the queue waits
/// for queued jobs to finish.
pub struct SerialQueue {
    name: String,
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
}

impl SerialQueue {
    /// Spawn the worker thread, named after the queue.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker_pending = Arc::clone(&pending);
        let worker_name = name.clone();
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                for job in receiver {
                    match panic::catch_unwind(AssertUnwindSafe(job)) {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => warn!("{worker_name}: background job failed: {err:#}"),
                        Err(payload) => warn!(
                            "{worker_name}: background job panicked: {}",
                            panic_message(payload.as_ref())
                        ),
                    }
                    worker_pending.fetch_sub(1, Ordering::SeqCst);
                }
                debug!("{worker_name}: worker stopped");
            })
            .context("failed to spawn queue worker")?;

        Ok(Self {
            name,
            sender: Some(sender),
            worker: Some(worker),
            pending,
        })
    }

    /// Queue a job behind everything already queued. Returns `false` if the
    /// queue has been shut down.
    pub fn enqueue<F>(&self, job: F) -> bool
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let Some(sender) = &self.sender else {
            return false;
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(Box::new(job)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Run everything already queued, then stop the worker.
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("{}: worker panicked", self.name);
            }
        }
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn jobs_run_one_at_a_time_in_order() {
        let mut queue = SerialQueue::new("test-queue").unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let running = Arc::clone(&running);
            let max_running = Arc::clone(&max_running);
            let order = Arc::clone(&order);
            assert!(queue.enqueue(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                order.lock().unwrap().push(i);
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        queue.shutdown();

        assert_eq!(*order.lock().unwrap(), [0, 1, 2, 3, 4]);
        assert_eq!(max_running.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn failed_job_does_not_stop_the_queue() {
        let mut queue = SerialQueue::new("failing-queue").unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        queue.enqueue(|| Err(anyhow::anyhow!("lookup failed")));
        let counter = Arc::clone(&ran);
        queue.enqueue(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        queue.shutdown();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(!queue.enqueue(|| Ok(())));
    }

    #[test]
    fn panicking_job_does_not_stop_the_queue() {
        let mut queue = SerialQueue::new("panicking-queue").unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        assert!(queue.enqueue(|| panic!("thumbnail decoder blew up")));
        let counter = Arc::clone(&ran);
        let accepted = queue.enqueue(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        queue.shutdown();

        assert!(accepted);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        let literal: Box<dyn Any + Send> = Box::new("static text");
        let owned: Box<dyn Any + Send> = Box::new(String::from("formatted text"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(literal.as_ref()), "static text");
        assert_eq!(panic_message(owned.as_ref()), "formatted text");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
