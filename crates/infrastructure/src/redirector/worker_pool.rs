use super::ReplyFormatter;
use squid_tagger_application::ports::PolicyStoreFactory;
use squid_tagger_application::use_cases::ClassifyRequestUseCase;
use squid_tagger_domain::{DomainError, Request};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Fixed set of workers fed by one bounded FIFO queue.
///
/// Every worker owns a policy store session from the factory. Submission
/// waits while the queue is full. Closing the queue lets each worker finish
/// what is queued and exit; a request in progress is never abandoned.
pub struct WorkerPool {
    tx: Option<mpsc::Sender<Request>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        size: usize,
        capacity: usize,
        factory: Arc<dyn PolicyStoreFactory>,
        use_case: Arc<ClassifyRequestUseCase>,
        formatter: ReplyFormatter,
        replies: mpsc::Sender<String>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Request>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..size)
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let mut store = factory.create();
                let use_case = Arc::clone(&use_case);
                let replies = replies.clone();

                tokio::spawn(async move {
                    debug!(worker, "Worker started");
                    let mut handled = 0u64;

                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(request) = next else { break };

                        let decision = use_case.execute(store.as_mut(), &request).await;
                        handled += 1;

                        if replies.send(formatter.format(&request.id, &decision)).await.is_err() {
                            warn!(worker, id = %request.id, "Reply writer gone; worker stopping");
                            break;
                        }
                    }

                    debug!(worker, handled, "Worker stopped");
                })
            })
            .collect();

        Self {
            tx: Some(tx),
            workers,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a request, waiting for room when the queue is full.
    pub async fn submit(&self, request: Request) -> Result<(), DomainError> {
        let tx = self.tx.as_ref().ok_or(DomainError::QueueClosed)?;
        tx.send(request).await.map_err(|_| DomainError::QueueClosed)
    }

    /// Close the queue and wait until every worker has drained it and exited.
    pub async fn shutdown(mut self) {
        self.tx.take();

        for (worker, handle) in self.workers.drain(..).enumerate() {
            if let Err(e) = handle.await {
                error!(worker, error = %e, "Worker task failed");
            }
        }
    }
}
