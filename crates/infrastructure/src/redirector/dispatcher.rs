use super::{parse_line, spawn_reply_writer, Frame, LineFramer, ReplyFormatter, WorkerPool};
use squid_tagger_application::ports::{PolicyStore, PolicyStoreFactory};
use squid_tagger_application::use_cases::ClassifyRequestUseCase;
use squid_tagger_domain::config::RedirectorConfig;
use squid_tagger_domain::DomainError;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counters reported when the input is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub lines: u64,
    pub requests: u64,
    pub malformed: u64,
}

enum Classifier {
    /// Pool size 0: classify before reading the next line.
    Inline(Box<dyn PolicyStore>),
    Pool(WorkerPool),
}

/// Reads request lines until end of input (or cancellation), hands them to
/// the workers and shuts everything down in order: stop reading, drain the
/// queue, stop the workers, flush the writer.
pub struct Dispatcher {
    config: RedirectorConfig,
    factory: Arc<dyn PolicyStoreFactory>,
    use_case: Arc<ClassifyRequestUseCase>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        config: &RedirectorConfig,
        factory: Arc<dyn PolicyStoreFactory>,
        use_case: Arc<ClassifyRequestUseCase>,
    ) -> Self {
        Self {
            config: config.clone(),
            factory,
            use_case,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop reading when `token` is cancelled; queued work still completes.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn run<R, W>(&self, mut input: R, output: W) -> Result<DispatchSummary, DomainError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let formatter =
            ReplyFormatter::new(self.config.response_format, self.config.redirect_status);
        let (replies, writer) = spawn_reply_writer(output, self.config.queue_capacity);

        let mut classifier = if self.config.workers == 0 {
            Classifier::Inline(self.factory.create())
        } else {
            Classifier::Pool(WorkerPool::spawn(
                self.config.workers,
                self.config.queue_capacity,
                Arc::clone(&self.factory),
                Arc::clone(&self.use_case),
                formatter,
                replies.clone(),
            ))
        };
        info!(
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            "Redirector ready"
        );

        let mut framer = LineFramer::new();
        let mut summary = DispatchSummary::default();
        let read_result = self
            .read_loop(&mut input, &mut framer, &mut classifier, &replies, formatter, &mut summary)
            .await;

        if let Classifier::Pool(pool) = classifier {
            pool.shutdown().await;
        }
        drop(replies);

        let written = writer
            .await
            .map_err(|e| DomainError::IoError(format!("reply writer task failed: {e}")))??;
        read_result?;

        debug!(written, "All replies written");
        Ok(summary)
    }

    async fn read_loop<R: AsyncRead + Unpin>(
        &self,
        input: &mut R,
        framer: &mut LineFramer,
        classifier: &mut Classifier,
        replies: &mpsc::Sender<String>,
        formatter: ReplyFormatter,
        summary: &mut DispatchSummary,
    ) -> Result<(), DomainError> {
        loop {
            while let Some(line) = framer.next_line() {
                self.handle_line(line, classifier, replies, formatter, summary)
                    .await?;
            }

            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Shutdown requested; no more requests accepted");
                    return Ok(());
                }
                read = input.read_buf(framer.buffer_mut()) => read?,
            };

            if read == 0 {
                if let Some(line) = framer.finish() {
                    self.handle_line(line, classifier, replies, formatter, summary)
                        .await?;
                }
                debug!("End of input");
                return Ok(());
            }
        }
    }

    async fn handle_line(
        &self,
        line: String,
        classifier: &mut Classifier,
        replies: &mpsc::Sender<String>,
        formatter: ReplyFormatter,
        summary: &mut DispatchSummary,
    ) -> Result<(), DomainError> {
        summary.lines += 1;
        debug!(line = %line, "Request line in");

        match parse_line(&line) {
            Frame::Request(request) => {
                summary.requests += 1;
                match classifier {
                    Classifier::Inline(store) => {
                        let decision = self.use_case.execute(store.as_mut(), &request).await;
                        send(replies, formatter.format(&request.id, &decision)).await
                    }
                    Classifier::Pool(pool) => pool.submit(request).await,
                }
            }
            Frame::Malformed(line) => {
                summary.malformed += 1;
                warn!(line = %line, "Malformed request line; echoing it back");
                send(replies, line).await
            }
        }
    }
}

async fn send(replies: &mpsc::Sender<String>, reply: String) -> Result<(), DomainError> {
    replies
        .send(reply)
        .await
        .map_err(|_| DomainError::IoError("reply writer closed".to_string()))
}
