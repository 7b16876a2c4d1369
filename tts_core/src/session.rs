//! Inference session: the single serialization point of the pipeline.
//!
//! All other stages are pure and run in parallel across requests; the
//! model execution context is not safe for concurrent invocation, so
//! chunks are admitted one at a time in FIFO order across every request
//! competing for the model. The backend lives on a dedicated worker
//! thread; callers await a oneshot reply per chunk.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::model::InferenceBackend;
use crate::{AudioSegment, PhonemeChunk, TtsError, TtsResult};

/// Bound on queued-but-unexecuted chunks across all requests.
const QUEUE_CAPACITY: usize = 256;

struct SynthesisJob {
    chunk: PhonemeChunk,
    voice: String,
    speed: f32,
    reply: oneshot::Sender<TtsResult<AudioSegment>>,
}

/// Handle to the inference worker. Cloning shares the same queue.
#[derive(Clone)]
pub struct SessionHandle {
    queue: mpsc::Sender<SynthesisJob>,
    in_flight: Arc<AtomicUsize>,
}

impl SessionHandle {
    /// Move the backend onto its worker thread and return the queue
    /// handle. The worker exits when the last handle is dropped.
    pub fn spawn(mut backend: Box<dyn InferenceBackend>) -> Self {
        let (queue, mut jobs) = mpsc::channel::<SynthesisJob>(QUEUE_CAPACITY);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let gauge = Arc::clone(&in_flight);

        thread::spawn(move || {
            while let Some(job) = jobs.blocking_recv() {
                // Caller hung up while the job sat in the queue; skip
                // the work instead of synthesizing into the void.
                if job.reply.is_closed() {
                    debug!(chunk = job.chunk.index, "discarding cancelled chunk");
                    continue;
                }
                gauge.fetch_add(1, Ordering::SeqCst);
                let result = backend.synthesize_chunk(&job.chunk, &job.voice, job.speed);
                gauge.fetch_sub(1, Ordering::SeqCst);
                // A receiver that vanished mid-inference just drops the
                // finished segment.
                let _ = job.reply.send(result);
            }
            info!("inference session worker shutting down");
        });

        Self { queue, in_flight }
    }

    /// Enqueue one chunk. The returned receiver resolves with the
    /// chunk's audio once the worker reaches it; chunks are executed
    /// strictly in submission order.
    pub async fn submit(
        &self,
        chunk: PhonemeChunk,
        voice: String,
        speed: f32,
    ) -> TtsResult<oneshot::Receiver<TtsResult<AudioSegment>>> {
        let (reply, receiver) = oneshot::channel();
        self.queue
            .send(SynthesisJob {
                chunk,
                voice,
                speed,
                reply,
            })
            .await
            .map_err(|_| {
                TtsError::ModelUnavailable("inference worker is no longer running".to_string())
            })?;
        Ok(receiver)
    }

    /// Number of inference calls currently executing; never exceeds 1.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}
