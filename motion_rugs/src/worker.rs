// THEORY:
// The `worker` module is the message-passing edge of the core. A `RugWorker` is an
// actor: one tokio task that exclusively owns a `RugProcessor`, receives inbound
// messages over a channel, and publishes every rendered rug on an outbound channel.
//
// Key architectural principles:
// 1.  **Single Mutator**: The processor never leaves its task. Frames are handled
//     strictly one at a time and a redraw runs to completion before the next frame
//     is received, so no locks are needed anywhere in the core.
// 2.  **Publish, Don't Share**: Rugs are moved into the outbound channel. Consumers
//     own what they receive and can never observe the processor's state mid-update.
// 3.  **Errors Are Reported, Not Fatal**: A refused frame is logged and counted, and
//     so is a redraw that fails after its frame was admitted. The stream continues. The task ends on `Shutdown`, when every handle is dropped, or
//     when nobody is listening for rugs anymore.

use crate::config::RugConfig;
use crate::error::{Result, RugError};
use crate::pipeline::{FrameMessage, RugImage, RugProcessor};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Message type for the rug worker actor.
#[derive(Debug)]
pub enum WorkerMessage {
    Frame(FrameMessage),
    Shutdown,
}

/// Totals reported by a worker when its task ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Messages received, refused or not.
    pub frames_received: u64,
    /// Messages refused at ingestion or by the sequencer.
    pub frames_rejected: u64,
    /// Redraws that failed after their frame had been admitted.
    pub redraws_failed: u64,
    /// Rugs published on the outbound channel.
    pub rugs_emitted: u64,
}

/// Failure to hand a message to a worker whose task has already ended.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rug worker has shut down")]
pub struct WorkerClosed;

/// Sending side of a running worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<WorkerMessage>,
}

impl WorkerHandle {
    /// Queues a frame, waiting if the inbound queue is full.
    pub async fn send_frame(&self, message: FrameMessage) -> std::result::Result<(), WorkerClosed> {
        self.sender.send(WorkerMessage::Frame(message)).await.map_err(|_| WorkerClosed)
    }

    /// Asks the worker to stop after the messages already queued.
    pub async fn shutdown(&self) -> std::result::Result<(), WorkerClosed> {
        self.sender.send(WorkerMessage::Shutdown).await.map_err(|_| WorkerClosed)
    }
}

/// A running worker: where to send frames, where rugs come out, and the task itself.
pub struct RugWorker {
    pub handle: WorkerHandle,
    pub rugs: mpsc::Receiver<RugImage>,
    pub task: JoinHandle<WorkerStats>,
}

impl RugWorker {
    /// Spawns the worker task on the current tokio runtime.
    ///
    /// `queue_depth` bounds both the inbound and the outbound channel.
    pub fn spawn(config: RugConfig, queue_depth: usize) -> Result<Self> {
        let processor = RugProcessor::new(config)?;
        let (sender, inbox) = mpsc::channel(queue_depth.max(1));
        let (rug_sender, rugs) = mpsc::channel(queue_depth.max(1));
        let task = tokio::spawn(Self::run(processor, inbox, rug_sender));
        Ok(Self {
            handle: WorkerHandle { sender },
            rugs,
            task,
        })
    }

    async fn run(
        mut processor: RugProcessor,
        mut inbox: mpsc::Receiver<WorkerMessage>,
        rug_sender: mpsc::Sender<RugImage>,
    ) -> WorkerStats {
        let mut stats = WorkerStats::default();
        info!(
            "rug worker started: strategies {:?}, features {:?}",
            processor.config().strategies,
            processor.config().features
        );

        'inbox: while let Some(message) = inbox.recv().await {
            let frame = match message {
                WorkerMessage::Frame(frame) => frame,
                WorkerMessage::Shutdown => break,
            };
            stats.frames_received += 1;

            let number = frame.frame_number;
            let rugs = match processor.handle(frame) {
                Ok(rugs) => rugs,
                Err(RugError::Render(err)) => {
                    stats.redraws_failed += 1;
                    warn!("redraw after frame {} failed: {}", number, err);
                    continue;
                }
                Err(err) => {
                    stats.frames_rejected += 1;
                    warn!("frame {} refused: {}", number, err);
                    continue;
                }
            };

            for rug in rugs {
                if rug_sender.send(rug).await.is_err() {
                    info!("rug receiver dropped; stopping worker");
                    break 'inbox;
                }
                stats.rugs_emitted += 1;
            }
        }

        info!(
            "rug worker stopped: {} frames received, {} rejected, {} failed redraws, {} rugs emitted",
            stats.frames_received, stats.frames_rejected, stats.redraws_failed, stats.rugs_emitted
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::reading::Reading;

    fn message(number: u64) -> FrameMessage {
        FrameMessage::new(
            number,
            vec![
                Reading::new(10.12345, 20.54321).with_feature("Velocity", 5.0),
                Reading::new(10.12399, 20.54399).with_feature("Velocity", 9.0),
            ],
            400,
        )
    }

    #[tokio::test]
    async fn worker_publishes_rugs_and_reports_stats() {
        let mut worker = RugWorker::spawn(RugConfig::default(), 8).unwrap();

        for number in [0, 2, 1] {
            worker.handle.send_frame(message(number)).await.unwrap();
        }
        let first = worker.rugs.recv().await.unwrap();
        assert_eq!((first.width(), first.height()), (1, 2));
        let second = worker.rugs.recv().await.unwrap();
        assert_eq!((second.width(), second.height()), (3, 2));

        worker.handle.send_frame(message(1)).await.unwrap();
        worker.handle.shutdown().await.unwrap();
        let stats = worker.task.await.unwrap();
        assert_eq!(
            stats,
            WorkerStats {
                frames_received: 4,
                frames_rejected: 1,
                redraws_failed: 0,
                rugs_emitted: 2,
            }
        );
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_the_worker() {
        let RugWorker { handle, rugs, task } = RugWorker::spawn(RugConfig::default(), 2).unwrap();
        drop(handle);
        let stats = task.await.unwrap();
        assert_eq!(stats, WorkerStats::default());
        drop(rugs);
    }

    #[tokio::test]
    async fn sending_to_a_stopped_worker_fails() {
        let worker = RugWorker::spawn(RugConfig::default(), 2).unwrap();
        worker.handle.shutdown().await.unwrap();
        worker.task.await.unwrap();
        assert_eq!(worker.handle.send_frame(message(0)).await, Err(WorkerClosed));
    }

    #[tokio::test]
    async fn refused_frames_count_as_rejections_not_failed_redraws() {
        let mut worker = RugWorker::spawn(RugConfig::default(), 8).unwrap();
        let mut missing = message(0);
        missing.frame_data[1] = Reading::new(10.12399, 20.54399);
        worker.handle.send_frame(missing).await.unwrap();
        worker.handle.send_frame(message(1)).await.unwrap();

        let rug = worker.rugs.recv().await.unwrap();
        assert_eq!(rug.ordered[0].number, 1);

        worker.handle.shutdown().await.unwrap();
        let stats = worker.task.await.unwrap();
        assert_eq!((stats.frames_rejected, stats.redraws_failed, stats.rugs_emitted), (1, 0, 1));
    }

    #[test]
    fn invalid_config_fails_before_spawning() {
        let config = RugConfig {
            redraw_interval: 0,
            ..RugConfig::default()
        };
        assert!(RugWorker::spawn(config, 1).is_err());
    }
}
