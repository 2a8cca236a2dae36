//! Background execution context - The thread that owns the local engine.
//!
//! One dedicated thread per orchestrator, connected to the host solely by
//! the command/event channel pair. The engine never leaves this thread:
//! loading, generation, and reset all happen here, with results streamed
//! back as [`WorkerEvent`]s.

use crate::engine::{EngineFactory, LocalEngine};
use crate::protocol::{WorkerCommand, WorkerEvent};
use log::{debug, warn};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub(crate) fn spawn(
    factory: Arc<dyn EngineFactory>,
    command_rx: Receiver<WorkerCommand>,
    event_tx: Sender<WorkerEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || run(factory, command_rx, event_tx))
}

fn run(
    factory: Arc<dyn EngineFactory>,
    command_rx: Receiver<WorkerCommand>,
    event_tx: Sender<WorkerEvent>,
) {
    let mut engine: Option<Box<dyn LocalEngine>> = None;

    while let Ok(command) = command_rx.recv() {
        match command {
            WorkerCommand::Init { model_id } => {
                debug!("worker: loading model {}", model_id);
                let progress_tx = event_tx.clone();
                let loaded = factory.create(&model_id).and_then(|mut e| {
                    e.load(&mut |progress| {
                        let _ = progress_tx.send(WorkerEvent::Progress(progress));
                    })?;
                    Ok(e)
                });
                match loaded {
                    Ok(e) => {
                        engine = Some(e);
                        let _ = event_tx.send(WorkerEvent::Ready);
                    }
                    Err(err) => {
                        warn!("worker: load failed: {}", err);
                        engine = None;
                        let _ = event_tx.send(WorkerEvent::Error {
                            request_id: None,
                            message: err.to_string(),
                        });
                    }
                }
            }

            WorkerCommand::Generate {
                request_id,
                messages,
            } => match engine.as_mut() {
                None => {
                    let _ = event_tx.send(WorkerEvent::Error {
                        request_id: Some(request_id),
                        message: "engine not initialized".to_string(),
                    });
                }
                Some(e) => {
                    let delta_tx = event_tx.clone();
                    let result = e.generate(&messages, &mut |token| {
                        let _ = delta_tx.send(WorkerEvent::Delta {
                            request_id,
                            text: token.to_string(),
                        });
                    });
                    let event = match result {
                        Ok(text) => WorkerEvent::Done { request_id, text },
                        Err(err) => WorkerEvent::Error {
                            request_id: Some(request_id),
                            message: err.to_string(),
                        },
                    };
                    let _ = event_tx.send(event);
                }
            },

            WorkerCommand::Reset => {
                if let Some(e) = engine.as_mut() {
                    e.reset();
                }
            }

            WorkerCommand::Shutdown => break,
        }
    }

    debug!("worker: shutting down");
}
