/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines progress reporting messages, sinks, and helper functions for the map pipeline.
//
// Created on: 12 Oct 2026     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Progress reporting primitives for the pipeline stages.

use crate::linalg::SolveMethod;
use std::fmt::Debug;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

/// Progress events emitted while a map is being built.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMsg {
    /// Invalid records were dropped and duplicate coordinates collapsed.
    ObservationsCleaned {
        kept: usize,
        dropped_invalid: usize,
        duplicates: usize,
    },

    /// The sampling grid was constructed.
    GridBuilt { nx: usize, ny: usize, spacing: f64 },

    /// The RBF system was factorised and solved.
    SystemSolved {
        num_points: usize,
        method: SolveMethod,
    },

    /// The interpolant was evaluated at every grid node.
    FieldEvaluated { nodes: usize, missing: usize },

    /// Isolines were traced for all levels.
    IsolinesTraced { levels: usize, polylines: usize },

    /// Arbitrary informational message.
    Message { message: String },
}

/// Sink that consumes progress messages.
pub trait ProgressSink: Send + Sync + Debug {
    fn emit(&self, msg: ProgressMsg);
}

/// Progress sink that forwards messages over a channel.
#[derive(Debug)]
pub struct ClosureSink {
    tx: mpsc::SyncSender<ProgressMsg>,
}

impl ProgressSink for ClosureSink {
    #[inline]
    fn emit(&self, msg: ProgressMsg) {
        let _ = self.tx.try_send(msg);
    }
}

/// Spawns a listener thread that runs a handler closure for each progress message.
///
/// The listener exits once every clone of the returned sink has been dropped.
pub fn closure_sink<F>(
    buffer: usize,
    mut handler: F,
) -> (Arc<dyn ProgressSink>, thread::JoinHandle<()>)
where
    F: FnMut(ProgressMsg) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<ProgressMsg>(buffer.max(1));
    let sink: Arc<dyn ProgressSink> = Arc::new(ClosureSink { tx });

    let handle = thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            handler(msg);
        }
    });

    (sink, handle)
}

/// Sink that keeps every message in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<ProgressMsg>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the messages received so far.
    pub fn messages(&self) -> Vec<ProgressMsg> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, msg: ProgressMsg) {
        match self.messages.lock() {
            Ok(mut guard) => guard.push(msg),
            Err(poisoned) => poisoned.into_inner().push(msg),
        }
    }
}

/// Emits `msg` on `sink` if one is attached.
#[inline]
pub(crate) fn emit(sink: &Option<Arc<dyn ProgressSink>>, msg: ProgressMsg) {
    if let Some(sink) = sink {
        sink.emit(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    #[test]
    fn closure_sink_forwards_messages() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let store = received.clone();
        let (sink, handle) = closure_sink(4, move |msg| {
            store.lock().unwrap().push(msg);
        });

        sink.emit(ProgressMsg::Message {
            message: "hello".into(),
        });
        drop(sink);
        handle.join().unwrap();

        let received = received.lock().unwrap();
        assert!(received.len() == 1);
        assert!(
            received[0]
                == ProgressMsg::Message {
                    message: "hello".into()
                }
        );
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.emit(ProgressMsg::GridBuilt {
            nx: 2,
            ny: 3,
            spacing: 1.0,
        });
        sink.emit(ProgressMsg::FieldEvaluated {
            nodes: 6,
            missing: 0,
        });

        let messages = sink.messages();
        assert!(messages.len() == 2);
        assert!(matches!(messages[0], ProgressMsg::GridBuilt { nx: 2, .. }));
    }
}
