//! Background worker serving line fetches and searches for one session.
//!
//! Every command is handled by a spawned task, so a slow read never delays the
//! next scroll and a running search never blocks fetches. Responses carry the
//! request id of the command that produced them.

use crate::file_handler::{FileAccessor, LineRange};
use crate::render::protocol::{RequestId, WorkerCommand, WorkerResponse};
use crate::search::{spawn_search, LineMatcher, SearchEvent, SearchHandle, SearchLimits, SearchOptions};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

/// Run the session worker until `Shutdown` arrives or the command channel closes.
///
/// `limits` supplies the per-match text cap and read chunk size; each search
/// command brings its own result cap.
pub async fn session_worker_loop(
    mut rx: UnboundedReceiver<WorkerCommand>,
    tx: UnboundedSender<WorkerResponse>,
    accessor: Arc<dyn FileAccessor>,
    limits: SearchLimits,
) {
    let mut state = WorkerState::new(accessor, tx.clone(), limits);
    log::debug!("session worker started for {}", state.accessor.file_path().display());

    while let Some(cmd) = rx.recv().await {
        state.reap_finished();

        let outcome = state.handle_command(cmd);
        if let Some(response) = outcome.response {
            if tx.send(response).is_err() {
                break;
            }
        }

        if outcome.done {
            break;
        }
    }

    state.shutdown();
    log::debug!("session worker stopped");
}

struct WorkerState {
    accessor: Arc<dyn FileAccessor>,
    tx: UnboundedSender<WorkerResponse>,
    limits: SearchLimits,
    tasks: JoinSet<()>,
    searches: HashMap<RequestId, SearchHandle>,
}

impl WorkerState {
    fn new(
        accessor: Arc<dyn FileAccessor>,
        tx: UnboundedSender<WorkerResponse>,
        limits: SearchLimits,
    ) -> Self {
        Self {
            accessor,
            tx,
            limits,
            tasks: JoinSet::new(),
            searches: HashMap::new(),
        }
    }

    fn handle_command(&mut self, cmd: WorkerCommand) -> HandlerOutcome {
        match cmd {
            WorkerCommand::LoadLines { request_id, range } => {
                self.load_lines(request_id, range);
                HandlerOutcome::continue_without_response()
            }
            WorkerCommand::Search {
                request_id,
                pattern,
                options,
                max_results,
            } => match self.start_search(request_id, &pattern, &options, max_results) {
                Ok(()) => HandlerOutcome::continue_without_response(),
                Err(response) => HandlerOutcome::respond(response),
            },
            WorkerCommand::CancelSearch { request_id } => {
                if let Some(handle) = self.searches.remove(&request_id) {
                    handle.cancel();
                }
                HandlerOutcome::continue_without_response()
            }
            WorkerCommand::Shutdown => HandlerOutcome::exit(),
        }
    }

    fn load_lines(&mut self, request_id: RequestId, range: LineRange) {
        let accessor = Arc::clone(&self.accessor);
        let tx = self.tx.clone();

        self.tasks.spawn(async move {
            let response = match accessor.read_lines(range.start, range.end).await {
                Ok(lines) => WorkerResponse::LinesLoaded {
                    request_id,
                    range,
                    lines,
                },
                Err(error) => WorkerResponse::Error { request_id, error },
            };
            let _ = tx.send(response);
        });
    }

    fn start_search(
        &mut self,
        request_id: RequestId,
        pattern: &str,
        options: &SearchOptions,
        max_results: usize,
    ) -> Result<(), WorkerResponse> {
        let matcher = LineMatcher::new(pattern, options)
            .map_err(|error| WorkerResponse::Error { request_id, error })?;
        let limits = SearchLimits {
            max_results,
            ..self.limits
        };

        let (handle, mut events) = spawn_search(Arc::clone(&self.accessor), matcher, limits);
        self.searches.insert(request_id, handle);

        let tx = self.tx.clone();
        self.tasks.spawn(async move {
            while let Some(event) = events.next().await {
                let response = match event {
                    SearchEvent::Progress(percent) => WorkerResponse::SearchProgress {
                        request_id,
                        percent,
                    },
                    SearchEvent::Match(found) => WorkerResponse::SearchMatch { request_id, found },
                    SearchEvent::Finished(summary) => {
                        WorkerResponse::SearchFinished { request_id, summary }
                    }
                    SearchEvent::Failed(error) => WorkerResponse::Error { request_id, error },
                };
                // Dropping `events` on a closed channel stops the search
                if tx.send(response).is_err() {
                    return;
                }
            }
        });
        Ok(())
    }

    fn reap_finished(&mut self) {
        while self.tasks.try_join_next().is_some() {}
        self.searches.retain(|_, handle| !handle.is_finished());
    }

    fn shutdown(&mut self) {
        for (_, handle) in self.searches.drain() {
            handle.abort();
        }
        self.tasks.abort_all();
    }
}

struct HandlerOutcome {
    response: Option<WorkerResponse>,
    done: bool,
}

impl HandlerOutcome {
    fn respond(response: WorkerResponse) -> Self {
        Self {
            response: Some(response),
            done: false,
        }
    }

    fn continue_without_response() -> Self {
        Self {
            response: None,
            done: false,
        }
    }

    fn exit() -> Self {
        Self {
            response: None,
            done: true,
        }
    }
}
