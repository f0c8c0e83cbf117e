use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::filter::FilterChain;
use super::types::{SortOrder, TaskError, TaskRecord, TaskResult};
use crate::lib::client::types::{ClientResult, ControlPlane, TaskQuery};

/// Smallest capacity tokio allows. The producer can run at most one record
/// ahead of the consumer.
const HANDOFF_CAPACITY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// Records requested per call.
    pub limit: usize,
    /// Total records forwarded before pagination stops.
    pub max: usize,
    /// Passed to the master as a hint. Pages are forwarded in whatever
    /// order the master returns them.
    pub order: SortOrder,
}

impl PageOptions {
    pub fn new(limit: usize, max: usize, order: SortOrder) -> TaskResult<Self> {
        if limit == 0 {
            return Err(TaskError::InvalidLimit);
        }
        Ok(PageOptions { limit, max, order })
    }
}

/// Fetches pages from the master and forwards every record accepted by
/// `filters` to `out`, in page order. Stops on a short page, once `max`
/// records have been forwarded, when a page starts with the same record as
/// the previous one (the master ignored the offset), or when the receiver
/// goes away. Returns the number of records forwarded; a fetch error ends
/// pagination at once.
pub async fn paginate<C>(
    client: &C,
    opts: PageOptions,
    filters: &FilterChain,
    out: &mpsc::Sender<TaskRecord>,
) -> ClientResult<usize>
where
    C: ControlPlane + ?Sized,
{
    let mut offset = 0;
    let mut forwarded = 0;
    let mut previous_first: Option<String> = None;

    while forwarded < opts.max && opts.limit > 0 {
        let query = TaskQuery {
            offset,
            limit: opts.limit,
            order: opts.order,
        };
        let page = client.list_tasks(query).await?;
        let fetched = page.len();
        debug!(offset, fetched, forwarded, "fetched task page");

        let first = page.first().map(|task| task.id.clone());
        if first.is_some() && first == previous_first {
            warn!(offset, "master returned the previous page again, stopping");
            break;
        }
        previous_first = first;
        offset += fetched;

        for task in page.into_iter().filter(|task| filters.matches(task)) {
            if out.send(task).await.is_err() {
                debug!("task consumer went away, stopping");
                return Ok(forwarded);
            }
            forwarded += 1;
            if forwarded >= opts.max {
                break;
            }
        }

        if fetched < opts.limit {
            break;
        }
    }

    Ok(forwarded)
}

/// Records produced by a background paginator.
///
/// The paginator task owns the only sender and drops it when it returns,
/// which closes the stream exactly once. Read with [`TaskStream::next`]
/// until it yields `None`, then call [`TaskStream::finish`] to learn whether
/// the listing completed or failed part way.
pub struct TaskStream {
    rx: mpsc::Receiver<TaskRecord>,
    producer: JoinHandle<ClientResult<usize>>,
}

impl TaskStream {
    pub fn spawn<C>(client: Arc<C>, opts: PageOptions, filters: FilterChain) -> Self
    where
        C: ControlPlane + 'static,
    {
        let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
        debug!(?opts, filters = ?filters.filters(), "starting task paginator");
        let producer =
            tokio::spawn(async move { paginate(client.as_ref(), opts, &filters, &tx).await });
        TaskStream { rx, producer }
    }

    pub async fn next(&mut self) -> Option<TaskRecord> {
        self.rx.recv().await
    }

    /// Waits for the paginator. Records already received stay valid even
    /// when this returns an error.
    pub async fn finish(self) -> TaskResult<usize> {
        drop(self.rx);
        Ok(self.producer.await??)
    }
}

/// Runs the paginator alongside a collecting consumer on the current task.
pub async fn collect_tasks<C>(
    client: &C,
    opts: PageOptions,
    filters: &FilterChain,
) -> ClientResult<Vec<TaskRecord>>
where
    C: ControlPlane + ?Sized,
{
    let (tx, mut rx) = mpsc::channel(HANDOFF_CAPACITY);
    let producer = async move { paginate(client, opts, filters, &tx).await };
    let consumer = async {
        let mut tasks = Vec::new();
        while let Some(task) = rx.recv().await {
            tasks.push(task);
        }
        tasks
    };
    let (result, tasks) = tokio::join!(producer, consumer);
    result?;
    Ok(tasks)
}
