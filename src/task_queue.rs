use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use crate::task::QueuedTask;

pub(crate) enum Message {
    Run(QueuedTask),
    Stop,
}

/// Producer side of the shared queue. Bounded when submissions should block on a full queue.
#[derive(Clone)]
pub(crate) enum TaskSender {
    Bounded(mpsc::Sender<Message>),
    Unbounded(mpsc::UnboundedSender<Message>),
}

pub(crate) enum TaskReceiver {
    Bounded(mpsc::Receiver<Message>),
    Unbounded(mpsc::UnboundedReceiver<Message>),
}

pub(crate) fn channel(capacity: Option<usize>) -> (TaskSender, TaskReceiver) {
    match capacity {
        Some(capacity) => {
            let (sender, receiver) = mpsc::channel(capacity.max(1));
            (TaskSender::Bounded(sender), TaskReceiver::Bounded(receiver))
        }
        None => {
            let (sender, receiver) = mpsc::unbounded_channel();
            (TaskSender::Unbounded(sender), TaskReceiver::Unbounded(receiver))
        }
    }
}

impl TaskSender {
    /// Blocks the calling thread while a bounded queue is full. Must not be called from async code.
    pub fn send_blocking(&self, message: Message) -> Result<(), Message> {
        match self {
            TaskSender::Bounded(sender) => sender.blocking_send(message).map_err(|e| e.0),
            TaskSender::Unbounded(sender) => sender.send(message).map_err(|e| e.0),
        }
    }

    pub async fn send(&self, message: Message) -> Result<(), Message> {
        match self {
            TaskSender::Bounded(sender) => sender.send(message).await.map_err(|e| e.0),
            TaskSender::Unbounded(sender) => sender.send(message).map_err(|e| e.0),
        }
    }
}

impl TaskReceiver {
    pub async fn recv(&mut self) -> Option<Message> {
        match self {
            TaskReceiver::Bounded(receiver) => receiver.recv().await,
            TaskReceiver::Unbounded(receiver) => receiver.recv().await,
        }
    }

    /// Closes the queue and hands back whatever was still in it.
    pub fn close_and_drain(&mut self) -> Vec<QueuedTask> {
        let mut leftovers = Vec::new();
        match self {
            TaskReceiver::Bounded(receiver) => receiver.close(),
            TaskReceiver::Unbounded(receiver) => receiver.close(),
        }
        loop {
            let message = match self {
                TaskReceiver::Bounded(receiver) => receiver.try_recv(),
                TaskReceiver::Unbounded(receiver) => receiver.try_recv(),
            };
            match message {
                Ok(Message::Run(task)) => leftovers.push(task),
                Ok(Message::Stop) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        leftovers
    }
}
