//! Session runtime executor

use super::traits::{PushChannel, SubmissionService};
use super::{SessionHandle, SessionSnapshot};

use crate::session::{transition, Effect, Event, SessionContext, SessionState, TransitionError};
use crate::transport::{ChannelState, OutboundMessage, Subscription};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const EVENT_QUEUE_CAPACITY: usize = 64;

/// Generic session runtime that can work with any submission service and
/// push channel implementation
pub struct SessionRuntime<S, C>
where
    S: SubmissionService + 'static,
    C: PushChannel + 'static,
{
    context: SessionContext,
    state: SessionState,
    submission: Arc<S>,
    channel: Arc<C>,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so the loop ends once every handle and in-flight request is gone
    event_tx: mpsc::WeakSender<Event>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    channel_state: ChannelState,
    channel_rx: watch::Receiver<ChannelState>,
    /// Taken by `run`; registered up front so no push is missed before the
    /// loop starts
    subscription: Option<Subscription>,
}

impl<S, C> SessionRuntime<S, C>
where
    S: SubmissionService + 'static,
    C: PushChannel + 'static,
{
    pub fn new(context: SessionContext, submission: Arc<S>, channel: Arc<C>) -> (Self, SessionHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let subscription = channel.subscribe();
        let channel_rx = channel.watch_state();
        let channel_state = *channel_rx.borrow();

        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot {
            state: SessionState::new(),
            channel: channel_state,
        });

        let runtime = Self {
            context,
            state: SessionState::new(),
            submission,
            channel,
            event_rx,
            event_tx: event_tx.downgrade(),
            snapshot_tx,
            channel_state,
            channel_rx,
            subscription: Some(subscription),
        };
        let handle = SessionHandle {
            event_tx,
            snapshot_rx,
        };
        (runtime, handle)
    }

    pub async fn run(mut self) {
        tracing::info!(
            submit_policy = ?self.context.submit_policy,
            send_path = ?self.context.send_path,
            "Starting session runtime"
        );

        let forwarder = self.spawn_push_forwarder();
        let mut channel_open = true;

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    let Some(event) = event else { break };
                    self.process_event(event);
                }
                changed = self.channel_rx.changed(), if channel_open => {
                    if changed.is_err() {
                        channel_open = false;
                        continue;
                    }
                    let state = *self.channel_rx.borrow_and_update();
                    if state != self.channel_state {
                        tracing::info!(channel = ?state, "Push channel state changed");
                        self.channel_state = state;
                        self.publish();
                    }
                }
            }
        }

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        tracing::info!("Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let name = event.name();
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(TransitionError::Validation(reason)) => {
                tracing::debug!(event = name, %reason, "Ignoring invalid input");
                return;
            }
            Err(e) => {
                tracing::warn!(event = name, error = %e, "Event rejected");
                return;
            }
        };

        tracing::debug!(
            event = name,
            phase = result.new_state.phase.as_str(),
            messages = result.new_state.buffer.len(),
            "Applied event"
        );

        if result.new_state != self.state {
            self.state = result.new_state;
            self.publish();
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            state: self.state.clone(),
            channel: self.channel_state,
        });
    }

    /// Network effects run as their own tasks; completions come back as events
    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::SubmitUrl { url } => {
                let Some(tx) = self.event_tx.upgrade() else {
                    return;
                };
                let submission = Arc::clone(&self.submission);
                tokio::spawn(async move {
                    let event = match submission.submit_url(&url).await {
                        Ok(content) => Event::UrlSubmitted { url, content },
                        Err(error) => Event::UrlSubmitFailed { url, error },
                    };
                    let _ = tx.send(event).await;
                });
            }

            Effect::AskQuestion { text } => {
                let Some(tx) = self.event_tx.upgrade() else {
                    return;
                };
                let submission = Arc::clone(&self.submission);
                tokio::spawn(async move {
                    if let Err(error) = submission.ask_question(&text).await {
                        let _ = tx.send(Event::QuestionFailed { text, error }).await;
                    }
                });
            }

            Effect::SendOverChannel { text } => {
                let Some(tx) = self.event_tx.upgrade() else {
                    return;
                };
                let channel = Arc::clone(&self.channel);
                tokio::spawn(async move {
                    if let Err(error) = channel.send_message(OutboundMessage::user(text.clone())).await {
                        let _ = tx.send(Event::QuestionFailed { text, error }).await;
                    }
                });
            }

            Effect::LogFailure {
                operation,
                subject,
                error,
            } => {
                tracing::warn!(
                    operation,
                    subject = %subject,
                    kind = ?error.kind,
                    status = error.status,
                    error = %error,
                    "Request failed"
                );
            }
        }
    }

    /// Turn push arrivals into events on the queue
    fn spawn_push_forwarder(&mut self) -> Option<JoinHandle<()>> {
        let mut subscription = self.subscription.take()?;
        let event_tx = self.event_tx.clone();
        Some(tokio::spawn(async move {
            while let Some(inbound) = subscription.recv().await {
                let Some(tx) = event_tx.upgrade() else {
                    break;
                };
                let event = Event::RemoteMessage {
                    message: inbound.into_message(),
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            subscription.unsubscribe();
        }))
    }
}
