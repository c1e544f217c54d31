//! Message processing: update, dispatch, follow up

use tokio::sync::{mpsc, watch};

use mwarden_bridge::{DeviceBridge, MirrorBackend};

use crate::actions::{handle_action, Deps, PollTaskMap};
use crate::handler;
use crate::message::Message;
use crate::persist::DeviceStorage;
use crate::state::PanelState;

/// Process one message and any follow-ups it chains into.
///
/// Actions are dispatched as they appear, so a follow-up message observes the
/// state its predecessor left behind.
pub fn process_message<B, S, M>(
    state: &mut PanelState,
    message: Message,
    deps: &Deps<B, S, M>,
    msg_tx: &mpsc::Sender<Message>,
    poll_tasks: &PollTaskMap,
    shutdown_rx: &watch::Receiver<bool>,
) where
    B: DeviceBridge + Send + Sync + 'static,
    S: DeviceStorage + Send + Sync + 'static,
    M: MirrorBackend + Send + Sync + 'static,
{
    let poll_interval = state.settings.panel.session_poll_interval();
    let debounce = state.settings.panel.persist_debounce();

    let mut next = Some(message);
    while let Some(message) = next {
        let result = handler::update(state, message);
        if let Some(action) = result.action {
            handle_action(
                action,
                deps,
                msg_tx.clone(),
                poll_tasks,
                shutdown_rx,
                poll_interval,
                debounce,
            );
        }
        next = result.message;
    }
}
