//! Change notifications, published after a successful commit.

use log::debug;

/// Event names sent to subscribers.
pub mod events {
    pub const ADD_POINT: &str = "add-point";
    pub const START_TIMER: &str = "start-timer";
    pub const STOP_TIMER: &str = "stop-timer";
    pub const CHECK_TIE: &str = "check-tie";
    pub const DELETE_RECENT: &str = "delete-recent";
    pub const MODIFY_RECENT: &str = "modify-recent";
    pub const RESET_MATCH: &str = "reset-match";
    pub const MATCH_LOST: &str = "match-lost";
    pub const ADD_TIME_KEEPER: &str = "add-timekeeper";
    pub const REMOVE_TIME_KEEPER: &str = "remove-timekeeper";
    pub const ADD_POINT_MAKER: &str = "add-pointmaker";
    pub const REMOVE_POINT_MAKER: &str = "remove-pointmaker";
    pub const RESET_ROLES: &str = "reset-roles";
    pub const TOURNAMENT_UPDATED: &str = "tournament-updated";
}

/// Publish sink (websocket room, message bus, ...). Delivery is best effort.
pub trait Notifier: Send + Sync {
    /// `channel` is the id of the match or tournament the event is about.
    fn publish(&self, channel: &str, event: &str, payload: serde_json::Value);
}

/// Notifier that only logs; used when no transport is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, channel: &str, event: &str, payload: serde_json::Value) {
        debug!("[{channel}] {event}: {payload}");
    }
}
