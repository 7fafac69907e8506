//! Application state and the controller that ties it to the data manager.
//!
//! [`AppState`] is a plain value changed only by [`AppState::apply`]. The
//! controller, [`ClubApp`], feeds it user actions and whatever the sync layer
//! reports, and performs the remote writes the reducer asks for.

mod form;
mod notification;
mod shell;
mod state;
mod view;

pub use form::*;
pub use notification::*;
pub use shell::*;
pub use state::*;
pub use view::{MatchFilters, MatchListView, RegistrationView, RosterView, StatsView};
