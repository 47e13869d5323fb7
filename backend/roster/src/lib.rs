//! Club roster: typed user records, ranking, the three-way board toggle and
//! the client for the hosted backend that owns the data.
pub mod board;
pub mod forms;
pub mod rank;
pub mod records;
pub mod remote;
pub mod view;

pub use board::{Leaderboard, LeaderboardPage, LeaderboardRow};
pub use forms::FormError;
pub use rank::{RankedEntry, rank};
pub use records::{RecordError, Role, Roster, Scores, UserScoreRecord};
pub use remote::{Gateway, GatewayConfig, RemoteError};
pub use view::{Selection, ViewControl, ViewMode, ViewSelector};
