pub mod category;
pub mod court;
pub mod r#match;
pub mod match_group;
pub mod player;
pub mod player_pair;
pub mod ranking_entry;
pub mod team;

pub use category::{Category, CategorySex, CategoryState, MatchSystem, MatchType};
pub use court::Court;
pub use match_group::{GroupState, MatchGroup};
pub use player::{Player, PlayerState, Sex};
pub use player_pair::PlayerPair;
pub use r#match::{Match, MatchState, PairRef};
pub use ranking_entry::{PairStats, RankingEntry};
pub use team::Team;
