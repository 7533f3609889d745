use thiserror::Error;

/// Engine-wide error enumeration. Every facade command returns either `Ok`
/// or one of these; no error leaves the database partially modified.
#[derive(Error, Debug)]
pub enum Error {
    // --- validation ---
    #[error("Name already exists: {0}")]
    NameExists(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid sex for this operation")]
    InvalidSex,

    #[error("Invalid match type for this operation")]
    InvalidMatchType,

    #[error("Invalid number of players or pairs")]
    InvalidPlayerCount,

    #[error("Invalid group number")]
    InvalidGroupNum,

    #[error("Invalid round number")]
    InvalidRound,

    #[error("Invalid knock-out configuration")]
    InvalidKoConfig,

    #[error("Category parameters cannot be changed any more")]
    InvalidReconfig,

    #[error("Invalid match score: {0}")]
    InvalidScore(String),

    #[error("Seeding list does not match the expected pairs")]
    InvalidSeedingList,

    // --- state ---
    #[error("Operation not allowed in the current state")]
    WrongState,

    #[error("Category has not been frozen yet")]
    CategoryNotYetFrozen,

    #[error("Category is not configurable any more")]
    CategoryNotConfigurable,

    #[error("Category needs no seeding")]
    CategoryNeedsNoSeeding,

    #[error("Category needs no group assignments")]
    CategoryNeedsNoGroupAssignments,

    // --- references ---
    #[error("Player is not in this category")]
    PlayerNotInCategory,

    #[error("Player is already paired")]
    PlayerAlreadyPaired,

    #[error("Players are identical")]
    PlayersIdentical,

    #[error("Players are not a pair")]
    PlayersNotAPair,

    #[error("Category still has unpaired players")]
    UnpairedPlayers,

    #[error("Tournament does not use teams")]
    NotUsingTeams,

    #[error("Not found: {0}")]
    NotFound(String),

    // --- integrity ---
    #[error("Incompatible database version: {0}")]
    IncompatibleDatabaseVersion(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, Error>;
