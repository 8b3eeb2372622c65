use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Failures that can occur while talking to MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// Required environment variable is missing.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Rejected URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver refused the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// No ping succeeded while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Number of pings sent.
        attempts: u32,
        /// Error of the last ping.
        #[source]
        source: MongoError,
    },
    /// A periodic health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection holding the index.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Replacing a game document failed.
    #[error("failed to save game of device `{device_id}`")]
    SaveGame {
        /// Device owning the game.
        device_id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading a game document failed.
    #[error("failed to load game of device `{device_id}`")]
    LoadGame {
        /// Device owning the game.
        device_id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Setting one round entry failed.
    #[error("failed to update round {round} of device `{device_id}`")]
    UpdateRound {
        /// Device owning the game.
        device_id: String,
        /// Round being written.
        round: u32,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
