pub mod claim;
pub mod client;
pub mod config;
pub mod disaster;
pub mod error;
pub mod flight;
pub mod format;
pub mod geo;
pub mod geocode;
pub mod normalize;
pub mod notification;
pub mod payout;
pub mod property;
mod requests;
pub mod risk;
pub mod severity;
pub mod status;
pub mod types;

pub use client::AlphaEarth;
pub use config::ClientConfig;
pub use error::AlphaEarthError;
pub use geo::{derive_aoi, AreaOfInterest, GeoPoint};
pub use normalize::PropertyRecord;
pub use notification::{Notification, NotificationCenter, NotificationKind};
pub use payout::{PayoutProgram, Product};
pub use risk::RiskAssessment;
pub use severity::{
    classify_flight_delay, classify_risk_score, normalize_confidence, DelayTier, RiskTier,
};
pub use status::{JobState, ProcessingController, ProcessingStatus, RunningJob};

// Re-export key types from the types module
pub use types::{derive_event_windows, format_date, parse_date, DateRange, EventWindows};
