//! Unified error types for the irrigation station.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level wiring's error handling uniform.  All variants are `Copy` so
//! they can be logged and passed through the control loop without
//! allocation.
//!
//! | Category            | Type            | Effect on the loops              |
//! |---------------------|-----------------|----------------------------------|
//! | transient sensor    | [`SensorError`]   | reading skipped, logged          |
//! | actuator addressing | [`ActuatorError`] | output step skipped, logged      |
//! | persistence         | [`StoreError`]    | logged, no retry, no rollback    |
//! | configuration       | [`ConfigError`]   | fatal, station does not start    |

use core::fmt;

use embedded_hal::i2c::ErrorKind as I2cErrorKind;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// The persistence collaborator failed.
    Store(StoreError),
    /// Settings are missing, unreadable or invalid.
    Config(ConfigError),
    /// A background task could not be started.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The I2C transaction failed.
    Bus(I2cErrorKind),
    /// Another thread panicked while holding the shared bus.
    BusPoisoned,
    /// The ADC has no such input channel.
    NoSuchChannel(u8),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(kind) => write!(f, "I2C bus error: {kind}"),
            Self::BusPoisoned => write!(f, "I2C bus lock poisoned"),
            Self::NoSuchChannel(ch) => write!(f, "no ADC channel {ch}"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// The GPIO number has no physical header pin.
    UnmappedPin(i32),
    /// The GPIO is mapped but no output driver was registered for it.
    NotConfigured(i32),
    /// Driving the pin failed.
    WriteFailed(i32),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedPin(gpio) => write!(f, "gpio {gpio} has no header mapping"),
            Self::NotConfigured(gpio) => write!(f, "gpio {gpio} has no output driver"),
            Self::WriteFailed(gpio) => write!(f, "gpio {gpio} write failed"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Requested record does not exist.
    NotFound,
    /// Generic I/O error from the backing store.
    IoError,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No settings found (first boot).
    NotFound,
    /// Stored settings failed to deserialize.
    Corrupted,
    /// A settings field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Settings could not be read.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "settings not found"),
            Self::Corrupted => write!(f, "settings corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
