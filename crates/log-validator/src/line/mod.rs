/// Line format parsing and checksum validation.
///
/// Every monitored line has the shape
///
/// ```text
/// timestamp hostname datacenter severity tag checksum message...
/// ```
///
/// where `checksum` is computed over the message portion only.
///
/// - `checksum.rs`: the checksum function shared with the log producer
/// - `model.rs`: `ParsedLine`, `LineError`, `LineStatus`
/// - `validate.rs`: the validator itself

pub mod checksum;
pub mod model;
pub mod validate;

pub use checksum::log_line_checksum;
pub use model::{LineError, LineStatus, ParsedLine};
pub use validate::validate_line;

/// Number of fixed fields that precede the message.
pub const FIXED_FIELDS: usize = 6;
