//! # Command Codes and Protocol Profiles
//!
//! Niimbot printers share one numeric code space for requests and
//! responses. A response is identified by its request code shifted by a
//! fixed **response offset**:
//!
//! | Offset | Used by |
//! |--------|---------|
//! | +0 | Image confirmation |
//! | +1 | Print lifecycle commands, dimension and quantity |
//! | +16 | Setter acknowledgements (label type, density, print clear) |
//!
//! Model families ship slightly different tables. Rather than compiling one
//! table in as global constants, each family is described by a
//! [`ProtocolProfile`] value that the transceiver and session receive
//! explicitly.
//!
//! ## Reserved Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 219 | Illegal argument |
//! | 0 | Not implemented |
//! | 224 | Page print done (unsolicited, D11) |

use serde::Serialize;

use crate::error::RejectionKind;

/// Device error code: illegal argument
pub const ERROR_ILLEGAL_ARGUMENT: u8 = 219;

/// Device error code: not implemented
pub const ERROR_NOT_IMPLEMENTED: u8 = 0;

/// Sparse pixel-index image line
pub const SET_IMAGE: u8 = 131;

/// Blank image line(s)
pub const IMAGE_CLEAR: u8 = 132;

/// Dense bitmask image line
pub const SET_IMAGE_DATA: u8 = 133;

/// Offset for setter acknowledgements
pub const OFFSET_ACK: u8 = 16;

/// Offset for print lifecycle commands
pub const OFFSET_PRINT: u8 = 1;

/// Offset for the image confirmation
pub const OFFSET_NONE: u8 = 0;

/// Map a packet type to the device rejection it signals, if any.
///
/// ```
/// use niimbot::protocol::codes::rejection_for;
/// use niimbot::error::RejectionKind;
///
/// assert_eq!(rejection_for(219), Some(RejectionKind::IllegalArgument));
/// assert_eq!(rejection_for(0), Some(RejectionKind::NotImplemented));
/// assert_eq!(rejection_for(51), None);
/// ```
#[inline]
pub fn rejection_for(kind: u8) -> Option<RejectionKind> {
    match kind {
        ERROR_ILLEGAL_ARGUMENT => Some(RejectionKind::IllegalArgument),
        ERROR_NOT_IMPLEMENTED => Some(RejectionKind::NotImplemented),
        _ => None,
    }
}

/// Human-readable name for a packet type, used in logs and the `encode` dump.
pub fn code_name(kind: u8) -> &'static str {
    match kind {
        1 => "START_PRINT",
        3 => "START_PAGE_PRINT",
        19 => "SET_DIMENSION",
        21 => "SET_QUANTITY",
        26 => "GET_RFID",
        32 => "ALLOW_PRINT_CLEAR",
        33 => "SET_LABEL_DENSITY",
        35 => "SET_LABEL_TYPE",
        64 => "GET_INFO",
        SET_IMAGE => "SET_IMAGE",
        IMAGE_CLEAR => "IMAGE_CLEAR",
        SET_IMAGE_DATA => "SET_IMAGE_DATA",
        163 => "GET_PRINT_STATUS",
        211 => "IMAGE_CONFIRM",
        ERROR_ILLEGAL_ARGUMENT => "ERROR_ILLEGAL_ARGUMENT",
        220 => "HEARTBEAT",
        224 => "PAGE_PRINT_DONE",
        227 => "END_PAGE_PRINT",
        243 => "END_PRINT",
        ERROR_NOT_IMPLEMENTED => "ERROR_NOT_IMPLEMENTED",
        _ => "UNKNOWN",
    }
}

/// A request code together with the offset of its expected response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Command {
    pub code: u8,
    pub response_offset: u8,
}

impl Command {
    pub const fn new(code: u8, response_offset: u8) -> Self {
        Self {
            code,
            response_offset,
        }
    }

    /// Type code of the response this command expects.
    #[inline]
    pub fn response_code(&self) -> u8 {
        self.code.wrapping_add(self.response_offset)
    }
}

/// How a model family reports that its pages have been printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Device pushes an unsolicited status packet after each page.
    PageDoneNotification,
    /// Host polls with a status request until the page counter catches up.
    StatusPolling,
}

/// # Protocol Profile
///
/// The command table of one printer family, as data.
///
/// ## Example
///
/// ```
/// use niimbot::protocol::codes::ProtocolProfile;
///
/// let profile = ProtocolProfile::D11;
/// assert_eq!(profile.set_label_type.code, 35);
/// assert_eq!(profile.set_label_type.response_code(), 51);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtocolProfile {
    pub name: &'static str,
    pub get_info: Command,
    pub get_rfid: Command,
    pub heartbeat: Command,
    pub set_label_type: Command,
    pub set_label_density: Command,
    pub start_print: Command,
    pub end_print: Command,
    pub start_page_print: Command,
    pub end_page_print: Command,
    pub allow_print_clear: Command,
    pub set_dimension: Command,
    pub set_quantity: Command,
    pub get_print_status: Command,
    pub image_confirm: Command,
    /// Unsolicited status emitted after each printed page
    pub page_print_done: u8,
    pub completion: Completion,
}

impl ProtocolProfile {
    /// D11 family: page completion is pushed by the device.
    pub const D11: Self = Self {
        name: "d11",
        get_info: Command::new(64, OFFSET_NONE),
        get_rfid: Command::new(26, OFFSET_NONE),
        heartbeat: Command::new(220, OFFSET_NONE),
        set_label_type: Command::new(35, OFFSET_ACK),
        set_label_density: Command::new(33, OFFSET_ACK),
        start_print: Command::new(1, OFFSET_PRINT),
        end_print: Command::new(243, OFFSET_PRINT),
        start_page_print: Command::new(3, OFFSET_PRINT),
        end_page_print: Command::new(227, OFFSET_PRINT),
        allow_print_clear: Command::new(32, OFFSET_ACK),
        set_dimension: Command::new(19, OFFSET_PRINT),
        set_quantity: Command::new(21, OFFSET_PRINT),
        get_print_status: Command::new(163, OFFSET_ACK),
        image_confirm: Command::new(211, OFFSET_NONE),
        page_print_done: 224,
        completion: Completion::PageDoneNotification,
    };

    /// B-series family: page completion is polled with `GET_PRINT_STATUS`.
    pub const B_SERIES: Self = Self {
        name: "b-series",
        completion: Completion::StatusPolling,
        ..Self::D11
    };

    /// List all built-in profiles.
    pub fn built_in() -> Vec<Self> {
        vec![Self::D11, Self::B_SERIES]
    }
}

impl Default for ProtocolProfile {
    fn default() -> Self {
        Self::D11
    }
}

// ============================================================================
// TESTS
// ============================================================================
