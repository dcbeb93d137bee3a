use crate::DecodeError;

/// Maximum APDU length a peer accepts, as negotiated in the confirmed
/// request header nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MaxApdu {
    UpTo50 = 0,
    UpTo128 = 1,
    UpTo206 = 2,
    UpTo480 = 3,
    UpTo1024 = 4,
    UpTo1476 = 5,
}

impl MaxApdu {
    /// The negotiated size in bytes.
    pub const fn decoded_len(self) -> usize {
        match self {
            Self::UpTo50 => 50,
            Self::UpTo128 => 128,
            Self::UpTo206 => 206,
            Self::UpTo480 => 480,
            Self::UpTo1024 => 1024,
            Self::UpTo1476 => 1476,
        }
    }

    pub const fn to_nibble(self) -> u8 {
        self as u8
    }

    /// Decode the header nibble; unassigned values are read as the largest
    /// size, matching how peers treat reserved encodings.
    pub const fn from_nibble(value: u8) -> Self {
        match value {
            0 => Self::UpTo50,
            1 => Self::UpTo128,
            2 => Self::UpTo206,
            3 => Self::UpTo480,
            4 => Self::UpTo1024,
            _ => Self::UpTo1476,
        }
    }
}

/// BACnet error class reported in Error PDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorClass {
    Device = 0,
    Object = 1,
    Property = 2,
    Resources = 3,
    Security = 4,
    Services = 5,
    Vt = 6,
    Communication = 7,
}

impl ErrorClass {
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Device),
            1 => Some(Self::Object),
            2 => Some(Self::Property),
            3 => Some(Self::Resources),
            4 => Some(Self::Security),
            5 => Some(Self::Services),
            6 => Some(Self::Vt),
            7 => Some(Self::Communication),
            _ => None,
        }
    }
}

/// BACnet error code reported in Error PDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Other = 0,
    ConfigurationInProgress = 2,
    DeviceBusy = 3,
    ReadAccessDenied = 27,
    UnknownObject = 31,
    UnknownProperty = 32,
    ValueOutOfRange = 37,
    WriteAccessDenied = 40,
    InvalidArrayIndex = 42,
}

impl ErrorCode {
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Other),
            2 => Some(Self::ConfigurationInProgress),
            3 => Some(Self::DeviceBusy),
            27 => Some(Self::ReadAccessDenied),
            31 => Some(Self::UnknownObject),
            32 => Some(Self::UnknownProperty),
            37 => Some(Self::ValueOutOfRange),
            40 => Some(Self::WriteAccessDenied),
            42 => Some(Self::InvalidArrayIndex),
            _ => None,
        }
    }
}

/// Abort reason carried in an Abort PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Other,
    BufferOverflow,
    InvalidApduInThisState,
    PreemptedByHigherPriorityTask,
    SegmentationNotSupported,
    Proprietary(u8),
}

impl AbortReason {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Other => 0,
            Self::BufferOverflow => 1,
            Self::InvalidApduInThisState => 2,
            Self::PreemptedByHigherPriorityTask => 3,
            Self::SegmentationNotSupported => 4,
            Self::Proprietary(v) => v,
        }
    }

    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Other,
            1 => Self::BufferOverflow,
            2 => Self::InvalidApduInThisState,
            3 => Self::PreemptedByHigherPriorityTask,
            4 => Self::SegmentationNotSupported,
            v => Self::Proprietary(v),
        }
    }
}

/// Reject reason carried in a Reject PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Other,
    BufferOverflow,
    InconsistentParameters,
    InvalidParameterDataType,
    InvalidTag,
    MissingRequiredParameter,
    ParameterOutOfRange,
    TooManyArguments,
    UndefinedEnumeration,
    UnrecognizedService,
    Proprietary(u8),
}

impl RejectReason {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Other => 0,
            Self::BufferOverflow => 1,
            Self::InconsistentParameters => 2,
            Self::InvalidParameterDataType => 3,
            Self::InvalidTag => 4,
            Self::MissingRequiredParameter => 5,
            Self::ParameterOutOfRange => 6,
            Self::TooManyArguments => 7,
            Self::UndefinedEnumeration => 8,
            Self::UnrecognizedService => 9,
            Self::Proprietary(v) => v,
        }
    }

    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Other,
            1 => Self::BufferOverflow,
            2 => Self::InconsistentParameters,
            3 => Self::InvalidParameterDataType,
            4 => Self::InvalidTag,
            5 => Self::MissingRequiredParameter,
            6 => Self::ParameterOutOfRange,
            7 => Self::TooManyArguments,
            8 => Self::UndefinedEnumeration,
            9 => Self::UnrecognizedService,
            v => Self::Proprietary(v),
        }
    }

    /// Reason to report when the request body itself failed to decode.
    pub const fn from_decode_error(error: DecodeError) -> Self {
        match error {
            DecodeError::Truncated => Self::MissingRequiredParameter,
            DecodeError::BadTag => Self::InvalidTag,
            DecodeError::BadLength => Self::InvalidParameterDataType,
            DecodeError::BadValue => Self::ParameterOutOfRange,
            DecodeError::CharacterSet => Self::InvalidParameterDataType,
            DecodeError::Message(_) => Self::Other,
        }
    }
}
