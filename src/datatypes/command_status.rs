use num_enum::TryFromPrimitive;

/// SMPP v3.4 command status codes (Section 5.1.3, Table 5-2).
///
/// Request PDUs carry `Ok`; response PDUs carry the outcome of the request.
/// The set below covers the statuses this SMSC emits or renders; anything
/// else decoded off the wire is mapped to `UnknownError` so a misbehaving
/// peer cannot break the dispatch loop.
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Ok = 0x0000_0000,
    InvalidMsgLength = 0x0000_0001,
    InvalidCommandLength = 0x0000_0002,
    InvalidCommandId = 0x0000_0003,
    IncorrectBindStatus = 0x0000_0004,
    AlreadyBound = 0x0000_0005,
    SystemError = 0x0000_0008,
    InvalidSourceAddress = 0x0000_000A,
    InvalidDestinationAddress = 0x0000_000B,
    InvalidMessageId = 0x0000_000C,
    BindFailed = 0x0000_000D,
    InvalidPassword = 0x0000_000E,
    InvalidSystemId = 0x0000_000F,
    MessageQueueFull = 0x0000_0014,
    InvalidServiceType = 0x0000_0015,
    SubmitFailed = 0x0000_0045,
    ThrottlingError = 0x0000_0058,
    UnknownError = 0x0000_00FF,
}

impl CommandStatus {
    /// Lenient conversion: unknown codes collapse to `UnknownError` instead
    /// of failing the decode.
    pub fn from_wire(raw: u32) -> Self {
        Self::try_from(raw).unwrap_or(CommandStatus::UnknownError)
    }

    /// Short specification wording for log and error messages.
    pub fn text(&self) -> &'static str {
        match self {
            CommandStatus::Ok => "No Error",
            CommandStatus::InvalidMsgLength => "Message Length is invalid",
            CommandStatus::InvalidCommandLength => "Command Length is invalid",
            CommandStatus::InvalidCommandId => "Invalid Command ID",
            CommandStatus::IncorrectBindStatus => "Incorrect BIND Status for given command",
            CommandStatus::AlreadyBound => "ESME Already in Bound State",
            CommandStatus::SystemError => "System Error",
            CommandStatus::InvalidSourceAddress => "Invalid Source Address",
            CommandStatus::InvalidDestinationAddress => "Invalid Dest Addr",
            CommandStatus::InvalidMessageId => "Message ID is invalid",
            CommandStatus::BindFailed => "Bind Failed",
            CommandStatus::InvalidPassword => "Invalid Password",
            CommandStatus::InvalidSystemId => "Invalid System ID",
            CommandStatus::MessageQueueFull => "Message Queue Full",
            CommandStatus::InvalidServiceType => "Invalid Service Type",
            CommandStatus::SubmitFailed => "submit_sm or submit_multi failed",
            CommandStatus::ThrottlingError => "Throttling error",
            CommandStatus::UnknownError => "Unknown Error",
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}
