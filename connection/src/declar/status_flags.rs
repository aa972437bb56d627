/// mysql服务器status flag, 握手时获得，ok包更新

/// Is raised when a multi-statement transaction has been started, either explicitly,
/// by means of BEGIN or COMMIT AND CHAIN, or implicitly, by the first transactional
/// statement, when autocommit=off.
pub(crate) const SERVER_STATUS_IN_TRANS: u16 = 0x0001;

/// Server in auto_commit mode.
pub(crate) const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;

/// Multi query - next query exists.
pub(crate) const SERVER_MORE_RESULTS_EXISTS: u16 = 0x0008;

/// The server disabled backslash escaping for the current session.
/// escape_string 必须尊重该 flag。
pub(crate) const SERVER_STATUS_NO_BACKSLASH_ESCAPES: u16 = 0x0200;

/// This status flag, when on, implies that one of the state information has
/// changed on the server because of the execution of the last statement.
pub(crate) const SERVER_SESSION_STATE_CHANGED: u16 = 0x4000;

#[derive(Debug)]
pub struct StatusFlags {
    status_flags: u16,
}

impl StatusFlags {
    pub fn new(status_flags: u16) -> Self {
        StatusFlags { status_flags }
    }

    pub fn empty() -> Self {
        StatusFlags::new(0)
    }

    pub fn contains(&self, status_flag: u16) -> bool {
        (self.status_flags & status_flag) != 0
    }
}
