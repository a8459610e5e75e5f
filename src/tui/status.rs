//! Transient status banner

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

/// Ticks a status stays on screen (4s at the UI tick rate)
pub const STATUS_TTL_TICKS: u32 = 16;

/// At most one status at a time; last write wins
#[derive(Debug, Default)]
pub struct StatusSlot {
    current: Option<StatusMessage>,
    age: u32,
}

impl StatusSlot {
    pub fn set(&mut self, status: StatusMessage) {
        self.current = Some(status);
        self.age = 0;
    }

    /// Age the current status by one tick, clearing it once it expires
    pub fn tick(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.age += 1;
        if self.age >= STATUS_TTL_TICKS {
            self.clear_last_status();
        }
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref()
    }

    pub fn clear_last_status(&mut self) {
        self.current = None;
        self.age = 0;
    }
}
