// Connection domain model - link status of the upstream sender
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No confirmed link: just opened, closed or errored
    #[default]
    Idle,
    /// Link confirmed but the micro-controller is not transmitting
    Active,
    /// The micro-controller is transmitting metric batches
    Broadcasting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Active => "active",
            ConnectionState::Broadcasting => "broadcasting",
        };
        f.write_str(name)
    }
}

/// Hub status carried by a control frame. The relay only reports while nothing is
/// being transmitted, so every status means the micro-controller is silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    /// Clients are connected but no micro-controller is attached
    DeviceAbsent,
    /// The micro-controller is attached but not inside a transmission
    DeviceIdle,
}

/// User-facing advisories raised by the ingestion pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NoSignalYet,
    SignalLost,
    ConnectionClosed,
    ConnectionError,
    UnreadableMessage,
    SessionExpired,
    PredictionFailed(String),
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::NoSignalYet => "No response from the micro-controller",
            Notice::SignalLost => "Communication with the micro-controller seems to be down",
            Notice::ConnectionClosed => "Connection closed",
            Notice::ConnectionError => "Connection error",
            Notice::UnreadableMessage => "Communication error",
            Notice::SessionExpired => "Security error",
            Notice::PredictionFailed(_) => "Prediction unavailable",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notice::NoSignalYet => "No metrics have been received from the micro-controller yet. \
                The dashboard keeps waiting for the link to recover."
                .to_string(),
            Notice::SignalLost => "The micro-controller stopped sending metrics. Make sure it is \
                powered on and inside its transmission schedule; the dashboard keeps waiting."
                .to_string(),
            Notice::ConnectionClosed => "The session may have expired or the connection dropped. \
                The working session will be closed."
                .to_string(),
            Notice::ConnectionError => "The real-time connection failed. \
                The working session will be closed."
                .to_string(),
            Notice::UnreadableMessage => "A message from the server could not be understood."
                .to_string(),
            Notice::SessionExpired => "The session has expired. \
                The working session will be closed."
                .to_string(),
            Notice::PredictionFailed(reason) => reason.clone(),
        }
    }

    /// Acknowledging these notices ends the working session
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            Notice::ConnectionClosed | Notice::ConnectionError | Notice::SessionExpired
        )
    }
}

/// Outcome of feeding one event into the state machine
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub previous: ConnectionState,
    pub current: ConnectionState,
    pub notice: Option<Notice>,
    /// New value of the standby flag, when it must be (re)published
    pub standby: Option<bool>,
}

impl Transition {
    fn to(previous: ConnectionState, current: ConnectionState) -> Self {
        let standby = (previous != current).then_some(current != ConnectionState::Broadcasting);
        Self {
            previous,
            current,
            notice: None,
            standby,
        }
    }

    fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

/// Tracks the upstream link. Only the frame handler mutates it.
#[derive(Debug, Default)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn opened(&mut self) -> Transition {
        self.move_to(ConnectionState::Idle)
    }

    /// Any control status means nothing is being transmitted. Standby is raised again
    /// even when the state does not change.
    pub fn on_control(&mut self, _status: ControlStatus) -> Transition {
        let notice = if self.state == ConnectionState::Broadcasting {
            Notice::SignalLost
        } else {
            Notice::NoSignalYet
        };
        let mut transition = self.move_to(ConnectionState::Active).with_notice(notice);
        transition.standby = Some(true);
        transition
    }

    pub fn on_metrics(&mut self) -> Transition {
        self.move_to(ConnectionState::Broadcasting)
    }

    pub fn on_closed(&mut self) -> Transition {
        self.move_to(ConnectionState::Idle).with_notice(Notice::ConnectionClosed)
    }

    pub fn on_transport_error(&mut self) -> Transition {
        self.move_to(ConnectionState::Idle).with_notice(Notice::ConnectionError)
    }

    pub fn on_decode_error(&mut self) -> Transition {
        self.move_to(ConnectionState::Idle).with_notice(Notice::UnreadableMessage)
    }

    fn move_to(&mut self, next: ConnectionState) -> Transition {
        let previous = std::mem::replace(&mut self.state, next);
        Transition::to(previous, next)
    }
}
