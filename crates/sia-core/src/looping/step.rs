/// What a single invocation of a work function asks the runner to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// Keep looping after the interval.
    Continue,
    /// End the loop gracefully; the value is handed to every waiter.
    Done(T),
}

/// Successful termination of a looping call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit<T> {
    /// The loop observed an external `stop()`.
    Stopped,
    /// The work function returned [`Step::Done`].
    Done(T),
}

impl<T> Exit<T> {
    /// Returns `true` when the loop ended because of an external stop request.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Exit::Stopped)
    }

    /// Payload of a graceful stop, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Exit::Stopped => None,
            Exit::Done(value) => Some(value),
        }
    }
}
