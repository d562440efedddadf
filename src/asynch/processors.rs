//! Response processors: decide what a sequence does with each reply.

use crate::error::Error;

/// Outcome of processing one reply.
#[derive(Debug, PartialEq)]
pub enum ProcessorResult {
    /// Go on with the next command, or end the sequence with no value if this
    /// was the last one.
    Continue,
    /// Stop the sequence with this value.
    Success(Option<String>),
    /// Stop the sequence with this error.
    Failure(Error),
}

/// Position of the command a reply belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    pub command: &'a str,
    pub last_command: bool,
}

/// Processor callback. Gets the sequence's shared context, the step and the
/// reply text or the transport/device error.
pub type Processor<C> = fn(&mut C, Step<'_>, Result<String, Error>) -> ProcessorResult;

/// Any error fails; a reply is the result.
pub fn string<C>(_: &mut C, _: Step<'_>, response: Result<String, Error>) -> ProcessorResult {
    match response {
        Ok(response) => ProcessorResult::Success(Some(response)),
        Err(e) => ProcessorResult::Failure(e),
    }
}

/// Any error fails; a reply ends the sequence without a value.
pub fn no_result<C>(_: &mut C, _: Step<'_>, response: Result<String, Error>) -> ProcessorResult {
    match response {
        Ok(_) => ProcessorResult::Success(None),
        Err(e) => ProcessorResult::Failure(e),
    }
}

/// Any error fails; a reply moves on to the next command.
pub fn no_result_continue<C>(
    _: &mut C,
    _: Step<'_>,
    response: Result<String, Error>,
) -> ProcessorResult {
    match response {
        Ok(_) => ProcessorResult::Continue,
        Err(e) => ProcessorResult::Failure(e),
    }
}

/// Errors move on to the next command; a reply is the result.
pub fn continue_on_error<C>(
    _: &mut C,
    _: Step<'_>,
    response: Result<String, Error>,
) -> ProcessorResult {
    match response {
        Ok(response) => ProcessorResult::Success(Some(response)),
        Err(_) => ProcessorResult::Continue,
    }
}

/// Device-reported errors move on to the next command, unless it is the last
/// one. Transport errors always fail.
pub fn string_ignore_at_errors<C>(
    _: &mut C,
    step: Step<'_>,
    response: Result<String, Error>,
) -> ProcessorResult {
    match response {
        Ok(response) => ProcessorResult::Success(Some(response)),
        Err(e) if e.is_device_error() && !step.last_command => ProcessorResult::Continue,
        Err(e) => ProcessorResult::Failure(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::DeviceError;

    const STEP: Step<'static> = Step {
        command: "+CGMR",
        last_command: false,
    };

    const LAST: Step<'static> = Step {
        command: "+GMR",
        last_command: true,
    };

    fn device_error() -> Result<String, Error> {
        Err(Error::Device(DeviceError::Generic))
    }

    #[test]
    fn ignore_at_errors() {
        assert_eq!(
            string_ignore_at_errors(&mut (), STEP, device_error()),
            ProcessorResult::Continue
        );
        assert_eq!(
            string_ignore_at_errors(&mut (), LAST, device_error()),
            ProcessorResult::Failure(Error::Device(DeviceError::Generic))
        );
        assert_eq!(
            string_ignore_at_errors(&mut (), STEP, Err(atat::Error::Timeout.into())),
            ProcessorResult::Failure(Error::Atat(atat::Error::Timeout))
        );
        assert_eq!(
            string_ignore_at_errors(&mut (), STEP, Ok("1.0".to_string())),
            ProcessorResult::Success(Some("1.0".to_string()))
        );
    }

    #[test]
    fn simple_policies() {
        assert_eq!(
            continue_on_error(&mut (), STEP, device_error()),
            ProcessorResult::Continue
        );
        assert_eq!(
            no_result_continue(&mut (), STEP, Ok(String::new())),
            ProcessorResult::Continue
        );
        assert_eq!(
            no_result(&mut (), LAST, Ok("ignored".to_string())),
            ProcessorResult::Success(None)
        );
        assert_eq!(
            string(&mut (), LAST, device_error()),
            ProcessorResult::Failure(Error::Device(DeviceError::Generic))
        );
    }
}
